//! Summarizer adapter: turns a scan bundle into a `TrendAnalysis` (and a content
//! calendar) via the Anthropic Messages API. Any failure yields `None`; the scan
//! carries on without analysis.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::calendar::{calendar_prompt, pretty, ContentCalendar, CALENDAR_SYSTEM_PROMPT};
use super::salvage::salvage;
use super::{TopTrend, TrendAnalysis, Urgency};
use crate::config::radar::SummarizerConfig;
use crate::ingest::types::ScanBundle;

pub const ENV_API_KEY: &str = "ANTHROPIC_API_KEY";
/// `mock` swaps in a canned summarizer for local runs.
pub const ENV_AI_MODE: &str = "RADAR_AI_MODE";
const ANTHROPIC_VERSION: &str = "2023-06-01";

#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(&self, bundle: &ScanBundle) -> Option<TrendAnalysis>;
    async fn calendar(
        &self,
        analysis: Option<&TrendAnalysis>,
        bundle: &ScanBundle,
    ) -> Option<ContentCalendar>;
    fn provider_name(&self) -> &'static str;
}

pub type DynSummarizer = Arc<dyn Summarizer>;

/// Mock mode wins; otherwise a real client when enabled and keyed, else disabled.
pub fn build_summarizer(cfg: &SummarizerConfig) -> DynSummarizer {
    if std::env::var(ENV_AI_MODE)
        .map(|v| v == "mock")
        .unwrap_or(false)
    {
        return Arc::new(MockSummarizer::canned());
    }
    if !cfg.enabled {
        return Arc::new(DisabledSummarizer);
    }
    let key = std::env::var(ENV_API_KEY).unwrap_or_default();
    if key.trim().is_empty() {
        tracing::warn!(target: "analyze", "{ENV_API_KEY} not set; analysis disabled");
        return Arc::new(DisabledSummarizer);
    }
    match AnthropicSummarizer::new(cfg.clone(), key) {
        Ok(s) => Arc::new(s),
        Err(e) => {
            tracing::warn!(target: "analyze", error = ?e, "summarizer init failed; analysis disabled");
            Arc::new(DisabledSummarizer)
        }
    }
}

pub const ANALYSIS_SYSTEM_PROMPT: &str = r#"You are a food trend analyst for a food review channel that films in NYC and Boca Raton / South Florida. The host interviews restaurant owners and tries their food.

Analyze data from YouTube, Reddit and Google Trends to identify food and beverage trends that are gaining momentum but have not gone fully viral yet. The goal is to make content BEFORE a trend peaks.

Rules:
- Be specific. Name actual foods, cuisines, dishes or restaurants when possible.
- Give actionable advice: "Film a video about X this week because Y".
- Prioritize trends that make good video content for a food review channel.
- Consider NYC and Boca Raton / South Florida specifically.
- Focus on the pre-viral window: things at 10K-100K engagement that could hit millions.
- Include a content brief for each top trend: title idea, hook, and why viewers would care.

Output your analysis as valid JSON with this exact structure:
{
  "summary": "2-3 sentence overview of the current food trend landscape",
  "topTrends": [
    {
      "trend": "Name of the trend",
      "why": "Why this is trending and why it matters for content",
      "urgency": "film now" | "this week" | "watch",
      "platforms": ["youtube", "reddit", "google_trends"],
      "contentBrief": "Video title idea + 1-2 sentence hook",
      "restaurants": "Optional: where to film"
    }
  ]
}

Return 5-8 trends, ranked by urgency and content potential. Only valid JSON, no other text."#;

/// User message: first `items` videos and posts plus the whole trends snapshot.
pub fn analysis_prompt(bundle: &ScanBundle, items: usize) -> String {
    let videos: Vec<_> = bundle.videos.iter().take(items).collect();
    let posts: Vec<_> = bundle.posts.iter().take(items).collect();
    format!(
        "Here's today's data from our trend scanning:\n\n\
         YOUTUBE (top food videos gaining traction):\n{}\n\n\
         REDDIT (trending food posts):\n{}\n\n\
         GOOGLE TRENDS:\n{}\n\n\
         Identify the top pre-viral food trends. Remember: the host operates in NYC and Boca Raton, FL.",
        pretty(&videos),
        pretty(&posts),
        pretty(&bundle.trends)
    )
}

/// Parse model text into an analysis. Unrecoverable text becomes the summary.
pub fn analysis_from_model_text(raw: &str) -> TrendAnalysis {
    let now = Utc::now();
    match salvage::<TrendAnalysis>(raw) {
        Some((mut a, stage)) => {
            tracing::debug!(target: "analyze", ?stage, trends = a.top_trends.len(), "analysis parsed");
            a.generated_at = now;
            a
        }
        None => {
            tracing::warn!(target: "analyze", len = raw.len(), "analysis not JSON; keeping raw text");
            TrendAnalysis::degraded(raw, now)
        }
    }
}

// ------------------------------------------------------------
// Anthropic
// ------------------------------------------------------------

pub struct AnthropicSummarizer {
    http: reqwest::Client,
    api_key: String,
    cfg: SummarizerConfig,
}

#[derive(Serialize)]
struct Msg<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct MessagesReq<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: Vec<Msg<'a>>,
}

#[derive(Deserialize)]
struct MessagesResp {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: Option<String>,
}

impl AnthropicSummarizer {
    pub fn new(cfg: SummarizerConfig, api_key: String) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("previral-radar/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(4))
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()
            .context("building summarizer http client")?;
        Ok(Self { http, api_key, cfg })
    }

    /// One Messages API call; returns the first text block.
    async fn complete(&self, system: &str, user: &str, max_tokens: u32) -> Result<String> {
        let url = format!("{}/v1/messages", self.cfg.base_url.trim_end_matches('/'));
        let req = MessagesReq {
            model: &self.cfg.model,
            max_tokens,
            system,
            messages: vec![Msg {
                role: "user",
                content: user,
            }],
        };
        let resp = self
            .http
            .post(url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&req)
            .send()
            .await
            .context("summarizer request")?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(anyhow!("summarizer returned {status}: {}", body.chars().take(200).collect::<String>()));
        }
        let body: MessagesResp = resp.json().await.context("summarizer response body")?;
        Ok(body
            .content
            .into_iter()
            .find_map(|b| b.text)
            .unwrap_or_else(|| "{}".to_string()))
    }
}

#[async_trait]
impl Summarizer for AnthropicSummarizer {
    async fn summarize(&self, bundle: &ScanBundle) -> Option<TrendAnalysis> {
        let user = analysis_prompt(bundle, self.cfg.prompt_items);
        match self
            .complete(ANALYSIS_SYSTEM_PROMPT, &user, self.cfg.max_tokens)
            .await
        {
            Ok(text) => Some(analysis_from_model_text(&text)),
            Err(e) => {
                tracing::warn!(target: "analyze", error = ?e, "summarize failed");
                None
            }
        }
    }

    async fn calendar(
        &self,
        analysis: Option<&TrendAnalysis>,
        bundle: &ScanBundle,
    ) -> Option<ContentCalendar> {
        let user = calendar_prompt(analysis, bundle);
        match self
            .complete(CALENDAR_SYSTEM_PROMPT, &user, self.cfg.calendar_max_tokens)
            .await
        {
            Ok(text) => Some(ContentCalendar::from_model_text(&text)),
            Err(e) => {
                tracing::warn!(target: "analyze", error = ?e, "calendar failed");
                None
            }
        }
    }

    fn provider_name(&self) -> &'static str {
        "anthropic"
    }
}

// ------------------------------------------------------------
// Disabled / mock
// ------------------------------------------------------------

pub struct DisabledSummarizer;

#[async_trait]
impl Summarizer for DisabledSummarizer {
    async fn summarize(&self, _bundle: &ScanBundle) -> Option<TrendAnalysis> {
        None
    }
    async fn calendar(
        &self,
        _analysis: Option<&TrendAnalysis>,
        _bundle: &ScanBundle,
    ) -> Option<ContentCalendar> {
        None
    }
    fn provider_name(&self) -> &'static str {
        "disabled"
    }
}

/// Returns fixed results; used by tests and `RADAR_AI_MODE=mock`.
#[derive(Clone, Default)]
pub struct MockSummarizer {
    pub analysis: Option<TrendAnalysis>,
    pub calendar: Option<ContentCalendar>,
}

impl MockSummarizer {
    pub fn new(analysis: Option<TrendAnalysis>) -> Self {
        Self {
            analysis,
            calendar: None,
        }
    }

    pub fn canned() -> Self {
        let trend = |name: &str, urgency| TopTrend {
            trend: name.to_string(),
            why: "Mock analysis".to_string(),
            urgency,
            platforms: vec!["youtube".to_string()],
            content_brief: format!("Try {name} before everyone else"),
            restaurants: None,
            sources: None,
        };
        Self {
            analysis: Some(TrendAnalysis {
                summary: "Mock summary (RADAR_AI_MODE=mock)".to_string(),
                top_trends: vec![
                    trend("Hot honey everything", Urgency::FilmNow),
                    trend("Dubai chocolate", Urgency::Watch),
                ],
                generated_at: Utc::now(),
            }),
            calendar: Some(ContentCalendar::degraded("Mock calendar (RADAR_AI_MODE=mock)")),
        }
    }
}

#[async_trait]
impl Summarizer for MockSummarizer {
    async fn summarize(&self, _bundle: &ScanBundle) -> Option<TrendAnalysis> {
        self.analysis.clone()
    }
    async fn calendar(
        &self,
        _analysis: Option<&TrendAnalysis>,
        _bundle: &ScanBundle,
    ) -> Option<ContentCalendar> {
        self.calendar.clone()
    }
    fn provider_name(&self) -> &'static str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn analysis_keeps_raw_text_when_unparseable() {
        let a = analysis_from_model_text("Quiet week, nothing stands out.");
        assert_eq!(a.summary, "Quiet week, nothing stands out.");
        assert!(a.top_trends.is_empty());
    }

    #[test]
    fn analysis_salvages_chatty_output() {
        let raw = "Here is the analysis:\n```json\n{\"summary\":\"Spicy\",\"topTrends\":[\
                   {\"trend\":\"Swicy wings\",\"why\":\"w\",\"urgency\":\"film now\",\
                   \"platforms\":[\"reddit\"],\"contentBrief\":\"c\"},]}\n```";
        let a = analysis_from_model_text(raw);
        assert_eq!(a.summary, "Spicy");
        assert_eq!(a.top_trends.len(), 1);
        assert_eq!(a.urgency_counts().film_now, 1);
    }

    #[test]
    fn analysis_keeps_good_trends_beside_a_broken_one() {
        let raw = r#"{"summary":"s","topTrends":[{"trend":"Birria","urgency":"film now"},{"why":"no name","urgency":"watch"}]}"#;
        let a = analysis_from_model_text(raw);
        assert_eq!(a.summary, "s");
        assert_eq!(a.top_trends.len(), 1);
        assert_eq!(a.top_trends[0].trend, "Birria");
        assert_eq!(a.urgency_counts().film_now, 1);
    }

    #[test]
    fn prompt_caps_items() {
        let p = analysis_prompt(&ScanBundle::default(), 15);
        assert!(p.contains("YOUTUBE (top food videos gaining traction):\n[]"));
        assert!(p.contains("\"dailyTrends\": []"));
    }
}
