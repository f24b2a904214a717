// src/ingest/providers/youtube.rs
use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use metrics::counter;
use serde::Deserialize;

use super::{http_client, Pacer, SubQueryTally};
use crate::analyze::scoring::{score_all, ScoringProfile};
use crate::config::radar::{RadarConfig, YoutubeConfig};
use crate::error::SourceError;
use crate::ingest::normalize_text;
use crate::ingest::rank::dedup_and_rank;
use crate::ingest::types::{Platform, RawMetric, SourcePayload, SourceProvider};

pub const DEFAULT_BASE_URL: &str = "https://www.googleapis.com/youtube/v3";
pub const ENV_API_KEY: &str = "YOUTUBE_API_KEY";

pub const DEFAULT_QUERIES: &[&str] = &[
    "food review",
    "restaurant review",
    "food trend",
    "new food",
    "viral food",
    "best restaurants",
    "food challenge",
    "street food",
    "NYC restaurant",
    "Boca Raton food",
    "celebrity chef",
    "mukbang",
];

// --- wire shapes (only what we read) ---

#[derive(Debug, Deserialize)]
struct ItemsEnvelope {
    #[serde(default)]
    items: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchItem {
    id: SearchId,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchId {
    video_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct VideoItem {
    id: String,
    snippet: VideoSnippet,
    #[serde(default)]
    statistics: VideoStatistics,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VideoSnippet {
    title: String,
    #[serde(default)]
    description: String,
    channel_id: String,
    #[serde(default)]
    channel_title: String,
    published_at: String,
    #[serde(default)]
    thumbnails: Option<Thumbnails>,
}

#[derive(Debug, Deserialize)]
struct Thumbnails {
    medium: Option<Thumbnail>,
}

#[derive(Debug, Deserialize)]
struct Thumbnail {
    url: String,
}

/// The Data API reports counters as decimal strings.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VideoStatistics {
    view_count: Option<String>,
    like_count: Option<String>,
    comment_count: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChannelItem {
    id: String,
    #[serde(default)]
    statistics: ChannelStatistics,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChannelStatistics {
    subscriber_count: Option<String>,
}

/// A video as parsed, before the channel audience is known.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoRow {
    pub id: String,
    pub title: String,
    pub description: String,
    pub channel_id: String,
    pub channel_title: String,
    pub published_at: DateTime<Utc>,
    pub thumbnail: Option<String>,
    pub views: i64,
    pub likes: i64,
    pub comments: i64,
}

/// Lenient counter parse: hidden or garbled counts become 0.
pub fn parse_count(raw: Option<&str>) -> i64 {
    raw.and_then(|s| s.trim().parse::<i64>().ok()).unwrap_or(0)
}

fn envelope(body: &str) -> Result<Vec<serde_json::Value>, SourceError> {
    let env: ItemsEnvelope = serde_json::from_str(body)?;
    Ok(env.items)
}

/// Video ids from a search response; items without a video id are skipped.
pub fn parse_search_ids(body: &str) -> Result<Vec<String>, SourceError> {
    Ok(envelope(body)?
        .into_iter()
        .filter_map(|v| serde_json::from_value::<SearchItem>(v).ok())
        .filter_map(|it| it.id.video_id)
        .filter(|id| !id.is_empty())
        .collect())
}

/// Videos from a `videos?part=statistics,snippet` response. Malformed items
/// (missing snippet, unparseable timestamp) are dropped.
pub fn parse_videos(body: &str) -> Result<Vec<VideoRow>, SourceError> {
    let rows = envelope(body)?
        .into_iter()
        .filter_map(|v| serde_json::from_value::<VideoItem>(v).ok())
        .filter_map(|v| {
            let published_at = DateTime::parse_from_rfc3339(&v.snippet.published_at)
                .ok()?
                .with_timezone(&Utc);
            Some(VideoRow {
                id: v.id,
                title: normalize_text(&v.snippet.title, 300),
                description: normalize_text(&v.snippet.description, 500),
                channel_id: v.snippet.channel_id,
                channel_title: v.snippet.channel_title,
                published_at,
                thumbnail: v
                    .snippet
                    .thumbnails
                    .and_then(|t| t.medium)
                    .map(|t| t.url)
                    .filter(|u| !u.is_empty()),
                views: parse_count(v.statistics.view_count.as_deref()),
                likes: parse_count(v.statistics.like_count.as_deref()),
                comments: parse_count(v.statistics.comment_count.as_deref()),
            })
        })
        .collect();
    Ok(rows)
}

/// Subscriber counts keyed by channel id.
pub fn parse_channel_subscribers(body: &str) -> Result<HashMap<String, i64>, SourceError> {
    Ok(envelope(body)?
        .into_iter()
        .filter_map(|v| serde_json::from_value::<ChannelItem>(v).ok())
        .map(|c| (c.id, parse_count(c.statistics.subscriber_count.as_deref())))
        .collect())
}

impl VideoRow {
    pub fn into_metric(self, subscribers: Option<i64>) -> RawMetric {
        RawMetric {
            url: format!("https://www.youtube.com/watch?v={}", self.id),
            id: self.id,
            platform: Platform::Youtube,
            title: self.title,
            text: self.description,
            author: self.channel_title,
            community: None,
            thumbnail: self.thumbnail,
            published_at: self.published_at,
            primary: self.views,
            secondary: self.likes,
            tertiary: self.comments,
            audience: subscribers,
            upvote_ratio: None,
        }
    }
}

pub struct YoutubeProvider {
    client: reqwest::Client,
    api_key: Option<String>,
    cfg: YoutubeConfig,
    profile: ScoringProfile,
    top_n: usize,
    delay_ms: u64,
}

impl YoutubeProvider {
    pub fn new(cfg: &RadarConfig, api_key: Option<String>) -> Result<Self, SourceError> {
        Ok(Self {
            client: http_client(&cfg.http, concat!("previral-radar/", env!("CARGO_PKG_VERSION")))?,
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            cfg: cfg.youtube.clone(),
            profile: cfg.scoring.youtube.clone(),
            top_n: cfg.top_n,
            delay_ms: cfg.http.request_delay_ms,
        })
    }

    /// Reads `YOUTUBE_API_KEY`; a missing key surfaces on fetch, not here.
    pub fn from_env(cfg: &RadarConfig) -> Result<Self, SourceError> {
        Self::new(cfg, std::env::var(ENV_API_KEY).ok())
    }

    async fn get(&self, path: &str, query: &[(&str, &str)], key: &str) -> Result<String, SourceError> {
        let url = format!("{}/{}", self.cfg.base_url.trim_end_matches('/'), path);
        let resp = self
            .client
            .get(url)
            .query(query)
            .query(&[("key", key)])
            .send()
            .await?
            .error_for_status()?;
        Ok(resp.text().await?)
    }

    /// search → video stats → channel stats for one topic query.
    async fn fetch_query(
        &self,
        query: &str,
        key: &str,
        published_after: &str,
        pacer: &mut Pacer,
    ) -> Result<Vec<RawMetric>, SourceError> {
        let max_results = self.cfg.max_results.to_string();
        pacer.wait().await;
        let search = self
            .get(
                "search",
                &[
                    ("part", "snippet"),
                    ("q", query),
                    ("type", "video"),
                    ("order", "viewCount"),
                    ("publishedAfter", published_after),
                    ("maxResults", max_results.as_str()),
                    ("relevanceLanguage", "en"),
                ],
                key,
            )
            .await?;
        let ids = parse_search_ids(&search)?;
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        pacer.wait().await;
        let stats = self
            .get(
                "videos",
                &[("part", "statistics,snippet"), ("id", ids.join(",").as_str())],
                key,
            )
            .await?;
        let videos = parse_videos(&stats)?;

        let mut channel_ids: Vec<&str> = Vec::new();
        for v in &videos {
            if !channel_ids.contains(&v.channel_id.as_str()) {
                channel_ids.push(&v.channel_id);
            }
        }
        let subs = if channel_ids.is_empty() {
            HashMap::new()
        } else {
            pacer.wait().await;
            let joined = channel_ids.join(",");
            match self
                .get("channels", &[("part", "statistics"), ("id", joined.as_str())], key)
                .await
                .and_then(|body| parse_channel_subscribers(&body))
            {
                Ok(m) => m,
                Err(e) => {
                    // Reach bucket is skipped for these videos; the rest still scores.
                    tracing::warn!(target: "ingest", source = "youtube", query, error = %e, "channel lookup failed");
                    HashMap::new()
                }
            }
        };

        Ok(videos
            .into_iter()
            .map(|v| {
                let audience = subs.get(&v.channel_id).copied();
                v.into_metric(audience)
            })
            .collect())
    }
}

#[async_trait]
impl SourceProvider for YoutubeProvider {
    async fn fetch_latest(&self) -> Result<SourcePayload, SourceError> {
        let key = self
            .api_key
            .as_deref()
            .ok_or_else(|| SourceError::Unavailable(format!("{ENV_API_KEY} not configured")))?;

        let published_after = (Utc::now() - Duration::days(self.cfg.lookback_days))
            .to_rfc3339_opts(SecondsFormat::Secs, true);
        let mut pacer = Pacer::from_millis(self.delay_ms);
        let mut tally = SubQueryTally::default();
        let mut all = Vec::new();

        for query in &self.cfg.queries {
            let res = self.fetch_query(query, key, &published_after, &mut pacer).await;
            let outcome = res.as_ref().map(Vec::len).map_err(Clone::clone);
            tally.record("youtube", query, &outcome);
            if let Ok(mut v) = res {
                all.append(&mut v);
            }
        }
        tally.into_result("youtube")?;

        let ranked = dedup_and_rank(score_all(all, &self.profile, Utc::now()), self.top_n);
        counter!("radar_source_items_total", "source" => "youtube").increment(ranked.len() as u64);
        Ok(SourcePayload::Videos(ranked))
    }

    fn name(&self) -> &'static str {
        "youtube"
    }
}
