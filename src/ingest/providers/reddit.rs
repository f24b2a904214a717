// src/ingest/providers/reddit.rs
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use metrics::counter;
use serde::Deserialize;

use super::{http_client, Pacer, SubQueryTally};
use crate::analyze::scoring::{score_all, ScoringProfile};
use crate::config::radar::{RadarConfig, RedditConfig};
use crate::error::SourceError;
use crate::ingest::normalize_text;
use crate::ingest::rank::dedup_and_rank;
use crate::ingest::types::{Platform, RawMetric, SourcePayload, SourceProvider};

pub const DEFAULT_BASE_URL: &str = "https://www.reddit.com";
pub const DEFAULT_USER_AGENT: &str = "PreviralRadarBot/1.0 (food trend analysis tool)";

/// Multi-subreddit groups keep the request count low; Reddit throttles hard.
pub const DEFAULT_GROUPS: &[&str] = &[
    // national food
    "food+FoodPorn+streetfood",
    "Cooking+fastfood+restaurant",
    "Pizza+burgers+tacos",
    "ramen+sushi+eatsandwiches+foodhacks",
    // NYC
    "FoodNYC+nyceats+Brooklyn+newyorkcity+AskNYC",
    // South Florida
    "SouthFlorida+Miami+florida+fortlauderdale+BocaRaton",
];

#[derive(Debug, Deserialize)]
struct Listing {
    data: ListingData,
}

#[derive(Debug, Deserialize)]
struct ListingData {
    #[serde(default)]
    children: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct Child {
    data: Post,
}

#[derive(Debug, Deserialize)]
struct Post {
    id: String,
    title: String,
    #[serde(default)]
    selftext: String,
    #[serde(default)]
    author: String,
    subreddit: String,
    #[serde(default)]
    score: i64,
    #[serde(default)]
    num_comments: i64,
    permalink: String,
    #[serde(default)]
    thumbnail: Option<String>,
    created_utc: f64,
    #[serde(default)]
    upvote_ratio: Option<f64>,
    #[serde(default)]
    stickied: bool,
}

/// Posts from one `hot.json` listing. Stickied and malformed posts are skipped.
pub fn parse_listing(body: &str, selftext_max_chars: usize) -> Result<Vec<RawMetric>, SourceError> {
    let listing: Listing = serde_json::from_str(body)?;
    Ok(listing
        .data
        .children
        .into_iter()
        .filter_map(|v| serde_json::from_value::<Child>(v).ok())
        .map(|c| c.data)
        .filter(|p| !p.stickied && !p.id.is_empty())
        .filter_map(|p| post_to_metric(p, selftext_max_chars))
        .collect())
}

fn post_to_metric(p: Post, selftext_max_chars: usize) -> Option<RawMetric> {
    if !p.created_utc.is_finite() {
        return None;
    }
    let published_at = DateTime::<Utc>::from_timestamp(p.created_utc.trunc() as i64, 0)?;
    let permalink = if p.permalink.starts_with("http") {
        p.permalink
    } else {
        format!("https://reddit.com{}", p.permalink)
    };
    Some(RawMetric {
        id: p.id,
        platform: Platform::Reddit,
        title: normalize_text(&p.title, 300),
        text: normalize_text(&p.selftext, selftext_max_chars),
        author: p.author,
        community: Some(p.subreddit),
        url: permalink,
        thumbnail: p.thumbnail.filter(|t| t.starts_with("http")),
        published_at,
        primary: p.score,
        secondary: 0,
        tertiary: p.num_comments,
        audience: None,
        upvote_ratio: p.upvote_ratio,
    })
}

pub struct RedditProvider {
    client: reqwest::Client,
    cfg: RedditConfig,
    profile: ScoringProfile,
    top_n: usize,
    delay_ms: u64,
}

impl RedditProvider {
    pub fn new(cfg: &RadarConfig) -> Result<Self, SourceError> {
        Ok(Self {
            client: http_client(&cfg.http, &cfg.reddit.user_agent)?,
            cfg: cfg.reddit.clone(),
            profile: cfg.scoring.reddit.clone(),
            top_n: cfg.top_n,
            delay_ms: cfg.http.request_delay_ms,
        })
    }

    async fn fetch_group(&self, group: &str) -> Result<Vec<RawMetric>, SourceError> {
        let url = format!(
            "{}/r/{}/hot.json",
            self.cfg.base_url.trim_end_matches('/'),
            group
        );
        let body = self
            .client
            .get(url)
            .query(&[("limit", self.cfg.limit.to_string().as_str()), ("t", "week")])
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        parse_listing(&body, self.cfg.selftext_max_chars)
    }
}

#[async_trait]
impl SourceProvider for RedditProvider {
    async fn fetch_latest(&self) -> Result<SourcePayload, SourceError> {
        let mut pacer = Pacer::from_millis(self.delay_ms);
        let mut tally = SubQueryTally::default();
        let mut all = Vec::new();

        for group in &self.cfg.groups {
            pacer.wait().await;
            let res = self.fetch_group(group).await;
            tally.record("reddit", group, &res.as_ref().map(Vec::len).map_err(Clone::clone));
            if let Ok(mut v) = res {
                all.append(&mut v);
            }
        }
        tally.into_result("reddit")?;

        let ranked = dedup_and_rank(score_all(all, &self.profile, Utc::now()), self.top_n);
        counter!("radar_source_items_total", "source" => "reddit").increment(ranked.len() as u64);
        Ok(SourcePayload::Posts(ranked))
    }

    fn name(&self) -> &'static str {
        "reddit"
    }
}
