// src/ingest/types.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::SourceError;

/// Platform an item was collected from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    Youtube,
    Reddit,
    GoogleTrends,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Youtube => "youtube",
            Platform::Reddit => "reddit",
            Platform::GoogleTrends => "google_trends",
        }
    }
}

/// Normalized engagement counters for one piece of content, as produced by a
/// connector. Counts are signed: forum scores can go negative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawMetric {
    pub id: String,
    pub platform: Platform,
    pub title: String,
    #[serde(default)]
    pub text: String,
    pub author: String,
    /// Subreddit for forum posts, none for videos.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub community: Option<String>,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
    pub published_at: DateTime<Utc>,
    /// Views (video) or score (post).
    pub primary: i64,
    /// Likes. Zero where the platform has none.
    #[serde(default)]
    pub secondary: i64,
    /// Comments.
    #[serde(default)]
    pub tertiary: i64,
    /// Channel subscribers, when the platform exposes an audience size.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audience: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upvote_ratio: Option<f64>,
}

/// A `RawMetric` plus the derived virality fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoredItem {
    #[serde(flatten)]
    pub metric: RawMetric,
    /// Whole hours since publish.
    pub hours_old: f64,
    /// Primary count per hour, whole number.
    pub velocity: f64,
    pub virality_score: u8,
}

impl ScoredItem {
    pub fn id(&self) -> &str {
        &self.metric.id
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendArticle {
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub source: String,
}

/// One trending search keyword.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyTrend {
    /// Stable short hash of the keyword; trends carry no native id.
    pub id: String,
    pub keyword: String,
    /// Human formatted traffic, e.g. "200K+".
    pub traffic: String,
    #[serde(default)]
    pub articles: Vec<TrendArticle>,
    #[serde(default)]
    pub related_queries: Vec<String>,
    /// When the feed says the trend started; the JSON endpoint omits it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendsSnapshot {
    pub daily_trends: Vec<DailyTrend>,
    pub food_trends: Vec<DailyTrend>,
}

impl TrendsSnapshot {
    pub fn is_empty(&self) -> bool {
        self.daily_trends.is_empty() && self.food_trends.is_empty()
    }
}

/// What a single source contributes to a scan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum SourcePayload {
    Videos(Vec<ScoredItem>),
    Posts(Vec<ScoredItem>),
    Trends(TrendsSnapshot),
}

impl SourcePayload {
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn len(&self) -> usize {
        match self {
            SourcePayload::Videos(v) | SourcePayload::Posts(v) => v.len(),
            SourcePayload::Trends(t) => t.daily_trends.len().max(t.food_trends.len()),
        }
    }
}

#[async_trait::async_trait]
pub trait SourceProvider: Send + Sync {
    async fn fetch_latest(&self) -> Result<SourcePayload, SourceError>;
    fn name(&self) -> &'static str;
}

/// Everything one scan collected, merged in connector order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanBundle {
    #[serde(default)]
    pub videos: Vec<ScoredItem>,
    #[serde(default)]
    pub posts: Vec<ScoredItem>,
    #[serde(default)]
    pub trends: TrendsSnapshot,
}

impl ScanBundle {
    pub fn absorb(&mut self, payload: SourcePayload) {
        match payload {
            SourcePayload::Videos(v) => self.videos.extend(v),
            SourcePayload::Posts(p) => self.posts.extend(p),
            SourcePayload::Trends(t) => {
                self.trends.daily_trends.extend(t.daily_trends);
                self.trends.food_trends.extend(t.food_trends);
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.videos.is_empty() && self.posts.is_empty() && self.trends.is_empty()
    }

    /// Videos or posts present; trends alone do not make a scan worth showing.
    pub fn has_content(&self) -> bool {
        !self.videos.is_empty() || !self.posts.is_empty()
    }
}
