// src/analyze/calendar.rs
//! Seven-day filming plan generated from the latest analysis.

use serde::{Deserialize, Serialize};

use super::salvage::salvage;
use super::TrendAnalysis;
use crate::ingest::types::ScanBundle;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarDay {
    #[serde(default)]
    pub day: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub concept: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub why: String,
    #[serde(default)]
    pub filming_time: String,
    #[serde(default)]
    pub platforms: Vec<String>,
    #[serde(default)]
    pub priority: String,
    #[serde(default)]
    pub trend_connection: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BonusIdea {
    pub concept: String,
    #[serde(default)]
    pub why: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentCalendar {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub week_of: Option<String>,
    #[serde(default)]
    pub overview: String,
    #[serde(default)]
    pub days: Vec<CalendarDay>,
    #[serde(default)]
    pub bonus_ideas: Vec<BonusIdea>,
}

impl ContentCalendar {
    pub fn degraded(raw: &str) -> Self {
        Self {
            week_of: None,
            overview: raw.trim().to_string(),
            days: Vec::new(),
            bonus_ideas: Vec::new(),
        }
    }

    /// Salvage chain, falling back to the raw text as the overview.
    pub fn from_model_text(raw: &str) -> Self {
        match salvage::<ContentCalendar>(raw) {
            Some((cal, stage)) => {
                tracing::debug!(target: "analyze", ?stage, days = cal.days.len(), "calendar parsed");
                cal
            }
            None => Self::degraded(raw),
        }
    }
}

pub const CALENDAR_SYSTEM_PROMPT: &str = r#"You are a content strategist for a food review channel that films in NYC and Boca Raton / South Florida. The host interviews restaurant owners and tries their food.

Generate a 7-day content calendar based on current food trend data. Each day has a specific video concept, where to film (a specific restaurant or area), why it is timely, estimated filming time and which platform to post first.

Output valid JSON with this structure:
{
  "weekOf": "Feb 24 - Mar 2",
  "overview": "1-2 sentence strategy overview for the week",
  "days": [
    {
      "day": "Monday",
      "date": "Feb 24",
      "concept": "Video title/concept",
      "location": "Specific restaurant or area",
      "why": "Why this is timely",
      "filmingTime": "2-3 hours",
      "platforms": ["youtube", "tiktok", "instagram"],
      "priority": "high" | "medium" | "low",
      "trendConnection": "Which detected trend this connects to"
    }
  ],
  "bonusIdeas": [{ "concept": "Extra idea", "why": "Brief reasoning" }]
}

Only return valid JSON. No other text."#;

#[derive(Serialize)]
struct VideoLine<'a> {
    title: &'a str,
    views: i64,
    channel: &'a str,
}

#[derive(Serialize)]
struct PostLine<'a> {
    title: &'a str,
    score: i64,
    subreddit: &'a str,
}

/// User message: up to 8 detected trends, 10 videos and 10 posts.
pub fn calendar_prompt(analysis: Option<&TrendAnalysis>, bundle: &ScanBundle) -> String {
    let trends = analysis
        .map(|a| a.top_trends.iter().take(8).collect::<Vec<_>>())
        .unwrap_or_default();
    let videos: Vec<VideoLine<'_>> = bundle
        .videos
        .iter()
        .take(10)
        .map(|v| VideoLine {
            title: &v.metric.title,
            views: v.metric.primary,
            channel: &v.metric.author,
        })
        .collect();
    let posts: Vec<PostLine<'_>> = bundle
        .posts
        .iter()
        .take(10)
        .map(|p| PostLine {
            title: &p.metric.title,
            score: p.metric.primary,
            subreddit: p.metric.community.as_deref().unwrap_or_default(),
        })
        .collect();

    format!(
        "Based on the latest trend scan data, create a content calendar for this week:\n\n\
         DETECTED TRENDS:\n{}\n\nTRENDING YOUTUBE VIDEOS:\n{}\n\nTRENDING REDDIT POSTS:\n{}\n\n\
         Be specific with NYC and Boca Raton restaurant/location recommendations.",
        pretty(&trends),
        pretty(&videos),
        pretty(&posts)
    )
}

pub(crate) fn pretty<T: Serialize + ?Sized>(v: &T) -> String {
    serde_json::to_string_pretty(v).unwrap_or_else(|_| "[]".to_string())
}
