// src/analyze/mod.rs
//! Scoring of raw items and the LLM-backed trend analysis built on top of a scan.

pub mod ai_adapter;
pub mod calendar;
pub mod profiles;
pub mod salvage;
pub mod scoring;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use crate::analyze::ai_adapter::{build_summarizer, DynSummarizer, Summarizer};
pub use crate::analyze::calendar::ContentCalendar;
pub use crate::analyze::scoring::{score, ScoringProfile};

/// How soon a trend should be filmed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "Option<String>")]
pub enum Urgency {
    #[serde(rename = "film now")]
    FilmNow,
    #[serde(rename = "this week")]
    ThisWeek,
    #[serde(rename = "watch")]
    Watch,
    /// Anything the model made up; never counted.
    #[serde(rename = "unknown")]
    #[default]
    Unknown,
}

impl From<Option<String>> for Urgency {
    fn from(s: Option<String>) -> Self {
        s.map(Urgency::from).unwrap_or_default()
    }
}

impl From<String> for Urgency {
    fn from(s: String) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "film now" => Urgency::FilmNow,
            "this week" => Urgency::ThisWeek,
            "watch" => Urgency::Watch,
            _ => Urgency::Unknown,
        }
    }
}

impl Urgency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Urgency::FilmNow => "film now",
            Urgency::ThisWeek => "this week",
            Urgency::Watch => "watch",
            Urgency::Unknown => "unknown",
        }
    }

    /// Film now and this week trigger alerts.
    pub fn is_urgent(&self) -> bool {
        matches!(self, Urgency::FilmNow | Urgency::ThisWeek)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendSource {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub platform: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopTrend {
    pub trend: String,
    #[serde(default)]
    pub why: String,
    #[serde(default)]
    pub urgency: Urgency,
    #[serde(default)]
    pub platforms: Vec<String>,
    #[serde(default)]
    pub content_brief: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub restaurants: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sources: Option<Vec<TrendSource>>,
}

/// Summarizer output attached to a scan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendAnalysis {
    #[serde(default)]
    pub summary: String,
    #[serde(default, deserialize_with = "lenient_trends")]
    pub top_trends: Vec<TopTrend>,
    #[serde(default = "Utc::now")]
    pub generated_at: DateTime<Utc>,
}

/// Keeps every well-formed entry; a malformed one is dropped on its own and
/// `null` reads as no trends.
fn lenient_trends<'de, D>(de: D) -> Result<Vec<TopTrend>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw: Option<Vec<serde_json::Value>> = Option::deserialize(de)?;
    Ok(raw
        .unwrap_or_default()
        .into_iter()
        .filter_map(|v| serde_json::from_value(v).ok())
        .collect())
}

impl TrendAnalysis {
    /// Raw model text kept as the summary when no JSON could be recovered.
    pub fn degraded(raw: &str, now: DateTime<Utc>) -> Self {
        Self {
            summary: raw.trim().to_string(),
            top_trends: Vec::new(),
            generated_at: now,
        }
    }

    pub fn urgency_counts(&self) -> UrgencyCounts {
        UrgencyCounts::tally(self.top_trends.iter().map(|t| t.urgency))
    }

    pub fn urgent_trends(&self) -> impl Iterator<Item = &TopTrend> {
        self.top_trends.iter().filter(|t| t.urgency.is_urgent())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UrgencyCounts {
    pub film_now: usize,
    pub this_week: usize,
    pub watch: usize,
}

impl UrgencyCounts {
    pub fn tally(urgencies: impl IntoIterator<Item = Urgency>) -> Self {
        let mut c = Self::default();
        for u in urgencies {
            match u {
                Urgency::FilmNow => c.film_now += 1,
                Urgency::ThisWeek => c.this_week += 1,
                Urgency::Watch => c.watch += 1,
                Urgency::Unknown => {}
            }
        }
        c
    }

    pub fn urgent(&self) -> usize {
        self.film_now + self.this_week
    }
}
