// src/ingest/providers/trends.rs
use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use metrics::counter;
use quick_xml::de::from_str;
use serde::Deserialize;
use time::{format_description::well_known::Rfc2822, OffsetDateTime};

use super::http_client;
use crate::config::radar::{RadarConfig, TrendsConfig, TrendsFormat};
use crate::error::SourceError;
use crate::ingest::normalize_text;
use crate::ingest::types::{DailyTrend, SourcePayload, SourceProvider, TrendArticle, TrendsSnapshot};

pub const DEFAULT_JSON_URL: &str = "https://trends.google.com/trends/api/dailytrends";
pub const DEFAULT_RSS_URL: &str = "https://trends.google.com/trending/rss";

const BROWSER_UA: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

pub const DEFAULT_FOOD_TERMS: &[&str] = &[
    "food", "restaurant", "pizza", "burger", "taco", "sushi", "ramen", "chicken", "bbq", "steak",
    "seafood", "noodle", "sandwich", "coffee", "brunch", "dessert", "bakery", "chef", "cooking",
    "recipe", "eat", "dining", "menu", "flavor", "sauce", "spicy", "fried", "grilled", "vegan",
    "organic", "fast food", "delivery", "bar", "cafe", "bistro", "korean", "mexican", "italian",
    "japanese", "thai", "indian", "chinese", "boba", "matcha", "ice cream", "donut", "bagel",
    "wing", "fry",
];

/// Short stable id for a keyword (trends have no native id).
pub fn trend_id(keyword: &str) -> String {
    use sha2::{Digest, Sha256};
    let digest = Sha256::digest(keyword.trim().to_lowercase().as_bytes());
    let mut out = String::with_capacity(12);
    for b in digest.iter().take(6) {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}

// --- JSON endpoint ---

#[derive(Debug, Deserialize)]
struct DailyTrendsEnvelope {
    #[serde(rename = "default")]
    inner: DailyTrendsDefault,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DailyTrendsDefault {
    #[serde(default)]
    trending_searches_days: Vec<TrendingDay>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TrendingDay {
    #[serde(default)]
    trending_searches: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TrendingSearch {
    title: TrendingTitle,
    #[serde(default)]
    formatted_traffic: String,
    #[serde(default)]
    articles: Vec<JsonArticle>,
    #[serde(default)]
    related_queries: Vec<RelatedQuery>,
}

#[derive(Debug, Deserialize)]
struct TrendingTitle {
    query: String,
}

#[derive(Debug, Deserialize)]
struct JsonArticle {
    #[serde(default)]
    title: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    source: String,
}

#[derive(Debug, Deserialize)]
struct RelatedQuery {
    query: String,
}

/// Strip the `)]}'` anti-XSSI prefix Google puts in front of the JSON.
pub fn strip_xssi_prefix(body: &str) -> &str {
    let t = body.trim_start();
    match t.strip_prefix(")]}'") {
        Some(rest) => rest.trim_start_matches(',').trim_start(),
        None => t,
    }
}

/// Trends of the most recent day from the `dailytrends` JSON endpoint.
pub fn parse_daily_json(body: &str) -> Result<Vec<DailyTrend>, SourceError> {
    let env: DailyTrendsEnvelope = serde_json::from_str(strip_xssi_prefix(body))?;
    let Some(day) = env.inner.trending_searches_days.into_iter().next() else {
        return Ok(Vec::new());
    };
    Ok(day
        .trending_searches
        .into_iter()
        .filter_map(|v| serde_json::from_value::<TrendingSearch>(v).ok())
        .filter(|s| !s.title.query.trim().is_empty())
        .map(|s| DailyTrend {
            id: trend_id(&s.title.query),
            keyword: s.title.query,
            traffic: s.formatted_traffic,
            articles: s
                .articles
                .into_iter()
                .take(2)
                .map(|a| TrendArticle {
                    title: normalize_text(&a.title, 300),
                    url: a.url,
                    source: a.source,
                })
                .collect(),
            related_queries: s.related_queries.into_iter().map(|q| q.query).collect(),
            started_at: None,
        })
        .collect())
}

// --- RSS feed ---

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    item: Vec<RssItem>,
}

#[derive(Debug, Deserialize)]
struct RssItem {
    title: Option<String>,
    #[serde(rename = "ht_approx_traffic")]
    traffic: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    #[serde(rename = "ht_news_item", default)]
    news: Vec<RssNewsItem>,
}

#[derive(Debug, Deserialize)]
struct RssNewsItem {
    #[serde(rename = "ht_news_item_title")]
    title: Option<String>,
    #[serde(rename = "ht_news_item_url")]
    url: Option<String>,
    #[serde(rename = "ht_news_item_source")]
    source: Option<String>,
}

fn parse_rfc2822(ts: &str) -> Option<DateTime<Utc>> {
    let odt = OffsetDateTime::parse(ts.trim(), &Rfc2822).ok()?;
    DateTime::<Utc>::from_timestamp(odt.unix_timestamp(), 0)
}

/// Flatten the `ht:` namespace so serde field names stay plain.
fn scrub_namespaces(xml: &str) -> String {
    xml.replace("<ht:", "<ht_").replace("</ht:", "</ht_")
}

/// Trends from the trending-searches RSS feed.
pub fn parse_daily_rss(xml: &str) -> anyhow::Result<Vec<DailyTrend>> {
    let rss: Rss = from_str(&scrub_namespaces(xml)).context("parsing trends rss xml")?;
    Ok(rss
        .channel
        .item
        .into_iter()
        .filter_map(|it| {
            let keyword = it.title.map(|t| normalize_text(&t, 200))?;
            if keyword.is_empty() {
                return None;
            }
            Some(DailyTrend {
                id: trend_id(&keyword),
                traffic: it.traffic.unwrap_or_default(),
                articles: it
                    .news
                    .into_iter()
                    .take(2)
                    .map(|n| TrendArticle {
                        title: normalize_text(n.title.as_deref().unwrap_or_default(), 300),
                        url: n.url.unwrap_or_default(),
                        source: n.source.unwrap_or_default(),
                    })
                    .collect(),
                related_queries: Vec::new(),
                started_at: it.pub_date.as_deref().and_then(parse_rfc2822),
                keyword,
            })
        })
        .collect())
}

/// Top `max_daily` trends plus the food-related subset of all of them.
pub fn build_snapshot(all: Vec<DailyTrend>, food_terms: &[String], max_daily: usize) -> TrendsSnapshot {
    let food_trends = all
        .iter()
        .filter(|t| {
            let lower = t.keyword.to_lowercase();
            food_terms.iter().any(|term| lower.contains(term.as_str()))
        })
        .cloned()
        .collect();
    let mut daily_trends = all;
    daily_trends.truncate(max_daily);
    TrendsSnapshot {
        daily_trends,
        food_trends,
    }
}

pub struct TrendsProvider {
    client: reqwest::Client,
    cfg: TrendsConfig,
}

impl TrendsProvider {
    pub fn new(cfg: &RadarConfig) -> Result<Self, SourceError> {
        Ok(Self {
            client: http_client(&cfg.http, BROWSER_UA)?,
            cfg: cfg.trends.clone(),
        })
    }

    async fn fetch_body(&self) -> Result<String, SourceError> {
        let req = match self.cfg.format {
            TrendsFormat::Json => self.client.get(&self.cfg.json_url).query(&[
                ("hl", "en-US"),
                ("tz", "-300"),
                ("geo", self.cfg.geo.as_str()),
                ("ns", "15"),
            ]),
            TrendsFormat::Rss => self
                .client
                .get(&self.cfg.rss_url)
                .query(&[("geo", self.cfg.geo.as_str())]),
        };
        let body = req
            .header("Accept", "application/json, text/plain, */*")
            .header("Accept-Language", "en-US,en;q=0.9")
            .header("Referer", "https://trends.google.com/trending?geo=US")
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        Ok(body)
    }
}

#[async_trait]
impl SourceProvider for TrendsProvider {
    async fn fetch_latest(&self) -> Result<SourcePayload, SourceError> {
        let body = self.fetch_body().await?;
        let parsed = match self.cfg.format {
            TrendsFormat::Json => parse_daily_json(&body).map_err(|e| e.to_string()),
            TrendsFormat::Rss => parse_daily_rss(&body).map_err(|e| format!("{e:#}")),
        };
        let all = match parsed {
            Ok(v) => v,
            Err(e) => {
                // Google changes this endpoint often; an empty snapshot beats no scan.
                tracing::warn!(target: "ingest", source = "trends", error = %e, "trends payload unparseable");
                counter!("radar_source_parse_failures_total", "source" => "trends").increment(1);
                Vec::new()
            }
        };
        let snapshot = build_snapshot(all, &self.cfg.food_terms, self.cfg.max_daily);
        counter!("radar_source_items_total", "source" => "trends")
            .increment(snapshot.daily_trends.len() as u64);
        Ok(SourcePayload::Trends(snapshot))
    }

    fn name(&self) -> &'static str {
        "trends"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DAILY_JSON: &str = r#")]}',
{"default":{"trendingSearchesDays":[{"date":"20261017","trendingSearches":[
  {"title":{"query":"Crumbl cookie"},"formattedTraffic":"200K+",
   "articles":[{"title":"a1","url":"https://x/1","source":"S1"},
               {"title":"a2","url":"https://x/2","source":"S2"},
               {"title":"a3","url":"https://x/3","source":"S3"}],
   "relatedQueries":[{"query":"crumbl menu"}]},
  {"title":{"query":"Yankees"},"formattedTraffic":"1M+"},
  {"title":{"query":""}},
  {"formattedTraffic":"10K+"},
  {"title":{"query":"Dubai chocolate bar"},"formattedTraffic":"50K+"}
]}]}}"#;

    const RSS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss xmlns:ht="https://trends.google.com/trending/rss" version="2.0">
  <channel>
    <title>Daily Search Trends</title>
    <item>
      <title>hot honey pizza</title>
      <ht:approx_traffic>2000+</ht:approx_traffic>
      <pubDate>Sat, 17 Oct 2026 08:40:00 -0700</pubDate>
      <ht:news_item>
        <ht:news_item_title>Hot honey everywhere</ht:news_item_title>
        <ht:news_item_url>https://news.example/hh</ht:news_item_url>
        <ht:news_item_source>Eater</ht:news_item_source>
      </ht:news_item>
    </item>
    <item>
      <title>election results</title>
      <ht:approx_traffic>500000+</ht:approx_traffic>
    </item>
  </channel>
</rss>"#;

    #[test]
    fn json_endpoint_parses_first_day() {
        let trends = parse_daily_json(DAILY_JSON).unwrap();
        let kws: Vec<_> = trends.iter().map(|t| t.keyword.as_str()).collect();
        assert_eq!(kws, vec!["Crumbl cookie", "Yankees", "Dubai chocolate bar"]);
        assert_eq!(trends[0].traffic, "200K+");
        assert_eq!(trends[0].articles.len(), 2);
        assert_eq!(trends[0].related_queries, vec!["crumbl menu"]);
    }

    #[test]
    fn rss_feed_parses_namespaced_fields() {
        let trends = parse_daily_rss(RSS).unwrap();
        assert_eq!(trends.len(), 2);
        assert_eq!(trends[0].keyword, "hot honey pizza");
        assert_eq!(trends[0].traffic, "2000+");
        assert_eq!(trends[0].articles[0].source, "Eater");
        assert_eq!(
            trends[0].started_at.map(|t| t.timestamp()),
            Some(1_792_251_600)
        );
        assert!(trends[1].articles.is_empty());
    }

    #[test]
    fn snapshot_filters_food_terms_across_all_trends() {
        let all = parse_daily_json(DAILY_JSON).unwrap();
        let terms: Vec<String> = DEFAULT_FOOD_TERMS.iter().map(|s| s.to_string()).collect();
        let snap = build_snapshot(all, &terms, 1);
        assert_eq!(snap.daily_trends.len(), 1);
        let food: Vec<_> = snap.food_trends.iter().map(|t| t.keyword.as_str()).collect();
        // "Dubai chocolate bar" matches "bar" even though it fell outside the top 1.
        assert_eq!(food, vec!["Dubai chocolate bar"]);
    }

    #[test]
    fn xssi_prefix_is_optional() {
        assert_eq!(strip_xssi_prefix(")]}'\n{}"), "{}");
        assert_eq!(strip_xssi_prefix("{}"), "{}");
    }

    #[test]
    fn trend_ids_ignore_case_and_padding() {
        assert_eq!(trend_id("Crumbl Cookie "), trend_id("crumbl cookie"));
        assert_eq!(trend_id("x").len(), 12);
    }
}
