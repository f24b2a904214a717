// src/config/radar.rs
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::analyze::scoring::ScoringProfile;
use crate::ingest::providers::{reddit, trends, youtube};
use crate::ingest::rank::DEFAULT_TOP_N;

pub const ENV_CONFIG_PATH: &str = "RADAR_CONFIG_PATH";
pub const DEFAULT_CONFIG_PATH: &str = "config/radar.toml";
pub const ENV_SCAN_INTERVAL: &str = "RADAR_SCAN_INTERVAL_SECS";

/// Everything tunable about a scan. Secrets are not in here; they come from
/// the environment.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RadarConfig {
    /// Items each connector keeps after ranking.
    pub top_n: usize,
    pub http: HttpConfig,
    pub youtube: YoutubeConfig,
    pub reddit: RedditConfig,
    pub trends: TrendsConfig,
    pub scoring: ScoringConfig,
    pub scan: ScanConfig,
    pub summarizer: SummarizerConfig,
    pub storage: StorageConfig,
}

impl Default for RadarConfig {
    fn default() -> Self {
        Self {
            top_n: DEFAULT_TOP_N,
            http: HttpConfig::default(),
            youtube: YoutubeConfig::default(),
            reddit: RedditConfig::default(),
            trends: TrendsConfig::default(),
            scoring: ScoringConfig::default(),
            scan: ScanConfig::default(),
            summarizer: SummarizerConfig::default(),
            storage: StorageConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub request_timeout_secs: u64,
    pub connect_timeout_secs: u64,
    /// Pause between sub-queries against the same host.
    pub request_delay_ms: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: 10,
            connect_timeout_secs: 4,
            request_delay_ms: 200,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct YoutubeConfig {
    pub base_url: String,
    pub queries: Vec<String>,
    pub lookback_days: i64,
    pub max_results: u32,
    pub cache_ttl_hours: i64,
}

impl Default for YoutubeConfig {
    fn default() -> Self {
        Self {
            base_url: youtube::DEFAULT_BASE_URL.to_string(),
            queries: owned(youtube::DEFAULT_QUERIES),
            lookback_days: 7,
            max_results: 10,
            cache_ttl_hours: 6,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RedditConfig {
    pub base_url: String,
    /// Multi-subreddit groups (`a+b+c`), one request each.
    pub groups: Vec<String>,
    pub limit: u32,
    pub selftext_max_chars: usize,
    pub user_agent: String,
    pub cache_ttl_hours: i64,
}

impl Default for RedditConfig {
    fn default() -> Self {
        Self {
            base_url: reddit::DEFAULT_BASE_URL.to_string(),
            groups: owned(reddit::DEFAULT_GROUPS),
            limit: 25,
            selftext_max_chars: 300,
            user_agent: reddit::DEFAULT_USER_AGENT.to_string(),
            cache_ttl_hours: 3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendsFormat {
    Json,
    Rss,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrendsConfig {
    pub format: TrendsFormat,
    pub json_url: String,
    pub rss_url: String,
    pub geo: String,
    pub max_daily: usize,
    pub food_terms: Vec<String>,
    pub cache_ttl_hours: i64,
}

impl Default for TrendsConfig {
    fn default() -> Self {
        Self {
            format: TrendsFormat::Json,
            json_url: trends::DEFAULT_JSON_URL.to_string(),
            rss_url: trends::DEFAULT_RSS_URL.to_string(),
            geo: "US".to_string(),
            max_daily: 20,
            food_terms: owned(trends::DEFAULT_FOOD_TERMS),
            cache_ttl_hours: 3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub youtube: ScoringProfile,
    pub reddit: ScoringProfile,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            youtube: ScoringProfile::youtube_default(),
            reddit: ScoringProfile::reddit_default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Upper bound for one connector branch, cache fallback included.
    pub connector_timeout_secs: u64,
    /// None disables the background scheduler.
    pub interval_secs: Option<u64>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            connector_timeout_secs: 90,
            interval_secs: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SummarizerConfig {
    pub enabled: bool,
    pub base_url: String,
    pub model: String,
    pub max_tokens: u32,
    pub calendar_max_tokens: u32,
    pub timeout_secs: u64,
    /// Videos/posts included in the prompt.
    pub prompt_items: usize,
}

impl Default for SummarizerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: "https://api.anthropic.com".to_string(),
            model: "claude-sonnet-4-20250514".to_string(),
            max_tokens: 2048,
            calendar_max_tokens: 3000,
            timeout_secs: 60,
            prompt_items: 15,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub cache_dir: PathBuf,
    pub scans_path: PathBuf,
    pub alerts_path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            cache_dir: PathBuf::from("cache/sources"),
            scans_path: PathBuf::from("state/scans.jsonl"),
            alerts_path: PathBuf::from("state/alerts.jsonl"),
        }
    }
}

fn owned(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

impl RadarConfig {
    /// Load from an explicit TOML file; missing keys take defaults.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading radar config from {}", path.display()))?;
        let mut cfg: RadarConfig = toml::from_str(&content)
            .with_context(|| format!("parsing radar config {}", path.display()))?;
        cfg.apply_env_overrides();
        Ok(cfg)
    }

    /// Load using env var + fallbacks:
    /// 1) $RADAR_CONFIG_PATH (must exist)
    /// 2) config/radar.toml
    /// 3) built-in defaults
    pub fn load_default() -> Result<Self> {
        if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
            }
            return Self::load_from(&pb);
        }
        let default_path = PathBuf::from(DEFAULT_CONFIG_PATH);
        if default_path.exists() {
            return Self::load_from(&default_path);
        }
        let mut cfg = Self::default();
        cfg.apply_env_overrides();
        Ok(cfg)
    }

    fn apply_env_overrides(&mut self) {
        if let Some(secs) = std::env::var(ENV_SCAN_INTERVAL)
            .ok()
            .and_then(|v| v.trim().parse::<u64>().ok())
        {
            self.scan.interval_secs = (secs > 0).then_some(secs);
        }
        if self.top_n == 0 {
            self.top_n = DEFAULT_TOP_N;
        }
    }
}
