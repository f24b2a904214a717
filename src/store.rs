//! Append-only persistence for scans and alert deliveries.
//!
//! Records are never mutated after insert. `JsonlScanStore` appends one JSON
//! document per line; `MemoryScanStore` backs tests and ephemeral runs.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;

use crate::analyze::{TrendAnalysis, Urgency, UrgencyCounts};
use crate::error::StoreError;
use crate::ingest::types::{ScanBundle, ScoredItem, TrendsSnapshot};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanRecord {
    pub id: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub videos: Vec<ScoredItem>,
    #[serde(default)]
    pub posts: Vec<ScoredItem>,
    #[serde(default)]
    pub trends: TrendsSnapshot,
    #[serde(default)]
    pub analysis: Option<TrendAnalysis>,
    pub film_now_count: usize,
    pub this_week_count: usize,
    pub watch_count: usize,
}

impl ScanRecord {
    /// Fresh record with a new id and urgency counts taken from the analysis.
    pub fn new(bundle: ScanBundle, analysis: Option<TrendAnalysis>, now: DateTime<Utc>) -> Self {
        let counts = analysis
            .as_ref()
            .map(TrendAnalysis::urgency_counts)
            .unwrap_or_default();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            created_at: now,
            videos: bundle.videos,
            posts: bundle.posts,
            trends: bundle.trends,
            analysis,
            film_now_count: counts.film_now,
            this_week_count: counts.this_week,
            watch_count: counts.watch,
        }
    }

    pub fn counts(&self) -> UrgencyCounts {
        UrgencyCounts {
            film_now: self.film_now_count,
            this_week: self.this_week_count,
            watch: self.watch_count,
        }
    }

    pub fn has_content(&self) -> bool {
        !self.videos.is_empty() || !self.posts.is_empty()
    }
}

/// One trend that was (or failed to be) announced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertRecord {
    #[serde(default)]
    pub scan_id: Option<String>,
    pub recipients: Vec<String>,
    pub trend_name: String,
    pub urgency: Urgency,
    #[serde(default)]
    pub content_brief: Option<String>,
    pub email_sent: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct ScanFilter {
    pub since: Option<DateTime<Utc>>,
    pub limit: Option<usize>,
    /// Only scans that carry videos or posts.
    pub non_empty_only: bool,
}

impl ScanFilter {
    fn accepts(&self, r: &ScanRecord) -> bool {
        self.since.map_or(true, |s| r.created_at >= s) && (!self.non_empty_only || r.has_content())
    }
}

#[async_trait]
pub trait ScanStore: Send + Sync {
    /// Append a scan; returns its id.
    async fn insert_scan(&self, record: ScanRecord) -> Result<String, StoreError>;
    /// Matching scans, newest first.
    async fn query_scans(&self, filter: &ScanFilter) -> Result<Vec<ScanRecord>, StoreError>;
    async fn insert_alert(&self, record: AlertRecord) -> Result<(), StoreError>;
    /// Alerts at or after `since`, newest first.
    async fn query_alerts(
        &self,
        since: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<AlertRecord>, StoreError>;
}

pub type DynScanStore = Arc<dyn ScanStore>;

fn newest_first<T>(mut rows: Vec<T>, created: impl Fn(&T) -> DateTime<Utc>, limit: Option<usize>) -> Vec<T> {
    // Insertion order breaks ties, so reverse before the stable sort.
    rows.reverse();
    rows.sort_by(|a, b| created(b).cmp(&created(a)));
    if let Some(n) = limit {
        rows.truncate(n);
    }
    rows
}

// ------------------------------------------------------------
// In-memory
// ------------------------------------------------------------

#[derive(Debug, Default)]
pub struct MemoryScanStore {
    scans: Mutex<Vec<ScanRecord>>,
    alerts: Mutex<Vec<AlertRecord>>,
}

impl MemoryScanStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ScanStore for MemoryScanStore {
    async fn insert_scan(&self, record: ScanRecord) -> Result<String, StoreError> {
        let id = record.id.clone();
        self.scans
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push(record);
        Ok(id)
    }

    async fn query_scans(&self, filter: &ScanFilter) -> Result<Vec<ScanRecord>, StoreError> {
        let rows: Vec<ScanRecord> = self
            .scans
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .iter()
            .filter(|r| filter.accepts(r))
            .cloned()
            .collect();
        Ok(newest_first(rows, |r| r.created_at, filter.limit))
    }

    async fn insert_alert(&self, record: AlertRecord) -> Result<(), StoreError> {
        self.alerts
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push(record);
        Ok(())
    }

    async fn query_alerts(
        &self,
        since: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<AlertRecord>, StoreError> {
        let rows: Vec<AlertRecord> = self
            .alerts
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .iter()
            .filter(|a| a.created_at >= since)
            .cloned()
            .collect();
        Ok(newest_first(rows, |a| a.created_at, Some(limit)))
    }
}

// ------------------------------------------------------------
// JSON lines on disk
// ------------------------------------------------------------

/// Two append-only files: one scan per line, one alert per line.
/// Lines that fail to decode are skipped on read.
pub struct JsonlScanStore {
    scans_path: PathBuf,
    alerts_path: PathBuf,
    write_lock: tokio::sync::Mutex<()>,
}

impl JsonlScanStore {
    pub fn new(scans_path: impl Into<PathBuf>, alerts_path: impl Into<PathBuf>) -> Self {
        Self {
            scans_path: scans_path.into(),
            alerts_path: alerts_path.into(),
            write_lock: tokio::sync::Mutex::new(()),
        }
    }

    async fn append<T: Serialize>(&self, path: &PathBuf, row: &T) -> Result<(), StoreError> {
        let mut line = serde_json::to_vec(row)?;
        line.push(b'\n');
        let _guard = self.write_lock.lock().await;
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(dir).await?;
        }
        let mut f = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await?;
        f.write_all(&line).await?;
        f.flush().await?;
        Ok(())
    }

    async fn read_all<T: DeserializeOwned>(path: &PathBuf) -> Result<Vec<T>, StoreError> {
        let body = match tokio::fs::read_to_string(path).await {
            Ok(s) => s,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let mut out = Vec::new();
        for (n, line) in body.lines().enumerate().filter(|(_, l)| !l.trim().is_empty()) {
            match serde_json::from_str::<T>(line) {
                Ok(v) => out.push(v),
                Err(e) => {
                    tracing::warn!(target: "store", path = %path.display(), line = n + 1, error = %e, "skipping bad row")
                }
            }
        }
        Ok(out)
    }
}

#[async_trait]
impl ScanStore for JsonlScanStore {
    async fn insert_scan(&self, record: ScanRecord) -> Result<String, StoreError> {
        self.append(&self.scans_path, &record).await?;
        Ok(record.id)
    }

    async fn query_scans(&self, filter: &ScanFilter) -> Result<Vec<ScanRecord>, StoreError> {
        let rows: Vec<ScanRecord> = Self::read_all(&self.scans_path).await?;
        let rows = rows.into_iter().filter(|r| filter.accepts(r)).collect();
        Ok(newest_first(rows, |r| r.created_at, filter.limit))
    }

    async fn insert_alert(&self, record: AlertRecord) -> Result<(), StoreError> {
        self.append(&self.alerts_path, &record).await
    }

    async fn query_alerts(
        &self,
        since: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<AlertRecord>, StoreError> {
        let rows: Vec<AlertRecord> = Self::read_all(&self.alerts_path).await?;
        let rows = rows.into_iter().filter(|a| a.created_at >= since).collect();
        Ok(newest_first(rows, |a| a.created_at, Some(limit)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn at(h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 17, h, 0, 0).unwrap()
    }

    fn post() -> ScoredItem {
        use crate::ingest::types::{Platform, RawMetric};
        ScoredItem {
            metric: RawMetric {
                id: "p1".into(),
                platform: Platform::Reddit,
                title: "Birria ramen".into(),
                text: String::new(),
                author: "u".into(),
                community: Some("FoodNYC".into()),
                url: "https://reddit.com/r/FoodNYC/p1".into(),
                thumbnail: None,
                published_at: at(0),
                primary: 300,
                secondary: 0,
                tertiary: 40,
                audience: None,
                upvote_ratio: Some(0.96),
            },
            hours_old: 1.0,
            velocity: 300.0,
            virality_score: 70,
        }
    }

    fn record(h: u32, with_posts: bool) -> ScanRecord {
        let mut r = ScanRecord::new(ScanBundle::default(), None, at(h));
        if with_posts {
            r.posts = vec![post()];
        }
        r
    }

    #[tokio::test]
    async fn memory_store_filters_and_orders() {
        let store = MemoryScanStore::new();
        store.insert_scan(record(1, true)).await.unwrap();
        let empty_id = store.insert_scan(record(3, false)).await.unwrap();
        let newest = store.insert_scan(record(2, true)).await.unwrap();

        let all = store.query_scans(&ScanFilter::default()).await.unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].id, empty_id);

        let filter = ScanFilter {
            non_empty_only: true,
            limit: Some(1),
            ..Default::default()
        };
        let latest = store.query_scans(&filter).await.unwrap();
        assert_eq!(latest.len(), 1);
        assert_eq!(latest[0].id, newest);

        let since = ScanFilter {
            since: Some(at(2)),
            ..Default::default()
        };
        assert_eq!(store.query_scans(&since).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn jsonl_store_roundtrips_and_skips_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let scans = dir.path().join("state/scans.jsonl");
        let alerts = dir.path().join("state/alerts.jsonl");
        let store = JsonlScanStore::new(&scans, &alerts);

        let id = store.insert_scan(record(5, true)).await.unwrap();
        tokio::fs::write(
            &scans,
            format!("{}not json\n", tokio::fs::read_to_string(&scans).await.unwrap()),
        )
        .await
        .unwrap();

        let rows = store.query_scans(&ScanFilter::default()).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, id);
        assert_eq!(rows[0].posts.len(), 1);

        store
            .insert_alert(AlertRecord {
                scan_id: Some(id.clone()),
                recipients: vec!["a@example.com".into()],
                trend_name: "Hot honey".into(),
                urgency: Urgency::FilmNow,
                content_brief: None,
                email_sent: true,
                created_at: at(5),
            })
            .await
            .unwrap();
        let got = store.query_alerts(at(5) - Duration::days(7), 50).await.unwrap();
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].scan_id.as_deref(), Some(id.as_str()));
        assert!(store.query_alerts(at(6), 50).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn missing_files_read_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonlScanStore::new(dir.path().join("s.jsonl"), dir.path().join("a.jsonl"));
        assert!(store.query_scans(&ScanFilter::default()).await.unwrap().is_empty());
    }
}
