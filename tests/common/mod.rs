// tests/common/mod.rs
//
// Shared fixtures: metric builders and fake collaborators for the scan pipeline.
#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};

use previral_radar::analyze::{TopTrend, TrendAnalysis, Urgency};
use previral_radar::error::{SourceError, StoreError};
use previral_radar::ingest::types::{Platform, RawMetric, ScoredItem, SourcePayload, SourceProvider};
use previral_radar::notify::AlertSink;
use previral_radar::store::{AlertRecord, ScanFilter, ScanRecord, ScanStore};

pub fn metric(id: &str, platform: Platform, primary: i64, published_at: DateTime<Utc>) -> RawMetric {
    RawMetric {
        id: id.to_string(),
        platform,
        title: format!("item {id}"),
        text: String::new(),
        author: "someone".into(),
        community: None,
        url: format!("https://example.com/{id}"),
        thumbnail: None,
        published_at,
        primary,
        secondary: 0,
        tertiary: 0,
        audience: None,
        upvote_ratio: None,
    }
}

/// Fixed timestamps so equal ids build equal items.
pub fn scored(id: &str, score: u8) -> ScoredItem {
    let published = Utc.with_ymd_and_hms(2026, 10, 17, 10, 0, 0).unwrap();
    ScoredItem {
        metric: metric(id, Platform::Reddit, 100, published),
        hours_old: 2.0,
        velocity: 50.0,
        virality_score: score,
    }
}

pub fn analysis(urgencies: &[Urgency]) -> TrendAnalysis {
    TrendAnalysis {
        summary: "test summary".into(),
        top_trends: urgencies
            .iter()
            .enumerate()
            .map(|(i, u)| TopTrend {
                trend: format!("trend {i}"),
                why: "why".into(),
                urgency: *u,
                platforms: vec!["reddit".into()],
                content_brief: "brief".into(),
                restaurants: None,
                sources: None,
            })
            .collect(),
        generated_at: Utc::now(),
    }
}

/// Source returning a scripted result and counting calls.
pub struct FakeSource {
    pub name: &'static str,
    pub result: Mutex<Result<SourcePayload, SourceError>>,
    pub calls: AtomicUsize,
}

impl FakeSource {
    pub fn ok(name: &'static str, payload: SourcePayload) -> Self {
        Self {
            name,
            result: Mutex::new(Ok(payload)),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(name: &'static str, msg: &str) -> Self {
        Self {
            name,
            result: Mutex::new(Err(SourceError::Unavailable(msg.to_string()))),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn set(&self, result: Result<SourcePayload, SourceError>) {
        *self.result.lock().unwrap() = result;
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SourceProvider for FakeSource {
    async fn fetch_latest(&self) -> Result<SourcePayload, SourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.result.lock().unwrap().clone()
    }
    fn name(&self) -> &'static str {
        self.name
    }
}

/// Records what the pipeline asked to send.
#[derive(Default)]
pub struct RecordingAlerts {
    pub content: Mutex<Vec<Option<String>>>,
    pub errors: Mutex<Vec<Vec<String>>>,
}

#[async_trait]
impl AlertSink for RecordingAlerts {
    async fn send(&self, _analysis: &TrendAnalysis, scan_id: Option<&str>) -> bool {
        self.content.lock().unwrap().push(scan_id.map(str::to_string));
        true
    }
    async fn send_error(&self, errors: &[String]) -> bool {
        self.errors.lock().unwrap().push(errors.to_vec());
        true
    }
}

/// Store whose writes always fail.
pub struct BrokenStore;

#[async_trait]
impl ScanStore for BrokenStore {
    async fn insert_scan(&self, _record: ScanRecord) -> Result<String, StoreError> {
        Err(StoreError::Unavailable("disk full".into()))
    }
    async fn query_scans(&self, _filter: &ScanFilter) -> Result<Vec<ScanRecord>, StoreError> {
        Ok(Vec::new())
    }
    async fn insert_alert(&self, _record: AlertRecord) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("disk full".into()))
    }
    async fn query_alerts(
        &self,
        _since: DateTime<Utc>,
        _limit: usize,
    ) -> Result<Vec<AlertRecord>, StoreError> {
        Ok(Vec::new())
    }
}

pub fn arc<T>(v: T) -> Arc<T> {
    Arc::new(v)
}
