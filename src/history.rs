//! history.rs: read-side views over the scan store (latest scan, last week).

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::analyze::{TrendAnalysis, Urgency};
use crate::error::StoreError;
use crate::ingest::types::{ScoredItem, TrendsSnapshot};
use crate::store::{AlertRecord, ScanFilter, ScanStore};

pub const HISTORY_DAYS: i64 = 7;
/// Four scans a day for a week.
pub const HISTORY_MAX_SCANS: usize = 28;
pub const HISTORY_MAX_ALERTS: usize = 50;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LatestScan {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub videos: Vec<ScoredItem>,
    pub posts: Vec<ScoredItem>,
    pub trends: TrendsSnapshot,
    pub analysis: Option<TrendAnalysis>,
}

/// Most recent scan that carries videos or posts.
pub async fn latest_scan(store: &dyn ScanStore) -> Result<Option<LatestScan>, StoreError> {
    let filter = ScanFilter {
        since: None,
        limit: Some(1),
        non_empty_only: true,
    };
    Ok(store
        .query_scans(&filter)
        .await?
        .into_iter()
        .next()
        .map(|r| LatestScan {
            id: r.id,
            created_at: r.created_at,
            videos: r.videos,
            posts: r.posts,
            trends: r.trends,
            analysis: r.analysis,
        }))
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendHeadline {
    pub trend: String,
    pub urgency: Urgency,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanSummary {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub film_now: usize,
    pub this_week: usize,
    pub watch: usize,
    pub top_trends: Vec<TrendHeadline>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryView {
    pub scans: Vec<ScanSummary>,
    pub alerts: Vec<AlertRecord>,
    pub total_scans: usize,
    pub total_alerts: usize,
}

pub async fn recent_history(store: &dyn ScanStore, now: DateTime<Utc>) -> Result<HistoryView, StoreError> {
    let since = now - Duration::days(HISTORY_DAYS);
    let filter = ScanFilter {
        since: Some(since),
        limit: Some(HISTORY_MAX_SCANS),
        non_empty_only: false,
    };
    let scans: Vec<ScanSummary> = store
        .query_scans(&filter)
        .await?
        .into_iter()
        .map(|r| {
            let counts = r.counts();
            ScanSummary {
                top_trends: r
                    .analysis
                    .map(|a| {
                        a.top_trends
                            .into_iter()
                            .take(3)
                            .map(|t| TrendHeadline {
                                trend: t.trend,
                                urgency: t.urgency,
                            })
                            .collect()
                    })
                    .unwrap_or_default(),
                id: r.id,
                created_at: r.created_at,
                film_now: counts.film_now,
                this_week: counts.this_week,
                watch: counts.watch,
            }
        })
        .collect();
    let alerts = store.query_alerts(since, HISTORY_MAX_ALERTS).await?;
    Ok(HistoryView {
        total_scans: scans.len(),
        total_alerts: alerts.len(),
        scans,
        alerts,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyze::TopTrend;
    use crate::ingest::types::ScanBundle;
    use crate::store::{MemoryScanStore, ScanRecord};

    fn analysis(n: usize) -> TrendAnalysis {
        TrendAnalysis {
            summary: "s".into(),
            top_trends: (0..n)
                .map(|i| TopTrend {
                    trend: format!("t{i}"),
                    why: String::new(),
                    urgency: if i == 0 { Urgency::FilmNow } else { Urgency::Watch },
                    platforms: vec![],
                    content_brief: String::new(),
                    restaurants: None,
                    sources: None,
                })
                .collect(),
            generated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn history_window_and_headlines() {
        let store = MemoryScanStore::new();
        let now = Utc::now();
        store
            .insert_scan(ScanRecord::new(ScanBundle::default(), Some(analysis(5)), now - Duration::hours(1)))
            .await
            .unwrap();
        store
            .insert_scan(ScanRecord::new(ScanBundle::default(), None, now - Duration::days(8)))
            .await
            .unwrap();

        let view = recent_history(&store, now).await.unwrap();
        assert_eq!(view.total_scans, 1);
        let s = &view.scans[0];
        assert_eq!((s.film_now, s.this_week, s.watch), (1, 0, 4));
        assert_eq!(s.top_trends.len(), 3);
        assert_eq!(s.top_trends[0].trend, "t0");
        assert_eq!(view.total_alerts, 0);
    }

    #[tokio::test]
    async fn latest_scan_ignores_trends_only_records() {
        let store = MemoryScanStore::new();
        assert!(latest_scan(&store).await.unwrap().is_none());
        store
            .insert_scan(ScanRecord::new(ScanBundle::default(), None, Utc::now()))
            .await
            .unwrap();
        assert!(latest_scan(&store).await.unwrap().is_none());
    }
}
