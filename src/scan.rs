//! One scan pass: fan out to every source, merge, summarize, persist, alert.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use futures::future::join_all;
use metrics::{counter, gauge, histogram};
use serde::Serialize;

use crate::analyze::{DynSummarizer, TrendAnalysis, UrgencyCounts};
use crate::engine::{alert_decision, should_persist, should_summarize, AlertDecision};
use crate::error::{ScanError, SourceError};
use crate::ingest::types::{ScanBundle, SourcePayload, SourceProvider};
use crate::notify::DynAlertSink;
use crate::store::{DynScanStore, ScanRecord};

pub type DynSource = Arc<dyn SourceProvider>;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceOutcome {
    pub source: String,
    pub items: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanReport {
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
    /// Per source, in declared order.
    pub sources: Vec<SourceOutcome>,
    pub videos: usize,
    pub posts: usize,
    pub daily_trends: usize,
    pub food_trends: usize,
    pub urgency: UrgencyCounts,
    pub analyzed: bool,
    pub scan_id: Option<String>,
    pub persisted: bool,
    /// Whether a content alert went out; `None` when none was due.
    pub content_alert_sent: Option<bool>,
    pub error_alert_sent: Option<bool>,
    pub errors: Vec<String>,
}

/// Result of a successful pass: the report plus what was collected.
#[derive(Debug, Clone)]
pub struct ScanOutcome {
    pub report: ScanReport,
    pub bundle: ScanBundle,
    pub analysis: Option<TrendAnalysis>,
}

pub struct ScanPipeline {
    sources: Vec<DynSource>,
    summarizer: DynSummarizer,
    store: DynScanStore,
    alerts: DynAlertSink,
    connector_timeout: Duration,
}

impl ScanPipeline {
    pub fn new(
        sources: Vec<DynSource>,
        summarizer: DynSummarizer,
        store: DynScanStore,
        alerts: DynAlertSink,
    ) -> Self {
        Self {
            sources,
            summarizer,
            store,
            alerts,
            connector_timeout: Duration::from_secs(90),
        }
    }

    pub fn with_connector_timeout(mut self, timeout: Duration) -> Self {
        self.connector_timeout = timeout;
        self
    }

    /// Run every source concurrently; results come back in declared order.
    pub async fn collect(&self) -> Vec<(&'static str, Result<SourcePayload, SourceError>)> {
        let limit = self.connector_timeout;
        join_all(self.sources.iter().map(|src| async move {
            let res = match tokio::time::timeout(limit, src.fetch_latest()).await {
                Ok(r) => r,
                Err(_) => Err(SourceError::Timeout(limit.as_secs())),
            };
            (src.name(), res)
        }))
        .await
    }

    pub async fn run(&self) -> Result<ScanOutcome, ScanError> {
        let started_at = Utc::now();
        let t0 = Instant::now();

        let mut bundle = ScanBundle::default();
        let mut sources = Vec::with_capacity(self.sources.len());
        let mut errors = Vec::new();
        for (name, res) in self.collect().await {
            match res {
                Ok(payload) => {
                    sources.push(SourceOutcome {
                        source: name.to_string(),
                        items: payload.len(),
                        error: None,
                    });
                    bundle.absorb(payload);
                }
                Err(e) => {
                    tracing::warn!(target: "scan", source = name, error = %e, "source failed");
                    counter!("radar_source_errors_total", "source" => name).increment(1);
                    errors.push(format!("{name}: {e}"));
                    sources.push(SourceOutcome {
                        source: name.to_string(),
                        items: 0,
                        error: Some(e.to_string()),
                    });
                }
            }
        }

        let analysis = if should_summarize(&bundle) {
            self.summarizer.summarize(&bundle).await
        } else {
            None
        };
        let urgency = analysis
            .as_ref()
            .map(TrendAnalysis::urgency_counts)
            .unwrap_or_default();

        let mut scan_id = None;
        let mut persist_err = None;
        if should_persist(&bundle) {
            let record = ScanRecord::new(bundle.clone(), analysis.clone(), started_at);
            match self.store.insert_scan(record).await {
                Ok(id) => scan_id = Some(id),
                Err(e) => {
                    tracing::error!(target: "scan", error = %e, "persisting scan failed");
                    persist_err = Some(e);
                }
            }
        }

        let (mut content_alert_sent, mut error_alert_sent) = (None, None);
        match alert_decision(&bundle, &urgency, errors.len()) {
            AlertDecision::Content => {
                if let Some(a) = &analysis {
                    content_alert_sent = Some(self.alerts.send(a, scan_id.as_deref()).await);
                }
            }
            AlertDecision::Error => {
                error_alert_sent = Some(self.alerts.send_error(&errors).await);
            }
            AlertDecision::None => {}
        }

        let duration_ms = t0.elapsed().as_millis() as u64;
        counter!("radar_scans_total").increment(1);
        histogram!("radar_scan_duration_ms").record(duration_ms as f64);
        gauge!("radar_last_scan_ts").set(Utc::now().timestamp() as f64);

        let report = ScanReport {
            started_at,
            duration_ms,
            sources,
            videos: bundle.videos.len(),
            posts: bundle.posts.len(),
            daily_trends: bundle.trends.daily_trends.len(),
            food_trends: bundle.trends.food_trends.len(),
            urgency,
            analyzed: analysis.is_some(),
            persisted: scan_id.is_some(),
            scan_id,
            content_alert_sent,
            error_alert_sent,
            errors,
        };
        tracing::info!(
            target: "scan",
            videos = report.videos,
            posts = report.posts,
            trends = report.daily_trends,
            film_now = report.urgency.film_now,
            errors = report.errors.len(),
            ms = duration_ms,
            "scan finished"
        );

        if let Some(e) = persist_err {
            return Err(ScanError::Persistence(e));
        }
        Ok(ScanOutcome {
            report,
            bundle,
            analysis,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyze::ai_adapter::DisabledSummarizer;
    use crate::notify::NotifierMux;
    use crate::store::MemoryScanStore;
    use async_trait::async_trait;

    struct Slow;

    #[async_trait]
    impl SourceProvider for Slow {
        async fn fetch_latest(&self) -> Result<SourcePayload, SourceError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(SourcePayload::Posts(vec![]))
        }
        fn name(&self) -> &'static str {
            "slow"
        }
    }

    struct Empty(&'static str);

    #[async_trait]
    impl SourceProvider for Empty {
        async fn fetch_latest(&self) -> Result<SourcePayload, SourceError> {
            Ok(SourcePayload::Videos(vec![]))
        }
        fn name(&self) -> &'static str {
            self.0
        }
    }

    #[tokio::test(start_paused = true)]
    async fn slow_source_times_out_without_blocking_others() {
        let p = ScanPipeline::new(
            vec![Arc::new(Slow), Arc::new(Empty("fast"))],
            Arc::new(DisabledSummarizer),
            Arc::new(MemoryScanStore::new()),
            Arc::new(NotifierMux::new(Vec::new())),
        )
        .with_connector_timeout(Duration::from_secs(5));

        let got = p.collect().await;
        assert_eq!(got[0].0, "slow");
        assert!(matches!(got[0].1, Err(SourceError::Timeout(5))));
        assert_eq!(got[1].0, "fast");
        assert!(got[1].1.is_ok());
    }
}
