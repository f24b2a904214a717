// src/ingest/scheduler.rs
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::scan::ScanPipeline;

/// Spawn a background task running one scan every `interval`.
/// The first scan starts after one full interval, not at boot.
pub fn spawn_scan_scheduler(pipeline: Arc<ScanPipeline>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let start = tokio::time::Instant::now() + interval;
        let mut ticker = tokio::time::interval_at(start, interval);
        // A scan that overruns its slot must not trigger a burst of catch-up scans.
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tracing::info!(target: "scan", every_secs = interval.as_secs(), "scan scheduler started");
        loop {
            ticker.tick().await;
            match pipeline.run().await {
                Ok(out) => tracing::debug!(
                    target: "scan",
                    scan_id = ?out.report.scan_id,
                    "scheduled scan done"
                ),
                Err(e) => tracing::error!(target: "scan", error = %e, "scheduled scan failed"),
            }
        }
    })
}
