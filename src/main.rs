//! Pre-viral radar service: HTTP surface, `/metrics`, optional scan scheduler.

use std::time::Duration;

use previral_radar::ingest::scheduler::spawn_scan_scheduler;
use previral_radar::metrics::Metrics;
use previral_radar::{init_tracing, router, AppState, RadarConfig};
use shuttle_axum::ShuttleAxum;

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cfg = RadarConfig::load_default()?;
    let state = AppState::from_config(&cfg)?;

    if let Some(secs) = cfg.scan.interval_secs {
        spawn_scan_scheduler(state.pipeline.clone(), Duration::from_secs(secs));
    }

    let mut app = router(state);
    match Metrics::init() {
        Ok(m) => app = app.merge(m.router()),
        Err(e) => tracing::warn!(error = ?e, "metrics disabled"),
    }

    Ok(app.into())
}
