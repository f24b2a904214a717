// src/lib.rs
// Public library surface for the binaries and integration tests.

pub mod analyze;
pub mod api;
pub mod config;
pub mod engine;
pub mod error;
pub mod history;
pub mod ingest;
pub mod metrics;
pub mod notify;
pub mod scan;
pub mod store;

pub use crate::api::{router, AppState};
pub use crate::config::RadarConfig;
pub use crate::scan::{ScanOutcome, ScanPipeline, ScanReport};

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Install the global tracing subscriber: `RUST_LOG` or
/// `previral_radar=info,warn`, JSON lines when `RADAR_LOG_JSON=1`.
/// A no-op if the host runtime already installed one.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("previral_radar=info,warn"));
    let json = std::env::var("RADAR_LOG_JSON").is_ok_and(|v| v == "1");

    let registry = tracing_subscriber::registry().with(filter);
    let res = if json {
        registry.with(fmt::layer().json()).try_init()
    } else {
        registry.with(fmt::layer().compact()).try_init()
    };
    if res.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}
