//! Run a single scan with the production wiring and print the report as JSON.
//! Exit code 1 when the scan could not be persisted.

use anyhow::Context;
use previral_radar::{init_tracing, AppState, RadarConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    init_tracing();

    let cfg = RadarConfig::load_default().context("loading radar config")?;
    let state = AppState::from_config(&cfg)?;
    let out = state.pipeline.run().await.context("scan failed")?;

    println!("{}", serde_json::to_string_pretty(&out.report)?);
    Ok(())
}
