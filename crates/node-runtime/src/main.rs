//! # Mantra Node
//!
//! Runs the master coordinator and the configured asset workers in one
//! process until Ctrl+C.

use anyhow::{Context, Result};
use mantra_telemetry::{init_logging, TelemetryConfig};
use node_runtime::{NodeConfig, NodeRuntime};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let telemetry = TelemetryConfig::from_env();
    let _logging = init_logging(&telemetry).context("Failed to initialise logging")?;

    let config = NodeConfig::from_env().context("Failed to load configuration")?;
    info!(workers = ?config.chains(), "Configuration loaded");

    let mut runtime = NodeRuntime::new(config);
    runtime.start().await?;

    info!("Node is running. Press Ctrl+C to stop.");
    tokio::signal::ctrl_c().await.context("Failed to listen for Ctrl+C")?;

    runtime.shutdown().await;
    Ok(())
}
