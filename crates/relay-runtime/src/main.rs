//! `relay-api`: consumer service entry point.

use std::sync::Arc;

use anyhow::{Context, Result};
use relay_runtime::{RelayConfig, RelayRuntime};
use relay_telemetry::{init_telemetry, TelemetryConfig};
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    let _telemetry = init_telemetry(TelemetryConfig::from_env())
        .await
        .context("failed to initialize telemetry")?;

    let config = RelayConfig::from_env().context("invalid relay configuration")?;
    info!(
        channel = %config.channel,
        http = %config.gateway.http_addr(),
        durable = config.database_url.is_some(),
        "Starting cross-chain relay"
    );

    let runtime = Arc::new(
        RelayRuntime::connect(config)
            .await
            .context("failed to connect relay adapters")?,
    );

    let signal = runtime.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Shutdown signal received"),
            Err(e) => error!(error = %e, "Failed to listen for Ctrl+C, shutting down"),
        }
        signal.shutdown();
    });

    let summary = runtime.run(None).await.context("relay stopped with an error")?;
    info!(
        stored = summary.ingest.stored,
        duplicates = summary.ingest.duplicates,
        "Shutdown complete"
    );
    Ok(())
}
