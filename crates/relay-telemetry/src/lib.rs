//! # Relay Telemetry
//!
//! Observability for the cross-chain relay.
//!
//! ## Components
//!
//! - **Logs**: `tracing` subscriber with an env filter, pretty or JSON lines
//! - **Traces**: OpenTelemetry OTLP export, enabled when an endpoint is set
//! - **Metrics**: Prometheus registry served by the gateway at `/metrics`
//!
//! ## Usage
//!
//! ```rust,ignore
//! use relay_telemetry::{init_telemetry, TelemetryConfig};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let _guard = init_telemetry(TelemetryConfig::from_env()).await?;
//!     // Spans, log lines and metrics are now collected
//!     Ok(())
//! }
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `OTEL_EXPORTER_OTLP_ENDPOINT` | unset | OTLP collector, unset disables export |
//! | `OTEL_SERVICE_NAME` | `cross-chain-relay` | Service name in traces |
//! | `RELAY_LOG_LEVEL` | `info` | Log filter, falls back to `RUST_LOG` |
//! | `RELAY_JSON_LOGS` | `false` (`true` in containers) | JSON log lines |
//! | `RELAY_CONSOLE_OUTPUT` | `true` | Write logs to stdout |

#![cfg_attr(test, allow(clippy::unwrap_used))]

mod config;
pub mod metrics;
mod tracing_setup;

pub use config::TelemetryConfig;
pub use metrics::{
    encode_metrics, register_metrics, set_count, HistogramTimer, MetricsHandle,
    HTTP_REQUESTS, HTTP_REQUEST_DURATION, HUB_MESSAGES, HUB_SUBSCRIBERS, INGEST_MESSAGES,
    INGEST_SUBSCRIPTIONS, STORE_CACHED_EVENTS, STORE_INDEXED_ADDRESSES, STORE_OPERATIONS,
};
pub use tracing_setup::TracingGuard;

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Failed to initialize tracing: {0}")]
    TracerInit(String),

    #[error("Failed to initialize Prometheus metrics: {0}")]
    MetricsInit(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Install logging, optional trace export and the metrics registry.
///
/// Returns a guard that must be held for the lifetime of the application.
/// Dropping it flushes pending spans.
pub async fn init_telemetry(config: TelemetryConfig) -> Result<TelemetryGuard, TelemetryError> {
    let metrics_handle = register_metrics()?;
    let tracing_guard = tracing_setup::init_tracing(&config)?;

    Ok(TelemetryGuard {
        tracing: tracing_guard,
        _metrics: metrics_handle,
    })
}

/// Guard that keeps telemetry active. Drop to flush and shut down.
pub struct TelemetryGuard {
    tracing: TracingGuard,
    _metrics: MetricsHandle,
}

impl TelemetryGuard {
    /// Whether spans leave the process.
    pub fn exporting_traces(&self) -> bool {
        self.tracing.exporting()
    }
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        tracing::info!("Shutting down telemetry");
    }
}
