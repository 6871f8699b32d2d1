//! Telemetry configuration from environment variables.

use std::env;

const DEFAULT_SERVICE_NAME: &str = "cross-chain-relay";

/// Configuration for logging and tracing export.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Service name for traces and logs
    pub service_name: String,

    /// OTLP collector endpoint. `None` disables trace export.
    pub otlp_endpoint: Option<String>,

    /// Log level filter directive (e.g. `info`, `xc_01_event_store=debug,info`)
    pub log_level: String,

    /// Whether to write log lines to stdout
    pub console_output: bool,

    /// Whether log lines are JSON instead of human-readable
    pub json_logs: bool,

    /// Deployment environment tag attached to traces
    pub environment: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: DEFAULT_SERVICE_NAME.to_string(),
            otlp_endpoint: None,
            log_level: "info".to_string(),
            console_output: true,
            json_logs: false,
            environment: "development".to_string(),
        }
    }
}

impl TelemetryConfig {
    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `OTEL_SERVICE_NAME`: Service name (default: cross-chain-relay)
    /// - `OTEL_EXPORTER_OTLP_ENDPOINT`: Collector endpoint (default: unset, no export)
    /// - `RELAY_LOG_LEVEL` or `RUST_LOG`: Log filter (default: info)
    /// - `RELAY_CONSOLE_OUTPUT`: Enable console output (default: true)
    /// - `RELAY_JSON_LOGS`: JSON log lines (default: true inside containers)
    /// - `RELAY_ENVIRONMENT`: Deployment environment (default: development)
    pub fn from_env() -> Self {
        let is_container =
            env::var("KUBERNETES_SERVICE_HOST").is_ok() || env::var("DOCKER_CONTAINER").is_ok();

        Self {
            service_name: env::var("OTEL_SERVICE_NAME")
                .unwrap_or_else(|_| DEFAULT_SERVICE_NAME.to_string()),

            otlp_endpoint: env::var("OTEL_EXPORTER_OTLP_ENDPOINT")
                .ok()
                .filter(|v| !v.trim().is_empty()),

            log_level: env::var("RELAY_LOG_LEVEL")
                .or_else(|_| env::var("RUST_LOG"))
                .unwrap_or_else(|_| "info".to_string()),

            console_output: flag(env::var("RELAY_CONSOLE_OUTPUT").ok().as_deref(), true),

            json_logs: flag(env::var("RELAY_JSON_LOGS").ok().as_deref(), is_container),

            environment: env::var("RELAY_ENVIRONMENT")
                .unwrap_or_else(|_| "development".to_string()),
        }
    }

    /// Whether spans are exported to an OTLP collector.
    pub fn exports_traces(&self) -> bool {
        self.otlp_endpoint.is_some()
    }
}

/// `true`/`1`/`yes` and `false`/`0`/`no`, anything else falls back to `default`.
fn flag(value: Option<&str>, default: bool) -> bool {
    match value.map(|v| v.trim().to_ascii_lowercase()) {
        Some(v) if matches!(v.as_str(), "true" | "1" | "yes") => true,
        Some(v) if matches!(v.as_str(), "false" | "0" | "no") => false,
        _ => default,
    }
}
