//! # Relay Runtime
//!
//! Consumer side of the cross-chain relay. Wires the event ingestor, the
//! event store, the fan-out hub and the HTTP gateway together and runs them
//! until shutdown.
//!
//! ## Startup Sequence
//!
//! 1. Initialize telemetry (logs, optional OTLP traces, metrics registry)
//! 2. Load [`RelayConfig`] from the environment
//! 3. Open the broker; connect the durable store if `DATABASE_URL` is set
//! 4. Spawn the hub and the ingestor, then serve HTTP
//! 5. On Ctrl+C: stop accepting requests, end live streams, stop ingesting

#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod config;
pub mod runtime;

pub use config::{ConfigError, RelayConfig};
pub use runtime::{RelayRuntime, RunSummary, RuntimeError};
