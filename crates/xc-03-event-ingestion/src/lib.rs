//! # Event Ingestion Subsystem (xc-03)
//!
//! The consumer side of the transport. [`EventIngestor::run`] keeps a
//! subscription alive for as long as the service runs; every payload is
//! decoded, canonicalized, stored once and, if new, handed to the fan-out
//! hub as canonical JSON.
//!
//! ## Failure Handling
//!
//! | Failure | Effect |
//! |---------|--------|
//! | Undecodable payload | logged, counted, skipped |
//! | Subscribe error | capped backoff, retried forever |
//! | Stream ends (broker outage) | resubscribe after backoff |
//! | Duplicate delivery | dropped by `event_id` dedup, not re-broadcast |
//!
//! Messages published while no subscription is live are not recovered here;
//! producers retry and the store deduplicates whatever arrives twice.

#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod config;
pub mod ingestor;

pub use config::ReconnectPolicy;
pub use ingestor::{EventIngestor, IngestOutcome, IngestStats};
