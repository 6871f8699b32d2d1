//! # Shared Bus - Event Transport for the Relay
//!
//! Moves normalized events from chain producers to the consumer service.
//!
//! ## Delivery Model
//!
//! The broker is ephemeral pub/sub: subscribers only see what is published
//! while they are connected. Delivery is at-least-once on the producer side
//! (bounded retry) and idempotent on the consumer side (`event_id` dedup).
//!
//! ```text
//! ┌──────────────┐  publish()   ┌──────────────────┐  subscribe()  ┌──────────────┐
//! │  Producer    │ ───────────→ │ TransportChannel │ ────────────→ │  Ingestor    │
//! │  Pipeline    │  retry with  │ (Redis / memory) │  stream ends  │  (consumer)  │
//! │              │  backoff     │                  │  on outage    │              │
//! └──────────────┘              └──────────────────┘               └──────────────┘
//! ```
//!
//! ## Components
//!
//! - [`TransportChannel`] with [`InMemoryTransport`] and [`RedisTransport`]
//! - [`EventPublisher`] - bounded exponential backoff, tagged result
//! - [`ProducerPipeline`] - drains a normalizer stream with recent-id dedup

// Nursery lints that are too strict
#![allow(clippy::missing_const_for_fn)]
// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod producer;
pub mod publisher;
pub mod recent_events;
pub mod redis_transport;
pub mod retry;
pub mod transport;

// Re-export main types
pub use producer::{ProducerPipeline, ProducerStats, SubmitOutcome};
pub use publisher::{EventPublisher, PublishError, PublishFailure, PublishReceipt, PublisherStats};
pub use recent_events::RecentEventCache;
pub use redis_transport::RedisTransport;
pub use retry::RetryPolicy;
pub use transport::{InMemoryTransport, MessageStream, TransportChannel, TransportError};

/// Well-known channel carrying normalized events.
pub const EVENTS_CHANNEL: &str = "cross_chain_events";

/// Messages buffered per in-memory channel before slow subscribers lag.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1000;
