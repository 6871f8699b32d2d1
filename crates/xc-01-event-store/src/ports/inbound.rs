//! # Inbound Ports (Driving Ports)

use crate::domain::{EventFilter, StoreError};
use async_trait::async_trait;
use serde::Serialize;
use shared_types::NormalizedEvent;

/// Result of [`EventStoreApi::add`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    /// First time this `event_id` was seen.
    Inserted,
    /// Already known; nothing changed and nothing should be re-broadcast.
    Duplicate,
}

/// Point-in-time store counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    pub cached_events: usize,
    pub indexed_addresses: usize,
    pub durable_enabled: bool,
    pub inserted: u64,
    pub duplicates: u64,
    pub rejected: u64,
    pub durable_failures: u64,
    pub durable_fallbacks: u64,
}

/// Primary API of the event store.
#[async_trait]
pub trait EventStoreApi: Send + Sync {
    /// Canonicalize, deduplicate and record an event.
    async fn add(&self, event: NormalizedEvent) -> Result<AddOutcome, StoreError>;

    /// Recent events across all addresses.
    async fn get_recent(&self, filter: &EventFilter) -> Vec<NormalizedEvent>;

    /// Recent events where `address` is sender or receiver.
    async fn get_by_address(&self, address: &str, filter: &EventFilter) -> Vec<NormalizedEvent>;

    fn stats(&self) -> StoreStats;
}
