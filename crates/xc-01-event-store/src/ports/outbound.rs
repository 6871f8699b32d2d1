//! # Outbound Ports (Driven Ports)
//!
//! Durable persistence is an optional capability injected at construction.
//! When it is absent, or when a call fails or times out, the store answers
//! from memory.

use crate::domain::{EventFilter, StoreError};
use async_trait::async_trait;
use shared_types::NormalizedEvent;

/// Result of a durable insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DurableInsert {
    Inserted,
    /// A row with the same `event_id` already exists; nothing was written.
    AlreadyPresent,
}

/// Durable table of canonical events, keyed by `event_id`.
#[async_trait]
pub trait DurableEventStore: Send + Sync {
    /// Insert if absent. Must be idempotent on `event_id`.
    async fn insert(&self, event: &NormalizedEvent) -> Result<DurableInsert, StoreError>;

    /// Most-recent-first page matching `filter`, optionally restricted to
    /// events where `address` (canonical) is sender or receiver.
    async fn query(
        &self,
        address: Option<&str>,
        filter: &EventFilter,
    ) -> Result<Vec<NormalizedEvent>, StoreError>;

    /// Backend label for logs.
    fn name(&self) -> &'static str;
}
