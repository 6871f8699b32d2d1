//! # Event Store Service
//!
//! Implements [`EventStoreApi`] over the in-memory [`EventIndex`] and an
//! optional [`DurableEventStore`].
//!
//! ## Write path
//!
//! 1. Canonicalize (reject on contract violation)
//! 2. Short-circuit if the id is already cached
//! 3. Durable insert, bounded by `durable_timeout`; failures are logged and
//!    the event is still cached
//! 4. Cache insert
//!
//! The durable verdict decides the outcome when there is one, so of several
//! concurrent adds for one new id exactly one reports `Inserted`. Without a
//! verdict the cache insert decides under the write lock.
//!
//! A durable conflict still caches the event at the head of the sequence.
//! After a restart, replayed old events therefore look recent on the cache
//! path; durable reads order by the table's own sequence and are unaffected.
//!
//! ## Read path
//!
//! Durable first when configured, bounded by `durable_timeout`; any failure
//! falls back to the cache.

use crate::domain::{EventFilter, EventIndex, StoreConfig, StoreError};
use crate::ports::{AddOutcome, DurableEventStore, DurableInsert, EventStoreApi, StoreStats};
use async_trait::async_trait;
use parking_lot::RwLock;
use shared_types::{normalize_lookup_address, NormalizedEvent};
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

#[derive(Debug, Default)]
struct StoreCounters {
    inserted: AtomicU64,
    duplicates: AtomicU64,
    rejected: AtomicU64,
    durable_failures: AtomicU64,
    durable_fallbacks: AtomicU64,
}

/// Bounded, deduplicated event store.
pub struct EventStore {
    config: StoreConfig,
    index: RwLock<EventIndex>,
    durable: Option<Arc<dyn DurableEventStore>>,
    counters: StoreCounters,
}

impl EventStore {
    /// Memory-only store.
    pub fn new(config: StoreConfig) -> Self {
        Self {
            index: RwLock::new(EventIndex::new(&config)),
            config,
            durable: None,
            counters: StoreCounters::default(),
        }
    }

    /// Store backed by a durable table.
    pub fn with_durable(config: StoreConfig, durable: Arc<dyn DurableEventStore>) -> Self {
        Self {
            durable: Some(durable),
            ..Self::new(config)
        }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn has_durable(&self) -> bool {
        self.durable.is_some()
    }

    async fn bounded<T, F>(&self, call: F) -> Result<T, StoreError>
    where
        F: Future<Output = Result<T, StoreError>>,
    {
        let limit = self.config.durable_timeout;
        match tokio::time::timeout(limit, call).await {
            Ok(result) => result,
            Err(_) => Err(StoreError::Timeout(limit)),
        }
    }

    async fn query_durable(
        &self,
        address: Option<&str>,
        filter: &EventFilter,
    ) -> Option<Vec<NormalizedEvent>> {
        let durable = self.durable.as_ref()?;
        match self.bounded(durable.query(address, filter)).await {
            Ok(events) => Some(events),
            Err(e) => {
                self.counters.durable_fallbacks.fetch_add(1, Ordering::Relaxed);
                warn!(
                    backend = durable.name(),
                    address = address.unwrap_or(""),
                    error = %e,
                    "Durable query failed, serving from cache"
                );
                None
            }
        }
    }
}

#[async_trait]
impl EventStoreApi for EventStore {
    async fn add(&self, event: NormalizedEvent) -> Result<AddOutcome, StoreError> {
        let event = match event.canonicalize() {
            Ok(event) => event,
            Err(e) => {
                self.counters.rejected.fetch_add(1, Ordering::Relaxed);
                return Err(e.into());
            }
        };

        if self.index.read().contains(&event.event_id) {
            self.counters.duplicates.fetch_add(1, Ordering::Relaxed);
            debug!(event_id = %event.event_id, "Duplicate event ignored");
            return Ok(AddOutcome::Duplicate);
        }

        // Some(true): durable row created; Some(false): row already there.
        let mut durable_verdict = None;
        if let Some(durable) = &self.durable {
            match self.bounded(durable.insert(&event)).await {
                Ok(DurableInsert::Inserted) => durable_verdict = Some(true),
                Ok(DurableInsert::AlreadyPresent) => durable_verdict = Some(false),
                Err(e) => {
                    self.counters.durable_failures.fetch_add(1, Ordering::Relaxed);
                    warn!(
                        backend = durable.name(),
                        event_id = %event.event_id,
                        error = %e,
                        "Durable insert failed, keeping event in cache only"
                    );
                }
            }
        }

        let event_id = event.event_id.clone();
        let newly_cached = self.index.write().insert(event);

        if durable_verdict.unwrap_or(newly_cached) {
            self.counters.inserted.fetch_add(1, Ordering::Relaxed);
            debug!(event_id = %event_id, "Event stored");
            Ok(AddOutcome::Inserted)
        } else {
            self.counters.duplicates.fetch_add(1, Ordering::Relaxed);
            debug!(event_id = %event_id, "Duplicate event ignored");
            Ok(AddOutcome::Duplicate)
        }
    }

    async fn get_recent(&self, filter: &EventFilter) -> Vec<NormalizedEvent> {
        if let Some(events) = self.query_durable(None, filter).await {
            return events;
        }
        let index = self.index.read();
        filter.apply(index.recent())
    }

    async fn get_by_address(&self, address: &str, filter: &EventFilter) -> Vec<NormalizedEvent> {
        let canonical = normalize_lookup_address(filter.chain.as_ref(), address);
        if canonical.is_empty() {
            return Vec::new();
        }
        if let Some(events) = self.query_durable(Some(&canonical), filter).await {
            return events;
        }
        let index = self.index.read();
        filter.apply(index.for_address(&canonical))
    }

    fn stats(&self) -> StoreStats {
        let index = self.index.read();
        StoreStats {
            cached_events: index.len(),
            indexed_addresses: index.address_count(),
            durable_enabled: self.durable.is_some(),
            inserted: self.counters.inserted.load(Ordering::Relaxed),
            duplicates: self.counters.duplicates.load(Ordering::Relaxed),
            rejected: self.counters.rejected.load(Ordering::Relaxed),
            durable_failures: self.counters.durable_failures.load(Ordering::Relaxed),
            durable_fallbacks: self.counters.durable_fallbacks.load(Ordering::Relaxed),
        }
    }
}
