//! # Event Ingestor
//!
//! ```text
//! subscribe ──ok──→ for each message:
//!    ↑                 decode ──bad──→ log, skip
//!    │                 canonicalize + store.add
//!    │                    Inserted  → hub.broadcast(canonical JSON)
//!    │                    Duplicate → nothing
//!    └── backoff ←── stream ended / subscribe failed
//! ```
//!
//! Messages from one subscription are processed strictly in arrival order.

use crate::config::ReconnectPolicy;
use futures::StreamExt;
use serde::Serialize;
use shared_bus::{TransportChannel, EVENTS_CHANNEL};
use shared_types::NormalizedEvent;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};
use xc_01_event_store::{AddOutcome, EventStoreApi};
use xc_02_fanout_hub::HubHandle;

/// What happened to one transport message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestOutcome {
    /// Newly stored and handed to the hub.
    Stored,
    /// Already known; dropped.
    Duplicate,
    /// Could not be decoded or violated the contract.
    Rejected,
}

#[derive(Debug, Default)]
struct Counters {
    received: AtomicU64,
    stored: AtomicU64,
    duplicates: AtomicU64,
    rejected: AtomicU64,
    subscriptions: AtomicU64,
    subscribe_failures: AtomicU64,
    broadcast_failures: AtomicU64,
}

/// Snapshot of ingestion counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IngestStats {
    pub received: u64,
    pub stored: u64,
    pub duplicates: u64,
    pub rejected: u64,
    /// Successful subscribes, including the first one.
    pub subscriptions: u64,
    pub subscribe_failures: u64,
    pub broadcast_failures: u64,
}

/// Consumer loop from the transport into the store and hub.
pub struct EventIngestor {
    transport: Arc<dyn TransportChannel>,
    channel: String,
    store: Arc<dyn EventStoreApi>,
    hub: HubHandle<String>,
    reconnect: ReconnectPolicy,
    counters: Counters,
}

impl EventIngestor {
    pub fn new(
        transport: Arc<dyn TransportChannel>,
        store: Arc<dyn EventStoreApi>,
        hub: HubHandle<String>,
    ) -> Self {
        Self {
            transport,
            channel: EVENTS_CHANNEL.to_string(),
            store,
            hub,
            reconnect: ReconnectPolicy::default(),
            counters: Counters::default(),
        }
    }

    pub fn with_channel(mut self, channel: impl Into<String>) -> Self {
        self.channel = channel.into();
        self
    }

    pub fn with_reconnect_policy(mut self, policy: ReconnectPolicy) -> Self {
        self.reconnect = policy;
        self
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }

    pub fn stats(&self) -> IngestStats {
        let c = &self.counters;
        IngestStats {
            received: c.received.load(Ordering::Relaxed),
            stored: c.stored.load(Ordering::Relaxed),
            duplicates: c.duplicates.load(Ordering::Relaxed),
            rejected: c.rejected.load(Ordering::Relaxed),
            subscriptions: c.subscriptions.load(Ordering::Relaxed),
            subscribe_failures: c.subscribe_failures.load(Ordering::Relaxed),
            broadcast_failures: c.broadcast_failures.load(Ordering::Relaxed),
        }
    }

    /// Consume until `shutdown` flips to `true` or its sender is dropped.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!(channel = %self.channel, "Event ingestor starting");
        let mut failures: u32 = 0;

        loop {
            if *shutdown.borrow() {
                break;
            }

            let subscribed = tokio::select! {
                result = self.transport.subscribe(&self.channel) => result,
                _ = shutdown.changed() => break,
            };

            match subscribed {
                Ok(mut stream) => {
                    failures = 0;
                    self.counters.subscriptions.fetch_add(1, Ordering::Relaxed);
                    info!(channel = %self.channel, "Subscribed to transport");

                    loop {
                        tokio::select! {
                            biased;
                            _ = shutdown.changed() => {
                                info!("Event ingestor stopping");
                                return;
                            }
                            message = stream.next() => match message {
                                Some(payload) => {
                                    self.handle_message(&payload).await;
                                }
                                None => {
                                    warn!(channel = %self.channel, "Transport stream ended, resubscribing");
                                    break;
                                }
                            },
                        }
                    }
                }
                Err(e) => {
                    self.counters.subscribe_failures.fetch_add(1, Ordering::Relaxed);
                    warn!(
                        channel = %self.channel,
                        error = %e,
                        failures = failures + 1,
                        "Subscribe failed"
                    );
                    failures = failures.saturating_add(1);
                }
            }

            let delay = self.reconnect.delay(failures.saturating_sub(1));
            debug!(delay_ms = delay.as_millis() as u64, "Waiting before resubscribe");
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = shutdown.changed() => break,
            }
        }

        info!("Event ingestor stopping");
    }

    /// Decode, store and fan out one transport payload.
    pub async fn handle_message(&self, payload: &str) -> IngestOutcome {
        self.counters.received.fetch_add(1, Ordering::Relaxed);

        let event = match NormalizedEvent::from_json(payload).and_then(NormalizedEvent::canonicalize)
        {
            Ok(event) => event,
            Err(e) => {
                self.counters.rejected.fetch_add(1, Ordering::Relaxed);
                warn!(error = %e, bytes = payload.len(), "Skipping undecodable event");
                return IngestOutcome::Rejected;
            }
        };

        let event_id = event.event_id.clone();
        let message = match serde_json::to_string(&event) {
            Ok(message) => message,
            Err(e) => {
                self.counters.rejected.fetch_add(1, Ordering::Relaxed);
                warn!(event_id = %event_id, error = %e, "Skipping unserializable event");
                return IngestOutcome::Rejected;
            }
        };

        match self.store.add(event).await {
            Ok(AddOutcome::Inserted) => {
                self.counters.stored.fetch_add(1, Ordering::Relaxed);
                if let Err(e) = self.hub.broadcast(message).await {
                    self.counters.broadcast_failures.fetch_add(1, Ordering::Relaxed);
                    warn!(event_id = %event_id, error = %e, "Fan-out unavailable");
                }
                debug!(event_id = %event_id, "Event ingested");
                IngestOutcome::Stored
            }
            Ok(AddOutcome::Duplicate) => {
                self.counters.duplicates.fetch_add(1, Ordering::Relaxed);
                debug!(event_id = %event_id, "Duplicate delivery dropped");
                IngestOutcome::Duplicate
            }
            Err(e) => {
                self.counters.rejected.fetch_add(1, Ordering::Relaxed);
                warn!(event_id = %event_id, error = %e, "Store rejected event");
                IngestOutcome::Rejected
            }
        }
    }
}
