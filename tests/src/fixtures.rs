//! Shared fixtures for the integration suite.

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, TimeZone, Utc};
use shared_bus::{
    InMemoryTransport, MessageStream, RetryPolicy, TransportChannel, TransportError,
};
use shared_types::{Chain, NormalizedEvent};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use xc_01_event_store::{EventStore, StoreConfig};
use xc_02_fanout_hub::{Hub, HubConfig, HubHandle};
use xc_03_event_ingestion::{EventIngestor, ReconnectPolicy};

pub const ALICE_ETH: &str = "0xA11CE0000000000000000000000000000000A11C";
pub const BOB_ETH: &str = "0x00000000000000000000000000000000000B0B00";
pub const ALICE_SOL: &str = "Fg6PaFpoGXkYsidMpWTK6W2BeZ7FEfcYkg476zPFsLnS";
pub const BOB_SOL: &str = "9xQeWvG816bUx9EPjHmaT23yvVM2ZWbrrpZb9PusVFin";

/// Transport whose first `failures` publishes fail as if the broker were
/// unreachable. Subscriptions always go to the wrapped transport.
pub struct FlakyTransport {
    inner: Arc<InMemoryTransport>,
    remaining_failures: AtomicU32,
    publish_calls: AtomicU32,
}

impl FlakyTransport {
    pub fn new(inner: Arc<InMemoryTransport>, failures: u32) -> Self {
        Self {
            inner,
            remaining_failures: AtomicU32::new(failures),
            publish_calls: AtomicU32::new(0),
        }
    }

    pub fn publish_calls(&self) -> u32 {
        self.publish_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TransportChannel for FlakyTransport {
    async fn publish(&self, channel: &str, payload: String) -> Result<usize, TransportError> {
        self.publish_calls.fetch_add(1, Ordering::SeqCst);
        let failing = self
            .remaining_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(TransportError::Unreachable("broker restarting".into()));
        }
        self.inner.publish(channel, payload).await
    }

    async fn subscribe(&self, channel: &str) -> Result<MessageStream, TransportError> {
        self.inner.subscribe(channel).await
    }
}

/// Retry policy with millisecond waits.
pub fn fast_retry(max_attempts: u32) -> RetryPolicy {
    RetryPolicy {
        max_attempts,
        initial_backoff: Duration::from_millis(5),
        max_backoff: Duration::from_millis(20),
        multiplier: 2.0,
        jitter_fraction: 0.0,
        max_elapsed: Duration::from_secs(5),
        attempt_timeout: Duration::from_secs(1),
    }
}

/// Reconnect policy with millisecond waits.
pub fn fast_reconnect() -> ReconnectPolicy {
    ReconnectPolicy {
        initial_delay: Duration::from_millis(5),
        max_delay: Duration::from_millis(40),
        multiplier: 2,
    }
}

/// Ethereum transfer `n`, one minute after transfer `n - 1`.
pub fn eth_transfer(n: u32) -> NormalizedEvent {
    let base = Utc.with_ymd_and_hms(2024, 7, 1, 0, 0, 0).single().unwrap_or_default();
    NormalizedEvent::new(
        &Chain::Ethereum,
        "mainnet",
        format!("0x{n:064x}"),
        base + ChronoDuration::minutes(i64::from(n)),
    )
    .with_participants(ALICE_ETH, BOB_ETH)
    .with_value((u64::from(n) * 1_000).to_string())
    .with_block_number(19_000_000 + u64::from(n))
}

/// Solana transfer `n`; addresses are case-sensitive.
pub fn sol_transfer(n: u32) -> NormalizedEvent {
    let base = Utc.with_ymd_and_hms(2024, 7, 1, 0, 0, 0).single().unwrap_or_default();
    NormalizedEvent::new(
        &Chain::Solana,
        "mainnet-beta",
        format!("5sig{n}Xyz"),
        base + ChronoDuration::minutes(i64::from(n)),
    )
    .with_participants(ALICE_SOL, BOB_SOL)
    .with_value("5000")
    .with_slot(250_000_000 + u64::from(n))
}

/// Poll `condition` every 10ms for up to two seconds.
pub async fn eventually<F>(mut condition: F) -> bool
where
    F: FnMut() -> bool,
{
    for _ in 0..200 {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}

/// Consumer side wired the way the service wires it: transport into the
/// ingestor, into the store and the hub.
pub struct Consumer {
    pub store: Arc<EventStore>,
    pub hub: HubHandle<String>,
    pub ingestor: Arc<EventIngestor>,
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl Consumer {
    pub fn start(transport: Arc<dyn TransportChannel>, config: StoreConfig) -> Self {
        let store = Arc::new(EventStore::new(config));
        let (hub, _hub_task) = Hub::spawn(HubConfig::default());
        let ingestor = Arc::new(
            EventIngestor::new(transport, store.clone(), hub.clone())
                .with_reconnect_policy(fast_reconnect()),
        );
        let (shutdown, rx) = watch::channel(false);
        let task = {
            let ingestor = ingestor.clone();
            tokio::spawn(async move { ingestor.run(rx).await })
        };
        Self {
            store,
            hub,
            ingestor,
            shutdown,
            task,
        }
    }

    /// Signal shutdown and wait for the ingestor to return.
    pub async fn stop(self) -> bool {
        let _ = self.shutdown.send(true);
        tokio::time::timeout(Duration::from_secs(2), self.task)
            .await
            .is_ok()
    }
}
