//! Service lifecycle.
//!
//! ```text
//!   connect ──→ RedisTransport + (PostgresEventStore | memory only)
//!      │
//!      ↓
//!   run ──→ Hub::spawn
//!      ├──→ EventIngestor::run   (transport → store → hub)
//!      └──→ ApiGatewayService    (store, hub → HTTP)
//!      │
//!   shutdown ──→ gateway drains ──→ ingestor stops ──→ hub drains
//! ```

use crate::config::RelayConfig;
use shared_bus::{RedisTransport, TransportChannel, TransportError};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{error, info, warn};
use xc_01_event_store::{DurableEventStore, EventStore, EventStoreApi, PostgresEventStore};
use xc_02_fanout_hub::{Hub, HubStats};
use xc_03_event_ingestion::{EventIngestor, IngestStats};
use xc_04_api_gateway::{ApiGatewayService, GatewayError};

/// Bound on connecting the durable store at startup.
const DURABLE_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Bound on waiting for background tasks after the gateway stops.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("transport: {0}")]
    Transport(#[from] TransportError),

    #[error("gateway: {0}")]
    Gateway(#[from] GatewayError),
}

/// Counters collected once everything has stopped.
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub ingest: IngestStats,
    pub hub: Option<HubStats>,
}

/// The consumer service: ingestion, storage, live fan-out and HTTP.
pub struct RelayRuntime {
    config: RelayConfig,
    transport: Arc<dyn TransportChannel>,
    store: Arc<EventStore>,
    shutdown_tx: watch::Sender<bool>,
}

impl RelayRuntime {
    /// Wire components from already constructed adapters.
    pub fn new(
        config: RelayConfig,
        transport: Arc<dyn TransportChannel>,
        durable: Option<Arc<dyn DurableEventStore>>,
    ) -> Self {
        let store = match durable {
            Some(durable) => EventStore::with_durable(config.store.clone(), durable),
            None => EventStore::new(config.store.clone()),
        };
        let (shutdown_tx, _) = watch::channel(false);

        Self {
            config,
            transport,
            store: Arc::new(store),
            shutdown_tx,
        }
    }

    /// Open the broker and, when configured, the durable store.
    ///
    /// An unreachable database is not fatal: the service runs on the
    /// in-memory cache alone.
    pub async fn connect(config: RelayConfig) -> Result<Self, RuntimeError> {
        let transport = Arc::new(RedisTransport::open(&config.redis_url)?);
        let durable = match &config.database_url {
            Some(url) => connect_durable(url, config.redacted_database_url()).await,
            None => {
                info!("DATABASE_URL not set, running memory only");
                None
            }
        };
        Ok(Self::new(config, transport, durable))
    }

    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    pub fn store(&self) -> Arc<EventStore> {
        self.store.clone()
    }

    /// Ask every component to stop. Idempotent.
    pub fn shutdown(&self) {
        self.shutdown_tx.send_replace(true);
    }

    /// Receiver that observes [`RelayRuntime::shutdown`].
    pub fn shutdown_signal(&self) -> watch::Receiver<bool> {
        self.shutdown_tx.subscribe()
    }

    /// Run until shutdown. Binds the configured address unless a listener
    /// is supplied.
    pub async fn run(&self, listener: Option<TcpListener>) -> Result<RunSummary, RuntimeError> {
        let (hub, hub_task) = Hub::<String>::spawn(self.config.hub);
        let store: Arc<dyn EventStoreApi> = self.store.clone();

        let ingestor = Arc::new(
            EventIngestor::new(self.transport.clone(), store.clone(), hub.clone())
                .with_channel(self.config.channel.clone())
                .with_reconnect_policy(self.config.reconnect),
        );
        let ingest_task = {
            let ingestor = ingestor.clone();
            let shutdown = self.shutdown_signal();
            tokio::spawn(async move { ingestor.run(shutdown).await })
        };

        let served = match ApiGatewayService::new(self.config.gateway.clone(), store, hub) {
            Ok(gateway) => {
                let gateway = gateway.with_ingestor(ingestor.clone());
                match listener {
                    Some(listener) => {
                        gateway
                            .serve_with_listener(listener, self.shutdown_signal())
                            .await
                    }
                    None => gateway.serve(self.shutdown_signal()).await,
                }
            }
            Err(e) => Err(e),
        };
        if let Err(e) = &served {
            error!(error = %e, "HTTP gateway failed");
        }

        self.shutdown();
        if tokio::time::timeout(DRAIN_TIMEOUT, ingest_task).await.is_err() {
            warn!("Event ingestor did not stop in time");
        }
        let ingest = ingestor.stats();
        drop(ingestor);

        // The hub stops once the last handle (held by the gateway and the
        // ingestor) is gone.
        let hub = match tokio::time::timeout(DRAIN_TIMEOUT, hub_task).await {
            Ok(Ok(stats)) => Some(stats),
            Ok(Err(e)) => {
                warn!(error = %e, "Fan-out hub task failed");
                None
            }
            Err(_) => {
                warn!("Fan-out hub did not stop in time");
                None
            }
        };

        let store = self.store.stats();
        info!(
            received = ingest.received,
            stored = ingest.stored,
            duplicates = ingest.duplicates,
            rejected = ingest.rejected,
            cached = store.cached_events,
            live_drops = hub.map(|h| h.dropped_slow).unwrap_or_default(),
            "Relay stopped"
        );

        served?;
        Ok(RunSummary { ingest, hub })
    }
}

async fn connect_durable(
    url: &str,
    display_url: Option<String>,
) -> Option<Arc<dyn DurableEventStore>> {
    let target = display_url.unwrap_or_default();
    match tokio::time::timeout(DURABLE_CONNECT_TIMEOUT, PostgresEventStore::connect(url)).await {
        Ok(Ok(store)) => {
            info!(database = %target, "Durable event store enabled");
            Some(Arc::new(store))
        }
        Ok(Err(e)) => {
            warn!(database = %target, error = %e, "Durable store unavailable, running memory only");
            None
        }
        Err(_) => {
            warn!(database = %target, "Durable store connect timed out, running memory only");
            None
        }
    }
}
