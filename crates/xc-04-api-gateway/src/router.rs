use crate::domain::config::GatewayConfig;
use crate::middleware::{create_cors_layer, TimeoutLayer, TracingLayer};
use crate::routes::{metrics, query, stream};
use axum::routing::get;
use axum::Router;
use std::sync::Arc;
use tokio::sync::watch;
use tower::ServiceBuilder;
use tracing::warn;
use xc_01_event_store::EventStoreApi;
use xc_02_fanout_hub::HubHandle;
use xc_03_event_ingestion::EventIngestor;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn EventStoreApi>,
    /// Live stream source. Messages are canonical event JSON.
    pub hub: HubHandle<String>,
    /// Present when this process runs the ingestor; used for metrics only.
    pub ingestor: Option<Arc<EventIngestor>>,
    pub config: Arc<GatewayConfig>,
    /// Flips to `true` on shutdown so open live streams end.
    pub shutdown: Option<watch::Receiver<bool>>,
}

impl AppState {
    pub fn new(store: Arc<dyn EventStoreApi>, hub: HubHandle<String>, config: GatewayConfig) -> Self {
        Self {
            store,
            hub,
            ingestor: None,
            config: Arc::new(config),
            shutdown: None,
        }
    }

    pub fn with_ingestor(mut self, ingestor: Arc<EventIngestor>) -> Self {
        self.ingestor = Some(ingestor);
        self
    }

    pub fn with_shutdown(mut self, shutdown: watch::Receiver<bool>) -> Self {
        self.shutdown = Some(shutdown);
        self
    }
}

/// Build the HTTP router.
///
/// | Route | Handler | Timeout |
/// |-------|---------|---------|
/// | `GET /health` | liveness | no |
/// | `GET /transactions` | recent events | yes |
/// | `GET /wallet/:address/transactions` | events for one address | yes |
/// | `GET /events/subscribe` | SSE live stream | no |
/// | `GET /metrics` | Prometheus exposition | no |
pub fn build_router(state: AppState) -> Router {
    if let Err(e) = relay_telemetry::register_metrics() {
        warn!(error = %e, "Metrics registration failed; /metrics will be incomplete");
    }

    let query_routes: Router<AppState> = Router::new()
        .route("/transactions", get(query::recent_transactions))
        .route("/wallet/:address/transactions", get(query::wallet_transactions))
        .layer(TimeoutLayer::new(state.config.timeouts.request));

    let middleware = ServiceBuilder::new()
        .layer(create_cors_layer(&state.config.cors))
        .layer(TracingLayer::new());

    Router::new()
        .route("/health", get(query::health))
        .route("/events/subscribe", get(stream::subscribe))
        .route("/metrics", get(metrics::export))
        .merge(query_routes)
        .layer(middleware)
        .with_state(state)
}
