use crate::domain::config::GatewayConfig;
use crate::domain::error::GatewayError;
use crate::router::{build_router, AppState};
use axum::Router;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::info;
use xc_01_event_store::EventStoreApi;
use xc_02_fanout_hub::HubHandle;
use xc_03_event_ingestion::EventIngestor;

/// HTTP front of the relay.
pub struct ApiGatewayService {
    config: GatewayConfig,
    state: AppState,
}

impl ApiGatewayService {
    /// Create the service. Fails on invalid configuration.
    pub fn new(
        config: GatewayConfig,
        store: Arc<dyn EventStoreApi>,
        hub: HubHandle<String>,
    ) -> Result<Self, GatewayError> {
        config
            .validate()
            .map_err(|e| GatewayError::Config(e.to_string()))?;

        let state = AppState::new(store, hub, config.clone());
        Ok(Self { config, state })
    }

    /// Report ingestion counters on `/metrics`.
    pub fn with_ingestor(mut self, ingestor: Arc<EventIngestor>) -> Self {
        self.state = self.state.with_ingestor(ingestor);
        self
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Router without a shutdown signal; live streams run until the client leaves.
    pub fn router(&self) -> Router {
        build_router(self.state.clone())
    }

    /// Bind the configured address and serve until `shutdown` flips to `true`.
    pub async fn serve(self, shutdown: watch::Receiver<bool>) -> Result<(), GatewayError> {
        let addr = self.config.http_addr();
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| GatewayError::Bind(format!("{addr}: {e}")))?;
        self.serve_with_listener(listener, shutdown).await
    }

    /// Serve on an already bound listener.
    pub async fn serve_with_listener(
        self,
        listener: TcpListener,
        shutdown: watch::Receiver<bool>,
    ) -> Result<(), GatewayError> {
        let local = listener
            .local_addr()
            .map_err(|e| GatewayError::Bind(e.to_string()))?;
        let router = build_router(self.state.with_shutdown(shutdown.clone()));

        info!(addr = %local, "HTTP gateway listening");
        axum::serve(listener, router)
            .with_graceful_shutdown(wait_for_shutdown(shutdown))
            .await
            .map_err(|e| GatewayError::Serve(e.to_string()))?;

        info!("HTTP gateway stopped");
        Ok(())
    }
}

async fn wait_for_shutdown(mut shutdown: watch::Receiver<bool>) {
    loop {
        if *shutdown.borrow_and_update() {
            return;
        }
        if shutdown.changed().await.is_err() {
            return;
        }
    }
}
