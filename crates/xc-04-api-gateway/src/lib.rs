//! # API Gateway Subsystem (xc-04)
//!
//! HTTP boundary of the relay.
//!
//! ```text
//!   client ──→ CORS → Tracing ──┬─ Timeout ─→ /transactions, /wallet/:address/transactions ──→ EventStoreApi
//!                               ├───────────→ /events/subscribe (SSE) ──→ HubHandle::register
//!                               ├───────────→ /metrics ──→ component stats → relay-telemetry
//!                               └───────────→ /health
//! ```
//!
//! ## Error Model
//!
//! | Situation | Response |
//! |-----------|----------|
//! | Malformed query parameter | ignored, default used, `200` |
//! | Blank wallet address | `400 {"error": ...}` |
//! | Durable store down or slow | served from cache, `200` |
//! | Hub shut down | `503` on `/events/subscribe` |
//! | Query exceeds request timeout | `504` |
//!
//! ## Usage
//!
//! ```ignore
//! use xc_04_api_gateway::{ApiGatewayService, GatewayConfig};
//!
//! let gateway = ApiGatewayService::new(GatewayConfig::default(), store, hub)?;
//! gateway.serve(shutdown_rx).await?;
//! ```

#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod domain;
pub mod middleware;
pub mod router;
pub mod routes;
pub mod service;

pub use domain::{
    filter_from_params, ApiError, ConfigError, CorsConfig, GatewayConfig, GatewayError,
    HttpConfig, SseConfig, TimeoutConfig,
};
pub use router::{build_router, AppState};
pub use service::ApiGatewayService;
