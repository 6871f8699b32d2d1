//! Middleware stack for the HTTP router.
//!
//! Order (outermost first): CORS → Tracing → Timeout (query routes only).

pub mod cors;
pub mod timeout;
pub mod tracing;

pub use cors::create_cors_layer;
pub use timeout::{TimeoutLayer, TimeoutService};
pub use self::tracing::{TracingLayer, TracingService};
