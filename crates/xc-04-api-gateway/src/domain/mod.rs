//! Gateway domain: configuration, errors and request parsing.

pub mod config;
pub mod error;
pub mod params;

pub use config::{ConfigError, CorsConfig, GatewayConfig, HttpConfig, SseConfig, TimeoutConfig};
pub use error::{ApiError, GatewayError};
pub use params::{filter_from_params, wallet_address};
