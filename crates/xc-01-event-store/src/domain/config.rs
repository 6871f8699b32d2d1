//! Store configuration.

use std::time::Duration;
use thiserror::Error;

/// Capacities and timeouts for the event store.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Global most-recent-first sequence cap (default: 1000).
    pub max_events: usize,
    /// Per-address index cap (default: 100).
    pub max_events_per_address: usize,
    /// Number of addresses indexed in memory before the least recently
    /// active one is dropped (default: 10,000).
    pub max_addresses: usize,
    /// Bound on every durable store call (default: 3s).
    pub durable_timeout: Duration,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            max_events: 1000,
            max_events_per_address: 100,
            max_addresses: 10_000,
            durable_timeout: Duration::from_secs(3),
        }
    }
}

impl StoreConfig {
    /// Reject zero capacities and timeouts.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_events == 0 {
            return Err(ConfigError::ZeroCapacity("max_events"));
        }
        if self.max_events_per_address == 0 {
            return Err(ConfigError::ZeroCapacity("max_events_per_address"));
        }
        if self.max_addresses == 0 {
            return Err(ConfigError::ZeroCapacity("max_addresses"));
        }
        if self.durable_timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout("durable_timeout"));
        }
        Ok(())
    }
}

/// Configuration errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("{0} cannot be 0")]
    ZeroCapacity(&'static str),

    #[error("{0} cannot be 0")]
    ZeroTimeout(&'static str),
}
