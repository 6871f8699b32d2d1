//! Hub configuration.

use thiserror::Error;

/// Buffer sizes for the hub actor.
#[derive(Debug, Clone, Copy)]
pub struct HubConfig {
    /// Messages buffered per subscriber before it is considered slow
    /// and dropped (default: 64).
    pub subscriber_capacity: usize,
    /// Pending register/broadcast commands (default: 1024).
    pub intake_capacity: usize,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            subscriber_capacity: 64,
            intake_capacity: 1024,
        }
    }
}

impl HubConfig {
    pub fn with_subscriber_capacity(mut self, capacity: usize) -> Self {
        self.subscriber_capacity = capacity;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.subscriber_capacity == 0 {
            return Err(ConfigError::ZeroCapacity("subscriber_capacity"));
        }
        if self.intake_capacity == 0 {
            return Err(ConfigError::ZeroCapacity("intake_capacity"));
        }
        Ok(())
    }
}

/// Configuration errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("{0} cannot be 0")]
    ZeroCapacity(&'static str),
}
