//! Reconnect policy for the ingestion loop.

use std::time::Duration;

/// Capped exponential backoff between subscribe attempts.
///
/// Unlike the publisher's retry policy this one never gives up: the consumer
/// keeps trying for as long as the service runs.
#[derive(Debug, Clone, Copy)]
pub struct ReconnectPolicy {
    /// Delay before the first retry (default: 500ms)
    pub initial_delay: Duration,
    /// Ceiling for any single delay (default: 30s)
    pub max_delay: Duration,
    /// Growth factor per consecutive failure (default: 2)
    pub multiplier: u32,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
            multiplier: 2,
        }
    }
}

impl ReconnectPolicy {
    /// Delay after `failures` consecutive failed attempts.
    pub fn delay(&self, failures: u32) -> Duration {
        let factor = self
            .multiplier
            .max(1)
            .checked_pow(failures.min(31))
            .unwrap_or(u32::MAX);
        self.initial_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }
}
