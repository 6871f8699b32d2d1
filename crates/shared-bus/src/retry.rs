//! Exponential backoff policy for publishing.

use rand::Rng;
use std::time::Duration;

/// Bounded retry schedule.
///
/// `max_attempts` counts the first try, so the default of 8 allows seven
/// waits: 0.5s, 1s, 2s, 4s, 8s, then the 10s cap twice. `max_elapsed` stops
/// the loop early if the next wait would overrun the window.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    pub multiplier: f64,
    /// Adds up to `±jitter_fraction * delay` of random jitter (0.0 = none).
    pub jitter_fraction: f64,
    pub max_elapsed: Duration,
    /// Upper bound on a single transport call.
    pub attempt_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 8,
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(10),
            multiplier: 2.0,
            jitter_fraction: 0.0,
            max_elapsed: Duration::from_secs(60),
            attempt_timeout: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    /// Delay after the `attempt`-th failure (1-based), without jitter.
    ///
    /// `None` once `attempt` reaches `max_attempts`.
    pub fn base_delay(&self, attempt: u32) -> Option<Duration> {
        if attempt == 0 || attempt >= self.max_attempts {
            return None;
        }
        let exp = i32::try_from(attempt - 1).unwrap_or(i32::MAX);
        let millis = self.initial_backoff.as_millis() as f64 * self.multiplier.powi(exp);
        let capped = millis.min(self.max_backoff.as_millis() as f64);
        Some(Duration::from_millis(capped.round() as u64))
    }

    /// Delay after the `attempt`-th failure with jitter applied.
    pub fn delay_after(&self, attempt: u32) -> Option<Duration> {
        let base = self.base_delay(attempt)?;
        if self.jitter_fraction <= 0.0 {
            return Some(base);
        }
        let spread = base.as_secs_f64() * self.jitter_fraction;
        let offset = rand::thread_rng().gen_range(-spread..=spread);
        Some(Duration::from_secs_f64((base.as_secs_f64() + offset).max(0.0)))
    }

    /// Every wait the policy would schedule, in order.
    pub fn schedule(&self) -> Vec<Duration> {
        (1..self.max_attempts)
            .filter_map(|attempt| self.base_delay(attempt))
            .collect()
    }
}
