//! # Event Publisher
//!
//! Producer side of the pipeline: serialize a normalized event once, hand the
//! full payload to the transport, and retry transport failures on a bounded
//! exponential schedule.
//!
//! The loop never raises through the caller. It returns a tagged result:
//! a [`PublishReceipt`] on success, or a [`PublishError`] that is either a
//! non-retryable serialization bug or an exhausted [`PublishFailure`]. The
//! latter is logged at error level with the chain and tx hash so an operator
//! can replay it by hand.

use crate::retry::RetryPolicy;
use crate::transport::{TransportChannel, TransportError};
use crate::EVENTS_CHANNEL;
use shared_types::NormalizedEvent;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::time::{sleep, timeout, Instant};
use tracing::{debug, error, warn};

/// Successful delivery to the broker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishReceipt {
    pub event_id: String,
    /// Attempts used, including the successful one.
    pub attempts: u32,
    /// Subscribers the broker reported.
    pub receivers: usize,
}

/// Terminal failure after retries ran out. Candidate for manual replay.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("publish of {event_id} ({chain} {tx_hash}) failed after {attempts} attempts: {reason}")]
pub struct PublishFailure {
    pub event_id: String,
    pub chain: String,
    pub tx_hash: String,
    pub attempts: u32,
    pub reason: String,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PublishError {
    /// The event could not be encoded. Not retried.
    #[error("failed to serialize event {event_id}: {reason}")]
    Serialization { event_id: String, reason: String },

    /// Every attempt failed.
    #[error(transparent)]
    Exhausted(#[from] PublishFailure),
}

/// Counters kept by a publisher.
#[derive(Debug, Default)]
pub struct PublisherStats {
    pub published: AtomicU64,
    pub failed: AtomicU64,
    pub attempts: AtomicU64,
}

impl PublisherStats {
    pub fn published(&self) -> u64 {
        self.published.load(Ordering::Relaxed)
    }

    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }

    pub fn attempts(&self) -> u64 {
        self.attempts.load(Ordering::Relaxed)
    }
}

/// Publishes normalized events with bounded retry.
pub struct EventPublisher {
    transport: Arc<dyn TransportChannel>,
    channel: String,
    policy: RetryPolicy,
    stats: PublisherStats,
}

impl EventPublisher {
    /// Publisher on the well-known events channel with the default policy.
    pub fn new(transport: Arc<dyn TransportChannel>) -> Self {
        Self::with_policy(transport, EVENTS_CHANNEL, RetryPolicy::default())
    }

    pub fn with_policy(
        transport: Arc<dyn TransportChannel>,
        channel: impl Into<String>,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            transport,
            channel: channel.into(),
            policy,
            stats: PublisherStats::default(),
        }
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn stats(&self) -> &PublisherStats {
        &self.stats
    }

    /// Publish one event.
    ///
    /// # Errors
    ///
    /// - `PublishError::Serialization` - the event could not be encoded
    /// - `PublishError::Exhausted` - attempts or elapsed budget ran out
    pub async fn publish(&self, event: &NormalizedEvent) -> Result<PublishReceipt, PublishError> {
        let payload = serde_json::to_string(event).map_err(|e| {
            self.stats.failed.fetch_add(1, Ordering::Relaxed);
            error!(
                event_id = %event.event_id,
                error = %e,
                "Event serialization failed, dropping"
            );
            PublishError::Serialization {
                event_id: event.event_id.clone(),
                reason: e.to_string(),
            }
        })?;

        let started = Instant::now();
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;
            self.stats.attempts.fetch_add(1, Ordering::Relaxed);

            let result = match timeout(
                self.policy.attempt_timeout,
                self.transport.publish(&self.channel, payload.clone()),
            )
            .await
            {
                Ok(result) => result,
                Err(_) => Err(TransportError::Timeout(self.policy.attempt_timeout)),
            };

            let err = match result {
                Ok(receivers) => {
                    self.stats.published.fetch_add(1, Ordering::Relaxed);
                    debug!(
                        event_id = %event.event_id,
                        attempts = attempt,
                        receivers,
                        "Event published"
                    );
                    return Ok(PublishReceipt {
                        event_id: event.event_id.clone(),
                        attempts: attempt,
                        receivers,
                    });
                }
                Err(err) => err,
            };

            let next_delay = self
                .policy
                .delay_after(attempt)
                .filter(|delay| started.elapsed() + *delay <= self.policy.max_elapsed);

            let Some(delay) = next_delay else {
                self.stats.failed.fetch_add(1, Ordering::Relaxed);
                let failure = PublishFailure {
                    event_id: event.event_id.clone(),
                    chain: event.chain.clone(),
                    tx_hash: event.tx_hash.clone(),
                    attempts: attempt,
                    reason: err.to_string(),
                };
                error!(
                    event_id = %failure.event_id,
                    chain = %failure.chain,
                    tx_hash = %failure.tx_hash,
                    attempts = failure.attempts,
                    reason = %failure.reason,
                    "PublishFailure: retries exhausted, event needs manual replay"
                );
                return Err(failure.into());
            };

            warn!(
                event_id = %event.event_id,
                attempt,
                delay_ms = delay.as_millis() as u64,
                error = %err,
                "Publish failed, retrying"
            );
            sleep(delay).await;
        }
    }
}
