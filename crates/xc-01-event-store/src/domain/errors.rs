//! # Store Errors

use shared_types::ValidationError;
use std::time::Duration;
use thiserror::Error;

/// Errors from the event store and its durable backend.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// The event violates the contract and was not stored.
    #[error("invalid event: {0}")]
    Invalid(#[from] ValidationError),

    /// The durable backend reported an error.
    #[error("durable store error: {0}")]
    Durable(String),

    /// The durable backend did not answer in time.
    #[error("durable store timed out after {0:?}")]
    Timeout(Duration),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        StoreError::Durable(e.to_string())
    }
}
