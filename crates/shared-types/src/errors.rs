//! # Error Types
//!
//! Errors raised when an incoming event does not satisfy the contract.

use thiserror::Error;

/// Reasons an event is rejected at the consumer boundary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required string field is empty.
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    /// `value` is not a non-negative integer string.
    #[error("value must be a non-negative integer string, got {value:?}")]
    InvalidValue { value: String },

    /// The payload could not be decoded as an event.
    #[error("malformed event payload: {0}")]
    Malformed(String),
}

impl From<serde_json::Error> for ValidationError {
    fn from(e: serde_json::Error) -> Self {
        ValidationError::Malformed(e.to_string())
    }
}
