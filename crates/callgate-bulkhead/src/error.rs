//! Error types for the bulkhead.

use callgate_core::GateError;
use std::time::Duration;

/// Errors that can occur when acquiring a bulkhead permit.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BulkheadError {
    /// No permit became free within the configured wait.
    #[error("bulkhead '{name}' is full: max concurrent calls ({max_concurrent_calls}) reached after waiting {waited:?}")]
    Rejected {
        /// Name of the bulkhead instance.
        name: String,
        /// Maximum concurrent calls allowed.
        max_concurrent_calls: usize,
        /// Time spent waiting before giving up.
        waited: Duration,
    },
}

/// Result type for bulkhead operations.
pub type Result<T> = std::result::Result<T, BulkheadError>;

impl<E> From<BulkheadError> for GateError<E> {
    fn from(err: BulkheadError) -> Self {
        match err {
            BulkheadError::Rejected {
                name,
                max_concurrent_calls,
                ..
            } => GateError::BulkheadRejected {
                name,
                max_concurrent_calls,
            },
        }
    }
}
