//! Error types for the time limiter.

use callgate_core::AttemptFailure;
use std::time::Duration;
use thiserror::Error;

/// Errors returned by the time limiter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimeLimiterError<E> {
    /// The call did not complete before its deadline.
    #[error("call timed out after {after:?}")]
    Timeout {
        /// The deadline that was exceeded.
        after: Duration,
    },

    /// The call completed with an error.
    #[error("inner service error: {0}")]
    Inner(E),
}

impl<E> TimeLimiterError<E> {
    /// Returns true if this error is a timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, TimeLimiterError::Timeout { .. })
    }

    /// Returns the inner error if this is an `Inner` variant.
    pub fn into_inner(self) -> Option<E> {
        match self {
            TimeLimiterError::Inner(e) => Some(e),
            TimeLimiterError::Timeout { .. } => None,
        }
    }
}

impl<E> From<TimeLimiterError<E>> for AttemptFailure<E> {
    fn from(err: TimeLimiterError<E>) -> Self {
        match err {
            TimeLimiterError::Timeout { after } => AttemptFailure::Timeout { after },
            TimeLimiterError::Inner(e) => AttemptFailure::Failure(e),
        }
    }
}
