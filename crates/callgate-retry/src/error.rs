//! Error types for the retry policy.

use callgate_core::{AttemptFailure, GateError};
use thiserror::Error;

/// Why a retried operation gave up.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RetryError<E> {
    /// Every permitted attempt failed.
    #[error("'{name}' failed after {attempts} attempts: {last}")]
    Exhausted {
        /// Name of the retry policy.
        name: String,
        /// Number of attempts that ran.
        attempts: usize,
        /// Error of the final attempt.
        last: E,
    },

    /// An attempt failed with an error the predicate declined to retry.
    #[error("'{name}' gave up on attempt {attempts}: {error}")]
    Aborted {
        /// Name of the retry policy.
        name: String,
        /// Number of attempts that ran.
        attempts: usize,
        /// The non-retryable error.
        error: E,
    },
}

impl<E> RetryError<E> {
    /// Returns true if all attempts were used.
    pub fn is_exhausted(&self) -> bool {
        matches!(self, RetryError::Exhausted { .. })
    }

    /// Number of attempts that ran.
    pub fn attempts(&self) -> usize {
        match self {
            RetryError::Exhausted { attempts, .. } | RetryError::Aborted { attempts, .. } => {
                *attempts
            }
        }
    }

    /// Returns the error of the final attempt.
    pub fn into_inner(self) -> E {
        match self {
            RetryError::Exhausted { last, .. } => last,
            RetryError::Aborted { error, .. } => error,
        }
    }
}

impl<E> From<RetryError<AttemptFailure<E>>> for GateError<E> {
    fn from(err: RetryError<AttemptFailure<E>>) -> Self {
        match err {
            RetryError::Exhausted {
                name,
                attempts,
                last,
            }
            | RetryError::Aborted {
                name,
                attempts,
                error: last @ AttemptFailure::Timeout { .. },
            } => GateError::RetryExhausted {
                name,
                attempts,
                last,
            },
            RetryError::Aborted {
                error: AttemptFailure::Failure(e),
                ..
            } => GateError::CallFailed(e),
        }
    }
}
