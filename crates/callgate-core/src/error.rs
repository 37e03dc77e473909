//! The unified error surfaced by a composed gate.
//!
//! Each component crate has its own error type (`BulkheadError`,
//! `CircuitBreakerError`, `TimeLimiterError`, `RetryError`) and provides a
//! `From` conversion into [`GateError`], so code that drives the whole
//! pipeline handles a single enum.
//!
//! ```rust
//! use callgate_core::{AttemptFailure, GateError};
//!
//! fn describe(err: &GateError<std::io::Error>) -> &'static str {
//!     match err {
//!         GateError::BulkheadRejected { .. } => "too busy",
//!         GateError::CircuitOpen { .. } => "dependency unhealthy",
//!         GateError::RetryExhausted { last: AttemptFailure::Timeout { .. }, .. } => "timed out",
//!         GateError::RetryExhausted { .. } => "kept failing",
//!         GateError::CallFailed(_) => "failed",
//!         GateError::UnknownResource { .. } => "misconfigured",
//!     }
//! }
//!
//! let err: GateError<std::io::Error> = GateError::CircuitOpen { name: "payments".into() };
//! assert_eq!(describe(&err), "dependency unhealthy");
//! assert!(err.is_circuit_open());
//! ```

use std::time::Duration;
use thiserror::Error;

/// Why a single attempt failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AttemptFailure<E> {
    /// The call itself returned an error.
    #[error("{0}")]
    Failure(E),

    /// The call did not finish before its deadline.
    #[error("attempt timed out after {after:?}")]
    Timeout {
        /// The deadline that was exceeded.
        after: Duration,
    },
}

impl<E> AttemptFailure<E> {
    /// Returns `true` if the attempt timed out.
    pub fn is_timeout(&self) -> bool {
        matches!(self, AttemptFailure::Timeout { .. })
    }

    /// Returns the call's error, if the attempt failed with one.
    pub fn into_error(self) -> Option<E> {
        match self {
            AttemptFailure::Failure(e) => Some(e),
            AttemptFailure::Timeout { .. } => None,
        }
    }

    /// Maps the call's error.
    pub fn map<F, T>(self, f: F) -> AttemptFailure<T>
    where
        F: FnOnce(E) -> T,
    {
        match self {
            AttemptFailure::Failure(e) => AttemptFailure::Failure(f(e)),
            AttemptFailure::Timeout { after } => AttemptFailure::Timeout { after },
        }
    }
}

/// Error returned by a gate invocation.
///
/// `BulkheadRejected` and `CircuitOpen` are local, expected conditions: the
/// protected call never ran (or, for a mid-retry rejection, did not run
/// again) and they are never retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GateError<E> {
    /// The bulkhead had no free permit within the configured wait.
    #[error("bulkhead '{name}' is full ({max_concurrent_calls} concurrent calls)")]
    BulkheadRejected {
        /// Resource name.
        name: String,
        /// Configured bulkhead capacity.
        max_concurrent_calls: usize,
    },

    /// The circuit breaker refused the call.
    #[error("circuit '{name}' is open; call not permitted")]
    CircuitOpen {
        /// Resource name.
        name: String,
    },

    /// Every permitted attempt failed.
    #[error("'{name}' failed after {attempts} attempts: {last}")]
    RetryExhausted {
        /// Resource name.
        name: String,
        /// Number of attempts that ran.
        attempts: usize,
        /// Failure of the final attempt.
        last: AttemptFailure<E>,
    },

    /// The call failed with an error the retry predicate declined to retry.
    #[error("call failed: {0}")]
    CallFailed(E),

    /// No gate is registered under this name.
    #[error("no gate registered for resource '{name}'")]
    UnknownResource {
        /// The requested name.
        name: String,
    },
}

impl<E> GateError<E> {
    /// Returns `true` if the circuit breaker rejected the call.
    pub fn is_circuit_open(&self) -> bool {
        matches!(self, GateError::CircuitOpen { .. })
    }

    /// Returns `true` if the bulkhead rejected the call.
    pub fn is_bulkhead_rejected(&self) -> bool {
        matches!(self, GateError::BulkheadRejected { .. })
    }

    /// Returns `true` if the retry budget was used up.
    pub fn is_retry_exhausted(&self) -> bool {
        matches!(self, GateError::RetryExhausted { .. })
    }

    /// Returns `true` if the call was refused before it could run.
    pub fn is_rejection(&self) -> bool {
        self.is_circuit_open() || self.is_bulkhead_rejected()
    }

    /// Number of attempts that ran, when known.
    pub fn attempts(&self) -> Option<usize> {
        match self {
            GateError::RetryExhausted { attempts, .. } => Some(*attempts),
            _ => None,
        }
    }

    /// Extracts the call's own error, if the failure carries one.
    ///
    /// Returns `None` for rejections, timeouts and unknown resources.
    pub fn into_call_error(self) -> Option<E> {
        match self {
            GateError::CallFailed(e) => Some(e),
            GateError::RetryExhausted { last, .. } => last.into_error(),
            _ => None,
        }
    }

    /// Maps the call's error using a function.
    ///
    /// ```
    /// use callgate_core::GateError;
    ///
    /// let err: GateError<String> = GateError::CallFailed("boom".to_string());
    /// let mapped: GateError<usize> = err.map_call_error(|s| s.len());
    /// assert_eq!(mapped.into_call_error(), Some(4));
    /// ```
    pub fn map_call_error<F, T>(self, f: F) -> GateError<T>
    where
        F: FnOnce(E) -> T,
    {
        match self {
            GateError::BulkheadRejected {
                name,
                max_concurrent_calls,
            } => GateError::BulkheadRejected {
                name,
                max_concurrent_calls,
            },
            GateError::CircuitOpen { name } => GateError::CircuitOpen { name },
            GateError::RetryExhausted {
                name,
                attempts,
                last,
            } => GateError::RetryExhausted {
                name,
                attempts,
                last: last.map(f),
            },
            GateError::CallFailed(e) => GateError::CallFailed(f(e)),
            GateError::UnknownResource { name } => GateError::UnknownResource { name },
        }
    }
}
