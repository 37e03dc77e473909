//! Classification of a single call attempt.

use std::fmt;
use std::time::Duration;

/// The result of one attempt, as seen by the circuit breaker.
///
/// `Failure` and `Timeout` both count toward the failure rate. `Slow` marks
/// a call that succeeded but took at least the slow-call threshold; the
/// caller still receives its result. `Rejected` is produced when the gate
/// refuses the call before it starts and is never written into a window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum CallOutcome {
    /// The call completed successfully within the slow-call threshold.
    Success,
    /// The call returned an error.
    Failure,
    /// The call succeeded but was slower than the slow-call threshold.
    Slow,
    /// The call did not complete before its deadline.
    Timeout,
    /// The call was refused by a bulkhead or an open circuit.
    Rejected,
}

impl CallOutcome {
    /// Classifies a completed call.
    ///
    /// A successful call whose `elapsed` time reaches `slow_threshold` is
    /// [`CallOutcome::Slow`]. Failed calls stay [`CallOutcome::Failure`]
    /// regardless of how long they took.
    pub fn classify(succeeded: bool, elapsed: Duration, slow_threshold: Option<Duration>) -> Self {
        if !succeeded {
            return CallOutcome::Failure;
        }
        match slow_threshold {
            Some(threshold) if elapsed >= threshold => CallOutcome::Slow,
            _ => CallOutcome::Success,
        }
    }

    /// Returns `true` for outcomes that count toward the failure rate.
    pub fn is_failure(&self) -> bool {
        matches!(self, CallOutcome::Failure | CallOutcome::Timeout)
    }

    /// Returns `true` if the caller received a result.
    pub fn is_success(&self) -> bool {
        matches!(self, CallOutcome::Success | CallOutcome::Slow)
    }

    /// Returns the outcome's label, used in metrics and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            CallOutcome::Success => "success",
            CallOutcome::Failure => "failure",
            CallOutcome::Slow => "slow",
            CallOutcome::Timeout => "timeout",
            CallOutcome::Rejected => "rejected",
        }
    }
}

impl fmt::Display for CallOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
