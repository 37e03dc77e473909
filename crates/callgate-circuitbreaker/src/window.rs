//! Count-based sliding window of call outcomes.

use callgate_core::CallOutcome;
use std::collections::VecDeque;

/// Fixed-capacity ring buffer of the most recent call outcomes.
///
/// Running counts are maintained on every insert and eviction so rates can
/// be read without scanning the buffer. `Failure` and `Timeout` both count
/// as failures; `Slow` counts as slow only. `Rejected` outcomes are never
/// stored.
#[derive(Debug, Clone)]
pub struct SlidingWindow {
    outcomes: VecDeque<CallOutcome>,
    capacity: usize,
    failures: usize,
    slow: usize,
    successes: usize,
}

impl SlidingWindow {
    /// Largest supported capacity.
    pub const MAX_CAPACITY: usize = 100_000;

    /// Creates an empty window holding at most `capacity` outcomes.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero or above [`Self::MAX_CAPACITY`].
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "sliding window capacity must be greater than zero");
        assert!(
            capacity <= Self::MAX_CAPACITY,
            "sliding window capacity must not exceed {}",
            Self::MAX_CAPACITY
        );
        Self {
            outcomes: VecDeque::with_capacity(capacity),
            capacity,
            failures: 0,
            slow: 0,
            successes: 0,
        }
    }

    /// Records an outcome, evicting the oldest entry when full.
    ///
    /// Returns the evicted outcome, if any.
    pub fn record(&mut self, outcome: CallOutcome) -> Option<CallOutcome> {
        if outcome == CallOutcome::Rejected {
            return None;
        }

        let evicted = if self.outcomes.len() == self.capacity {
            let old = self.outcomes.pop_front();
            if let Some(old) = old {
                self.adjust(old, false);
            }
            old
        } else {
            None
        };

        self.outcomes.push_back(outcome);
        self.adjust(outcome, true);
        evicted
    }

    fn adjust(&mut self, outcome: CallOutcome, add: bool) {
        let counter = match outcome {
            CallOutcome::Failure | CallOutcome::Timeout => &mut self.failures,
            CallOutcome::Slow => &mut self.slow,
            CallOutcome::Success => &mut self.successes,
            CallOutcome::Rejected => return,
        };
        if add {
            *counter += 1;
        } else {
            *counter -= 1;
        }
    }

    /// Number of outcomes currently held.
    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    /// Returns `true` if no outcomes are held.
    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    /// Returns `true` once the window holds `capacity` outcomes.
    pub fn is_full(&self) -> bool {
        self.outcomes.len() == self.capacity
    }

    /// Maximum number of outcomes held.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Failures and timeouts currently in the window.
    pub fn failure_count(&self) -> usize {
        self.failures
    }

    /// Slow calls currently in the window.
    pub fn slow_count(&self) -> usize {
        self.slow
    }

    /// Fast successes currently in the window.
    pub fn success_count(&self) -> usize {
        self.successes
    }

    /// Failure rate in percent (0-100) over the held outcomes.
    pub fn failure_rate(&self) -> f64 {
        percent(self.failures, self.outcomes.len())
    }

    /// Slow-call rate in percent (0-100) over the held outcomes.
    pub fn slow_rate(&self) -> f64 {
        percent(self.slow, self.outcomes.len())
    }

    /// Drops every outcome.
    pub fn clear(&mut self) {
        self.outcomes.clear();
        self.failures = 0;
        self.slow = 0;
        self.successes = 0;
    }

    /// Copies the current contents and derived rates.
    pub fn snapshot(&self) -> WindowSnapshot {
        WindowSnapshot {
            capacity: self.capacity,
            outcomes: self.outcomes.iter().copied().collect(),
            total: self.outcomes.len(),
            failures: self.failures,
            slow: self.slow,
            successes: self.successes,
            failure_rate: self.failure_rate(),
            slow_rate: self.slow_rate(),
        }
    }
}

fn percent(count: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        count as f64 / total as f64 * 100.0
    }
}

/// Point-in-time copy of a [`SlidingWindow`].
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WindowSnapshot {
    /// Window capacity.
    pub capacity: usize,
    /// Held outcomes, oldest first.
    pub outcomes: Vec<CallOutcome>,
    /// Number of held outcomes.
    pub total: usize,
    /// Failures and timeouts.
    pub failures: usize,
    /// Slow calls.
    pub slow: usize,
    /// Fast successes.
    pub successes: usize,
    /// Failure rate in percent.
    pub failure_rate: f64,
    /// Slow-call rate in percent.
    pub slow_rate: f64,
}

impl WindowSnapshot {
    /// An empty snapshot for a window of `capacity`.
    pub fn empty(capacity: usize) -> Self {
        Self {
            capacity,
            outcomes: Vec::new(),
            total: 0,
            failures: 0,
            slow: 0,
            successes: 0,
            failure_rate: 0.0,
            slow_rate: 0.0,
        }
    }
}
