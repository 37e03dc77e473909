use crate::config::CircuitBreakerConfig;
use crate::events::CircuitBreakerEvent;
use crate::window::{SlidingWindow, WindowSnapshot};
use callgate_core::CallOutcome;
#[cfg(feature = "metrics")]
use metrics::{counter, gauge, histogram};
use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Represents the state of the circuit breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "SCREAMING_SNAKE_CASE"))]
#[repr(u8)]
pub enum CircuitState {
    /// The circuit is closed and calls are allowed.
    Closed = 0,
    /// The circuit is open and calls are rejected.
    Open = 1,
    /// The circuit is half-open and a limited number of trial calls are allowed.
    HalfOpen = 2,
}

impl CircuitState {
    pub(crate) fn from_u8(value: u8) -> Self {
        match value {
            1 => CircuitState::Open,
            2 => CircuitState::HalfOpen,
            _ => CircuitState::Closed,
        }
    }

    /// Returns the state's label, used in metrics and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            CircuitState::Closed => "Closed",
            CircuitState::Open => "Open",
            CircuitState::HalfOpen => "HalfOpen",
        }
    }
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Point-in-time view of a circuit breaker.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CircuitSnapshot {
    /// Breaker name.
    pub name: String,
    /// Current state.
    pub state: CircuitState,
    /// Contents of the sliding window.
    pub window: WindowSnapshot,
    /// Calls rejected since the breaker was created or last reset.
    pub rejected_calls: u64,
    /// Time since the last state transition.
    pub time_in_state: Duration,
}

/// The breaker's mutable state. Always accessed under the breaker's mutex.
pub(crate) struct Circuit {
    state: CircuitState,
    state_atomic: Arc<AtomicU8>,
    window: SlidingWindow,
    last_transition: Instant,
    epoch: u64,
    half_open_admitted: usize,
    half_open_successes: usize,
    rejected_calls: u64,
}

impl Circuit {
    pub(crate) fn new(config: &CircuitBreakerConfig, state_atomic: Arc<AtomicU8>, now: Instant) -> Self {
        state_atomic.store(CircuitState::Closed as u8, Ordering::Release);
        Self {
            state: CircuitState::Closed,
            state_atomic,
            window: SlidingWindow::new(config.sliding_window_size),
            last_transition: now,
            epoch: 0,
            half_open_admitted: 0,
            half_open_successes: 0,
            rejected_calls: 0,
        }
    }

    pub(crate) fn state(&self) -> CircuitState {
        self.state
    }

    #[cfg(test)]
    pub(crate) fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Decides whether a call may proceed.
    ///
    /// Returns the epoch the call was admitted under. An open circuit whose
    /// wait has elapsed moves to half-open here, before the trial budget is
    /// checked.
    pub(crate) fn try_acquire(&mut self, config: &CircuitBreakerConfig, now: Instant) -> Option<u64> {
        if self.state == CircuitState::Open
            && now.saturating_duration_since(self.last_transition) >= config.wait_duration_in_open
        {
            self.transition_to(CircuitState::HalfOpen, config, now);
        }

        let permitted = match self.state {
            CircuitState::Closed => true,
            CircuitState::Open => false,
            CircuitState::HalfOpen => {
                if self.half_open_admitted < config.permitted_calls_in_half_open {
                    self.half_open_admitted += 1;
                    true
                } else {
                    false
                }
            }
        };

        if permitted {
            config
                .event_listeners
                .emit(&CircuitBreakerEvent::CallPermitted {
                    pattern_name: config.name.clone(),
                    timestamp: now,
                    state: self.state,
                });
            Some(self.epoch)
        } else {
            self.rejected_calls += 1;
            config
                .event_listeners
                .emit(&CircuitBreakerEvent::CallRejected {
                    pattern_name: config.name.clone(),
                    timestamp: now,
                    state: self.state,
                });

            #[cfg(feature = "metrics")]
            counter!("circuitbreaker_calls_total", "circuitbreaker" => config.name.clone(), "outcome" => "rejected").increment(1);

            None
        }
    }

    /// Records the outcome of a call admitted under `epoch`.
    ///
    /// Outcomes from an earlier epoch are discarded. Returns whether the
    /// outcome was counted.
    pub(crate) fn record(
        &mut self,
        config: &CircuitBreakerConfig,
        epoch: u64,
        outcome: CallOutcome,
        duration: Duration,
        now: Instant,
    ) -> bool {
        if epoch != self.epoch || outcome == CallOutcome::Rejected {
            #[cfg(feature = "tracing")]
            tracing::trace!(
                breaker = %config.name,
                admitted_epoch = epoch,
                current_epoch = self.epoch,
                outcome = %outcome,
                "discarding stale outcome"
            );
            return false;
        }

        if outcome == CallOutcome::Slow {
            config
                .event_listeners
                .emit(&CircuitBreakerEvent::SlowCallDetected {
                    pattern_name: config.name.clone(),
                    timestamp: now,
                    duration,
                    state: self.state,
                });

            #[cfg(feature = "metrics")]
            counter!("circuitbreaker_slow_calls_total", "circuitbreaker" => config.name.clone())
                .increment(1);
        }

        config
            .event_listeners
            .emit(&CircuitBreakerEvent::OutcomeRecorded {
                pattern_name: config.name.clone(),
                timestamp: now,
                state: self.state,
                outcome,
                duration,
            });

        #[cfg(feature = "metrics")]
        {
            counter!("circuitbreaker_calls_total", "circuitbreaker" => config.name.clone(), "outcome" => outcome.as_str()).increment(1);
            histogram!("circuitbreaker_call_duration_seconds", "circuitbreaker" => config.name.clone())
                .record(duration.as_secs_f64());
        }

        self.window.record(outcome);

        match self.state {
            CircuitState::Closed => self.evaluate_window(config, now),
            CircuitState::HalfOpen => {
                if outcome == CallOutcome::Success {
                    self.half_open_successes += 1;
                    if self.half_open_successes >= config.permitted_calls_in_half_open {
                        self.transition_to(CircuitState::Closed, config, now);
                    }
                } else {
                    self.transition_to(CircuitState::Open, config, now);
                }
            }
            CircuitState::Open => {}
        }

        true
    }

    /// Hands back a half-open trial slot whose call never reported.
    pub(crate) fn release_trial(&mut self, epoch: u64) {
        if epoch == self.epoch && self.state == CircuitState::HalfOpen && self.half_open_admitted > 0 {
            self.half_open_admitted -= 1;
        }
    }

    pub(crate) fn force_open(&mut self, config: &CircuitBreakerConfig, now: Instant) {
        if self.state == CircuitState::Open {
            self.last_transition = now;
        } else {
            self.transition_to(CircuitState::Open, config, now);
        }
    }

    pub(crate) fn force_closed(&mut self, config: &CircuitBreakerConfig, now: Instant) {
        self.transition_to(CircuitState::Closed, config, now);
    }

    /// Closes the circuit and forgets all recorded history.
    pub(crate) fn reset(&mut self, config: &CircuitBreakerConfig, now: Instant) {
        self.transition_to(CircuitState::Closed, config, now);
        self.window.clear();
        self.rejected_calls = 0;
        self.epoch += 1;
    }

    pub(crate) fn snapshot(&self, config: &CircuitBreakerConfig, now: Instant) -> CircuitSnapshot {
        CircuitSnapshot {
            name: config.name.clone(),
            state: self.state,
            window: self.window.snapshot(),
            rejected_calls: self.rejected_calls,
            time_in_state: now.saturating_duration_since(self.last_transition),
        }
    }

    fn transition_to(&mut self, state: CircuitState, config: &CircuitBreakerConfig, now: Instant) {
        if self.state == state {
            return;
        }

        let from_state = self.state;

        config
            .event_listeners
            .emit(&CircuitBreakerEvent::StateTransition {
                pattern_name: config.name.clone(),
                timestamp: now,
                from_state,
                to_state: state,
            });

        #[cfg(feature = "tracing")]
        {
            let failure_rate = self.window.failure_rate();
            let slow_rate = self.window.slow_rate();
            if state == CircuitState::Open {
                tracing::warn!(breaker = %config.name, from = %from_state, to = %state, failure_rate, slow_rate, "circuit state transition");
            } else {
                tracing::info!(breaker = %config.name, from = %from_state, to = %state, "circuit state transition");
            }
        }

        #[cfg(feature = "metrics")]
        {
            counter!(
                "circuitbreaker_transitions_total",
                "circuitbreaker" => config.name.clone(),
                "from" => from_state.as_str(),
                "to" => state.as_str()
            )
            .increment(1);

            for candidate in [CircuitState::Closed, CircuitState::Open, CircuitState::HalfOpen] {
                gauge!("circuitbreaker_state", "circuitbreaker" => config.name.clone(), "state" => candidate.as_str())
                    .set(if candidate == state { 1.0 } else { 0.0 });
            }
        }

        self.state = state;
        self.state_atomic.store(state as u8, Ordering::Release);
        self.last_transition = now;
        self.epoch += 1;
        self.window.clear();
        self.half_open_admitted = 0;
        self.half_open_successes = 0;
    }

    fn evaluate_window(&mut self, config: &CircuitBreakerConfig, now: Instant) {
        if self.window.len() < config.minimum_number_of_calls {
            return;
        }

        let failure_rate = self.window.failure_rate();
        let slow_rate = self.window.slow_rate();

        if failure_rate >= config.failure_rate_threshold
            || slow_rate >= config.slow_call_rate_threshold
        {
            self.transition_to(CircuitState::Open, config, now);
        }
    }
}
