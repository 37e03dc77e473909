//! Circuit breaker for outbound calls.
//!
//! A circuit breaker stops calling a dependency that keeps failing. It
//! watches the outcomes of recent calls in a count-based sliding window and
//! trips open when the failure rate or the slow-call rate crosses its
//! threshold.
//!
//! ## States
//! - **Closed**: calls pass through and their outcomes are recorded
//! - **Open**: calls are rejected immediately until the open wait elapses
//! - **Half-Open**: a limited number of trial calls probe for recovery
//!
//! ## Usage
//!
//! [`CircuitBreaker`] is a cheaply cloneable handle. Every clone shares one
//! state machine, so all callers of the same dependency see the same circuit.
//!
//! ```rust
//! use callgate_circuitbreaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState};
//! use callgate_core::CallOutcome;
//!
//! # async fn example() {
//! let breaker = CircuitBreaker::new(
//!     CircuitBreakerConfig::builder()
//!         .name("inventory")
//!         .sliding_window_size(10)
//!         .minimum_number_of_calls(5)
//!         .failure_rate_threshold(50.0)
//!         .build(),
//! );
//!
//! if let Some(permit) = breaker.try_acquire() {
//!     let result: Result<u32, ()> = Ok(7);
//!     permit.complete(result.is_ok());
//! }
//! assert_eq!(breaker.state(), CircuitState::Closed);
//! # }
//! ```
//!
//! ### As a Tower layer
//!
//! ```rust
//! use callgate_circuitbreaker::{CircuitBreaker, CircuitBreakerConfig, CircuitBreakerLayer};
//! use tower::{ServiceBuilder, service_fn};
//!
//! let breaker = CircuitBreaker::new(CircuitBreakerConfig::builder().name("search").build());
//! let service = ServiceBuilder::new()
//!     .layer(CircuitBreakerLayer::new(breaker.clone()))
//!     .service(service_fn(|req: String| async move { Ok::<_, std::io::Error>(req) }));
//! ```
//!
//! ## Feature Flags
//! - `metrics`: enables metrics collection using the `metrics` crate
//! - `tracing`: enables logging and tracing using the `tracing` crate
//! - `serde`: enables serialization of [`CircuitState`] and snapshots

use crate::circuit::Circuit;
use callgate_core::{CallOutcome, Clock, SharedClock, TokioClock};
#[cfg(feature = "metrics")]
use metrics::{describe_counter, describe_gauge, describe_histogram};
use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
#[cfg(feature = "metrics")]
use std::sync::Once;
use std::time::Duration;
use tokio::time::Instant;

pub use circuit::{CircuitSnapshot, CircuitState};
pub use config::{CircuitBreakerConfig, CircuitBreakerConfigBuilder};
pub use error::CircuitBreakerError;
pub use events::CircuitBreakerEvent;
pub use layer::{CircuitBreakerLayer, CircuitBreakerService};
pub use window::{SlidingWindow, WindowSnapshot};

mod circuit;
mod config;
mod error;
mod events;
mod layer;
mod window;

#[cfg(feature = "metrics")]
static METRICS_INIT: Once = Once::new();

#[cfg(feature = "metrics")]
fn describe_metrics() {
    METRICS_INIT.call_once(|| {
        describe_counter!(
            "circuitbreaker_calls_total",
            "Total number of calls through the circuit breaker"
        );
        describe_counter!(
            "circuitbreaker_transitions_total",
            "Total number of circuit breaker state transitions"
        );
        describe_counter!(
            "circuitbreaker_slow_calls_total",
            "Total number of slow calls detected"
        );
        describe_gauge!(
            "circuitbreaker_state",
            "Current state of the circuit breaker"
        );
        describe_histogram!(
            "circuitbreaker_call_duration_seconds",
            "Duration of calls through the circuit breaker"
        );
    });
}

struct Shared {
    circuit: Mutex<Circuit>,
    state_atomic: Arc<AtomicU8>,
    config: CircuitBreakerConfig,
    clock: SharedClock,
}

/// Shared handle to one circuit.
///
/// All state and window mutation is serialized by a single mutex. The
/// current state is mirrored into an atomic, so [`CircuitBreaker::state`]
/// never takes the lock.
#[derive(Clone)]
pub struct CircuitBreaker {
    shared: Arc<Shared>,
}

impl CircuitBreaker {
    /// Creates a breaker driven by tokio's clock.
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self::with_clock(config, Arc::new(TokioClock))
    }

    /// Creates a breaker driven by `clock`.
    pub fn with_clock(config: CircuitBreakerConfig, clock: SharedClock) -> Self {
        #[cfg(feature = "metrics")]
        describe_metrics();

        let state_atomic = Arc::new(AtomicU8::new(CircuitState::Closed as u8));
        let circuit = Circuit::new(&config, Arc::clone(&state_atomic), clock.now());
        Self {
            shared: Arc::new(Shared {
                circuit: Mutex::new(circuit),
                state_atomic,
                config,
                clock,
            }),
        }
    }

    /// Locks the circuit.
    ///
    /// # Panics
    ///
    /// Panics if the lock is poisoned. A poisoned lock means an earlier
    /// panic interrupted a state mutation, and the circuit can no longer be
    /// trusted.
    fn lock(&self) -> MutexGuard<'_, Circuit> {
        match self.shared.circuit.lock() {
            Ok(guard) => guard,
            Err(_) => panic!(
                "circuit breaker '{}' state lock poisoned",
                self.shared.config.name
            ),
        }
    }

    /// Asks the circuit to admit one call.
    ///
    /// Returns `None` when the circuit is open or the half-open trial budget
    /// is used up. The returned permit must be used to report the call's
    /// outcome; dropping it unreported frees its trial slot.
    pub fn try_acquire(&self) -> Option<CallPermit> {
        let now = self.shared.clock.now();
        let epoch = self.lock().try_acquire(&self.shared.config, now)?;

        #[cfg(feature = "tracing")]
        tracing::trace!(breaker = %self.shared.config.name, epoch, "circuit breaker permitted call");

        Some(CallPermit {
            breaker: self.clone(),
            epoch,
            admitted_at: now,
            reported: false,
        })
    }

    /// Classifies a finished call against this breaker's slow-call threshold.
    pub fn classify(&self, succeeded: bool, elapsed: Duration) -> CallOutcome {
        CallOutcome::classify(
            succeeded,
            elapsed,
            self.shared.config.slow_call_duration_threshold,
        )
    }

    /// Returns the current state without taking the lock.
    pub fn state(&self) -> CircuitState {
        CircuitState::from_u8(self.shared.state_atomic.load(Ordering::Acquire))
    }

    /// Returns whether the circuit is currently open.
    pub fn is_open(&self) -> bool {
        self.state() == CircuitState::Open
    }

    /// Returns a consistent snapshot of the circuit.
    pub fn snapshot(&self) -> CircuitSnapshot {
        let now = self.shared.clock.now();
        self.lock().snapshot(&self.shared.config, now)
    }

    /// Forces the circuit open, restarting the open wait.
    pub fn force_open(&self) {
        let now = self.shared.clock.now();
        self.lock().force_open(&self.shared.config, now);
    }

    /// Forces the circuit closed.
    pub fn force_closed(&self) {
        let now = self.shared.clock.now();
        self.lock().force_closed(&self.shared.config, now);
    }

    /// Closes the circuit and clears the window and rejection count.
    ///
    /// Calls admitted before the reset can no longer report into the circuit.
    pub fn reset(&self) {
        let now = self.shared.clock.now();
        self.lock().reset(&self.shared.config, now);
    }

    /// Breaker name.
    pub fn name(&self) -> &str {
        &self.shared.config.name
    }

    /// Breaker configuration.
    pub fn config(&self) -> &CircuitBreakerConfig {
        &self.shared.config
    }
}

impl fmt::Debug for CircuitBreaker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CircuitBreaker")
            .field("name", &self.shared.config.name)
            .field("state", &self.state())
            .finish()
    }
}

/// Admission token for one call.
///
/// Reports exactly one outcome. A permit dropped without reporting (for
/// example because the call's future was cancelled) hands its half-open
/// trial slot back to the circuit.
#[must_use = "a permit should report the call's outcome"]
pub struct CallPermit {
    breaker: CircuitBreaker,
    epoch: u64,
    admitted_at: Instant,
    reported: bool,
}

impl CallPermit {
    /// Records `outcome` for this call.
    ///
    /// Returns `false` if the circuit changed state since the call was
    /// admitted; such outcomes are discarded.
    pub fn record(mut self, outcome: CallOutcome) -> bool {
        self.reported = true;
        let shared = &self.breaker.shared;
        let now = shared.clock.now();
        let elapsed = now.saturating_duration_since(self.admitted_at);
        self.breaker
            .lock()
            .record(&shared.config, self.epoch, outcome, elapsed, now)
    }

    /// Classifies the call by its result and elapsed time, then records it.
    pub fn complete(self, succeeded: bool) -> CallOutcome {
        let outcome = self.breaker.classify(succeeded, self.elapsed());
        self.record(outcome);
        outcome
    }

    /// Time since the call was admitted.
    pub fn elapsed(&self) -> Duration {
        self.breaker
            .shared
            .clock
            .now()
            .saturating_duration_since(self.admitted_at)
    }
}

impl Drop for CallPermit {
    fn drop(&mut self) {
        if self.reported {
            return;
        }
        // never panic in drop
        if let Ok(mut circuit) = self.breaker.shared.circuit.lock() {
            circuit.release_trial(self.epoch);
        }
    }
}

impl fmt::Debug for CallPermit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallPermit")
            .field("breaker", &self.breaker.name())
            .field("epoch", &self.epoch)
            .finish()
    }
}
