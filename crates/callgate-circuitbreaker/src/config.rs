use crate::events::CircuitBreakerEvent;
use crate::window::SlidingWindow;
use crate::CircuitState;
use callgate_core::{CallOutcome, EventListeners, FnListener};
use std::time::Duration;

/// Configuration for the circuit breaker.
///
/// Thresholds are percentages in `(0, 100]`.
#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    pub(crate) name: String,
    pub(crate) failure_rate_threshold: f64,
    pub(crate) slow_call_rate_threshold: f64,
    pub(crate) slow_call_duration_threshold: Option<Duration>,
    pub(crate) sliding_window_size: usize,
    pub(crate) minimum_number_of_calls: usize,
    pub(crate) wait_duration_in_open: Duration,
    pub(crate) permitted_calls_in_half_open: usize,
    pub(crate) event_listeners: EventListeners<CircuitBreakerEvent>,
}

impl CircuitBreakerConfig {
    /// Creates a new configuration builder.
    pub fn builder() -> CircuitBreakerConfigBuilder {
        CircuitBreakerConfigBuilder::new()
    }

    /// Breaker name, used in events, logs and metrics labels.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Failure rate (percent) at or above which the circuit opens.
    pub fn failure_rate_threshold(&self) -> f64 {
        self.failure_rate_threshold
    }

    /// Slow-call rate (percent) at or above which the circuit opens.
    pub fn slow_call_rate_threshold(&self) -> f64 {
        self.slow_call_rate_threshold
    }

    /// Duration at or above which a successful call counts as slow.
    pub fn slow_call_duration_threshold(&self) -> Option<Duration> {
        self.slow_call_duration_threshold
    }

    /// Number of outcomes kept in the sliding window.
    pub fn sliding_window_size(&self) -> usize {
        self.sliding_window_size
    }

    /// Outcomes required in the window before rates are evaluated.
    pub fn minimum_number_of_calls(&self) -> usize {
        self.minimum_number_of_calls
    }

    /// Time spent open before trial calls are admitted.
    pub fn wait_duration_in_open(&self) -> Duration {
        self.wait_duration_in_open
    }

    /// Trial calls admitted while half-open.
    pub fn permitted_calls_in_half_open(&self) -> usize {
        self.permitted_calls_in_half_open
    }
}

/// Builder for [`CircuitBreakerConfig`].
pub struct CircuitBreakerConfigBuilder {
    name: String,
    failure_rate_threshold: f64,
    slow_call_rate_threshold: f64,
    slow_call_duration_threshold: Option<Duration>,
    sliding_window_size: usize,
    minimum_number_of_calls: Option<usize>,
    wait_duration_in_open: Duration,
    permitted_calls_in_half_open: usize,
    event_listeners: EventListeners<CircuitBreakerEvent>,
}

impl CircuitBreakerConfigBuilder {
    /// Creates a new builder with default values.
    pub fn new() -> Self {
        Self {
            name: String::from("<unnamed>"),
            failure_rate_threshold: 50.0,
            slow_call_rate_threshold: 100.0,
            slow_call_duration_threshold: None,
            sliding_window_size: 100,
            minimum_number_of_calls: None,
            wait_duration_in_open: Duration::from_secs(30),
            permitted_calls_in_half_open: 1,
            event_listeners: EventListeners::new(),
        }
    }

    /// Give this breaker a human-readable name for observability.
    ///
    /// Default: `<unnamed>`
    pub fn name<N: Into<String>>(mut self, n: N) -> Self {
        self.name = n.into();
        self
    }

    /// Sets the failure rate threshold, in percent, at which the circuit opens.
    ///
    /// Timeouts count as failures.
    ///
    /// Default: 50
    pub fn failure_rate_threshold(mut self, percent: f64) -> Self {
        self.failure_rate_threshold = percent;
        self
    }

    /// Sets the slow-call rate threshold, in percent, at which the circuit opens.
    ///
    /// Default: 100
    pub fn slow_call_rate_threshold(mut self, percent: f64) -> Self {
        self.slow_call_rate_threshold = percent;
        self
    }

    /// Sets the duration at or above which a successful call counts as slow.
    ///
    /// Default: None (slow call detection disabled)
    pub fn slow_call_duration_threshold(mut self, duration: Duration) -> Self {
        self.slow_call_duration_threshold = Some(duration);
        self
    }

    /// Sets the number of outcomes kept in the sliding window.
    ///
    /// Default: 100
    pub fn sliding_window_size(mut self, size: usize) -> Self {
        self.sliding_window_size = size;
        self
    }

    /// Sets the number of outcomes required before rates are evaluated.
    ///
    /// Default: same as `sliding_window_size`
    pub fn minimum_number_of_calls(mut self, n: usize) -> Self {
        self.minimum_number_of_calls = Some(n);
        self
    }

    /// Sets how long the circuit stays open before admitting trial calls.
    ///
    /// Default: 30 seconds
    pub fn wait_duration_in_open(mut self, duration: Duration) -> Self {
        self.wait_duration_in_open = duration;
        self
    }

    /// Sets the number of trial calls admitted while half-open.
    ///
    /// All of them must succeed for the circuit to close.
    ///
    /// Default: 1
    pub fn permitted_calls_in_half_open(mut self, n: usize) -> Self {
        self.permitted_calls_in_half_open = n;
        self
    }

    /// Registers a callback invoked on every state transition with the
    /// `from` and `to` states.
    ///
    /// Listeners run while the breaker's lock is held and must not call
    /// back into the same breaker.
    ///
    /// # Example
    /// ```rust
    /// use callgate_circuitbreaker::{CircuitBreakerConfig, CircuitState};
    ///
    /// let config = CircuitBreakerConfig::builder()
    ///     .name("payments")
    ///     .on_state_transition(|from, to| {
    ///         if to == CircuitState::Open {
    ///             eprintln!("payments degraded ({from:?} -> {to:?})");
    ///         }
    ///     })
    ///     .build();
    /// ```
    pub fn on_state_transition<F>(mut self, f: F) -> Self
    where
        F: Fn(CircuitState, CircuitState) + Send + Sync + 'static,
    {
        self.event_listeners
            .add(FnListener::new(move |event: &CircuitBreakerEvent| {
                if let CircuitBreakerEvent::StateTransition {
                    from_state,
                    to_state,
                    ..
                } = event
                {
                    f(*from_state, *to_state);
                }
            }));
        self
    }

    /// Registers a callback invoked when a call is admitted.
    pub fn on_call_permitted<F>(mut self, f: F) -> Self
    where
        F: Fn(CircuitState) + Send + Sync + 'static,
    {
        self.event_listeners
            .add(FnListener::new(move |event: &CircuitBreakerEvent| {
                if let CircuitBreakerEvent::CallPermitted { state, .. } = event {
                    f(*state);
                }
            }));
        self
    }

    /// Registers a callback invoked when a call is rejected, with the state
    /// that rejected it.
    pub fn on_call_rejected<F>(mut self, f: F) -> Self
    where
        F: Fn(CircuitState) + Send + Sync + 'static,
    {
        self.event_listeners
            .add(FnListener::new(move |event: &CircuitBreakerEvent| {
                if let CircuitBreakerEvent::CallRejected { state, .. } = event {
                    f(*state);
                }
            }));
        self
    }

    /// Registers a callback invoked for every recorded outcome.
    pub fn on_outcome<F>(mut self, f: F) -> Self
    where
        F: Fn(CallOutcome, CircuitState) + Send + Sync + 'static,
    {
        self.event_listeners
            .add(FnListener::new(move |event: &CircuitBreakerEvent| {
                if let CircuitBreakerEvent::OutcomeRecorded { outcome, state, .. } = event {
                    f(*outcome, *state);
                }
            }));
        self
    }

    /// Registers a callback invoked when a slow call is detected.
    ///
    /// Only fires when `slow_call_duration_threshold` is configured.
    pub fn on_slow_call<F>(mut self, f: F) -> Self
    where
        F: Fn(Duration) + Send + Sync + 'static,
    {
        self.event_listeners
            .add(FnListener::new(move |event: &CircuitBreakerEvent| {
                if let CircuitBreakerEvent::SlowCallDetected { duration, .. } = event {
                    f(*duration);
                }
            }));
        self
    }

    /// Builds the configuration.
    ///
    /// # Panics
    ///
    /// Panics if the window size, minimum calls or half-open budget is zero,
    /// if the window size exceeds [`SlidingWindow::MAX_CAPACITY`], if the
    /// minimum exceeds the window size, or if a threshold lies outside
    /// `(0, 100]`.
    pub fn build(self) -> CircuitBreakerConfig {
        let minimum_number_of_calls = self
            .minimum_number_of_calls
            .unwrap_or(self.sliding_window_size);

        assert!(
            self.sliding_window_size > 0,
            "sliding_window_size must be greater than zero"
        );
        assert!(
            self.sliding_window_size <= SlidingWindow::MAX_CAPACITY,
            "sliding_window_size must not exceed {}",
            SlidingWindow::MAX_CAPACITY
        );
        assert!(
            minimum_number_of_calls > 0 && minimum_number_of_calls <= self.sliding_window_size,
            "minimum_number_of_calls must be between 1 and sliding_window_size"
        );
        assert!(
            valid_percent(self.failure_rate_threshold),
            "failure_rate_threshold must be in (0, 100]"
        );
        assert!(
            valid_percent(self.slow_call_rate_threshold),
            "slow_call_rate_threshold must be in (0, 100]"
        );
        assert!(
            self.permitted_calls_in_half_open > 0,
            "permitted_calls_in_half_open must be greater than zero"
        );

        CircuitBreakerConfig {
            name: self.name,
            failure_rate_threshold: self.failure_rate_threshold,
            slow_call_rate_threshold: self.slow_call_rate_threshold,
            slow_call_duration_threshold: self.slow_call_duration_threshold,
            sliding_window_size: self.sliding_window_size,
            minimum_number_of_calls,
            wait_duration_in_open: self.wait_duration_in_open,
            permitted_calls_in_half_open: self.permitted_calls_in_half_open,
            event_listeners: self.event_listeners,
        }
    }
}

fn valid_percent(value: f64) -> bool {
    value > 0.0 && value <= 100.0
}

impl Default for CircuitBreakerConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
