//! Configuration for the time limiter.

use crate::events::TimeLimiterEvent;
use callgate_core::events::{EventListeners, FnListener};
use std::time::Duration;

/// Configuration for the time limiter.
#[derive(Debug, Clone)]
pub struct TimeLimiterConfig {
    pub(crate) timeout_duration: Duration,
    pub(crate) cancel_running_call: bool,
    pub(crate) event_listeners: EventListeners<TimeLimiterEvent>,
    pub(crate) name: String,
}

impl TimeLimiterConfig {
    /// Creates a new configuration builder.
    pub fn builder() -> TimeLimiterConfigBuilder {
        TimeLimiterConfigBuilder::new()
    }

    /// Deadline applied to each call.
    pub fn timeout_duration(&self) -> Duration {
        self.timeout_duration
    }

    /// Whether a timed-out call is dropped instead of left running.
    pub fn cancel_running_call(&self) -> bool {
        self.cancel_running_call
    }

    /// Name of this time limiter instance.
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Builder for configuring and constructing a time limiter.
pub struct TimeLimiterConfigBuilder {
    timeout_duration: Duration,
    cancel_running_call: bool,
    event_listeners: EventListeners<TimeLimiterEvent>,
    name: String,
}

impl TimeLimiterConfigBuilder {
    /// Creates a new builder with default values.
    pub fn new() -> Self {
        Self {
            timeout_duration: Duration::from_secs(5),
            cancel_running_call: false,
            event_listeners: EventListeners::new(),
            name: String::from("<unnamed>"),
        }
    }

    /// Sets the timeout duration.
    ///
    /// Default: 5 seconds
    pub fn timeout_duration(mut self, duration: Duration) -> Self {
        self.timeout_duration = duration;
        self
    }

    /// Sets whether a call that exceeds its deadline is cancelled.
    ///
    /// When true, the call future is dropped on timeout. Work it has not yet
    /// reached never happens, but side effects already under way may still
    /// complete. When false, the call runs as its own task and keeps going in
    /// the background; its result is discarded.
    ///
    /// Default: false
    pub fn cancel_running_call(mut self, cancel: bool) -> Self {
        self.cancel_running_call = cancel;
        self
    }

    /// Sets the name of this time limiter instance for observability.
    ///
    /// Default: `"<unnamed>"`
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Registers a callback invoked when a call succeeds within the deadline.
    pub fn on_success<F>(mut self, f: F) -> Self
    where
        F: Fn(Duration) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let TimeLimiterEvent::Success { duration, .. } = event {
                f(*duration);
            }
        }));
        self
    }

    /// Registers a callback invoked when a call fails within the deadline.
    pub fn on_error<F>(mut self, f: F) -> Self
    where
        F: Fn(Duration) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let TimeLimiterEvent::Error { duration, .. } = event {
                f(*duration);
            }
        }));
        self
    }

    /// Registers a callback invoked with the exceeded deadline when a call
    /// times out.
    pub fn on_timeout<F>(mut self, f: F) -> Self
    where
        F: Fn(Duration) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let TimeLimiterEvent::Timeout {
                timeout_duration, ..
            } = event
            {
                f(*timeout_duration);
            }
        }));
        self
    }

    /// Builds the time limiter configuration.
    ///
    /// # Panics
    ///
    /// Panics if the timeout duration is zero.
    pub fn build(self) -> TimeLimiterConfig {
        assert!(
            !self.timeout_duration.is_zero(),
            "timeout_duration must be greater than zero"
        );
        TimeLimiterConfig {
            timeout_duration: self.timeout_duration,
            cancel_running_call: self.cancel_running_call,
            event_listeners: self.event_listeners,
            name: self.name,
        }
    }
}

impl Default for TimeLimiterConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
