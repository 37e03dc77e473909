//! Tower layer for the time limiter.

use crate::config::TimeLimiterConfig;
use crate::limiter::TimeLimiter;
use crate::service::TimeLimiterService;
use tower::layer::Layer;

/// A Tower layer that applies a deadline to every call of a service.
#[derive(Clone, Debug)]
pub struct TimeLimiterLayer {
    limiter: TimeLimiter,
}

impl TimeLimiterLayer {
    /// Creates a layer around an existing time limiter.
    pub fn new(limiter: TimeLimiter) -> Self {
        Self { limiter }
    }

    /// Creates a new builder for configuring a time limiter layer.
    ///
    /// # Examples
    ///
    /// ```
    /// use callgate_timelimiter::TimeLimiterLayer;
    /// use std::time::Duration;
    ///
    /// let layer = TimeLimiterLayer::builder()
    ///     .timeout_duration(Duration::from_secs(30))
    ///     .cancel_running_call(true)
    ///     .build()
    ///     .layer();
    /// assert_eq!(layer.limiter().config().timeout_duration(), Duration::from_secs(30));
    /// ```
    pub fn builder() -> crate::TimeLimiterConfigBuilder {
        TimeLimiterConfig::builder()
    }

    /// The time limiter applied by this layer.
    pub fn limiter(&self) -> &TimeLimiter {
        &self.limiter
    }
}

impl From<TimeLimiterConfig> for TimeLimiterLayer {
    fn from(config: TimeLimiterConfig) -> Self {
        Self::new(TimeLimiter::new(config))
    }
}

impl TimeLimiterConfig {
    /// Creates a layer from this configuration.
    pub fn layer(self) -> TimeLimiterLayer {
        TimeLimiterLayer::from(self)
    }
}

impl<S> Layer<S> for TimeLimiterLayer {
    type Service = TimeLimiterService<S>;

    fn layer(&self, service: S) -> Self::Service {
        TimeLimiterService::new(service, self.limiter.clone())
    }
}
