use crate::config::TimeLimiterConfig;
use crate::error::TimeLimiterError;
use crate::events::TimeLimiterEvent;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{timeout, Instant};

#[cfg(feature = "metrics")]
use metrics::{counter, histogram};

#[cfg(feature = "tracing")]
use tracing::{debug, warn};

/// Races calls against a deadline.
///
/// Cloning is cheap; clones share the configuration and listeners.
#[derive(Debug, Clone)]
pub struct TimeLimiter {
    config: Arc<TimeLimiterConfig>,
}

impl TimeLimiter {
    /// Creates a time limiter from the given configuration.
    pub fn new(config: TimeLimiterConfig) -> Self {
        #[cfg(feature = "metrics")]
        crate::describe_metrics();

        Self {
            config: Arc::new(config),
        }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &TimeLimiterConfig {
        &self.config
    }

    /// Returns the name of this time limiter.
    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// Runs `call` against the configured deadline.
    pub async fn run<F, T, E>(&self, call: F) -> Result<T, TimeLimiterError<E>>
    where
        F: Future<Output = Result<T, E>> + Send + 'static,
        T: Send + 'static,
        E: Send + 'static,
    {
        self.run_with_timeout(call, self.config.timeout_duration)
            .await
    }

    /// Runs `call` against an explicit deadline.
    ///
    /// Unless the limiter cancels running calls, `call` is spawned as its own
    /// task and outlives a timeout. A panic inside the call resumes on the
    /// waiting task.
    pub async fn run_with_timeout<F, T, E>(
        &self,
        call: F,
        limit: Duration,
    ) -> Result<T, TimeLimiterError<E>>
    where
        F: Future<Output = Result<T, E>> + Send + 'static,
        T: Send + 'static,
        E: Send + 'static,
    {
        let start = Instant::now();

        let finished = if self.config.cancel_running_call {
            timeout(limit, call).await.ok()
        } else {
            let mut task = tokio::spawn(call);
            match timeout(limit, &mut task).await {
                Ok(Ok(result)) => Some(result),
                Ok(Err(join_err)) => {
                    if join_err.is_panic() {
                        std::panic::resume_unwind(join_err.into_panic());
                    }
                    // task was cancelled by runtime shutdown
                    None
                }
                // dropping the handle detaches the task
                Err(_) => None,
            }
        };

        let duration = start.elapsed();
        match finished {
            Some(Ok(value)) => {
                self.record_success(duration);
                Ok(value)
            }
            Some(Err(err)) => {
                self.record_error(duration);
                Err(TimeLimiterError::Inner(err))
            }
            None => {
                self.record_timeout(limit);
                Err(TimeLimiterError::Timeout { after: limit })
            }
        }
    }

    fn record_success(&self, duration: Duration) {
        self.config.event_listeners.emit(&TimeLimiterEvent::Success {
            pattern_name: self.config.name.clone(),
            timestamp: Instant::now(),
            duration,
        });

        #[cfg(feature = "metrics")]
        {
            counter!("timelimiter_calls_total", "timelimiter" => self.config.name.clone(), "result" => "success").increment(1);
            histogram!("timelimiter_call_duration_seconds", "timelimiter" => self.config.name.clone())
                .record(duration.as_secs_f64());
        }

        #[cfg(feature = "tracing")]
        debug!(
            timelimiter = %self.config.name,
            duration_ms = duration.as_millis() as u64,
            "call succeeded within timeout"
        );
    }

    fn record_error(&self, duration: Duration) {
        self.config.event_listeners.emit(&TimeLimiterEvent::Error {
            pattern_name: self.config.name.clone(),
            timestamp: Instant::now(),
            duration,
        });

        #[cfg(feature = "metrics")]
        {
            counter!("timelimiter_calls_total", "timelimiter" => self.config.name.clone(), "result" => "error").increment(1);
            histogram!("timelimiter_call_duration_seconds", "timelimiter" => self.config.name.clone())
                .record(duration.as_secs_f64());
        }

        #[cfg(feature = "tracing")]
        debug!(
            timelimiter = %self.config.name,
            duration_ms = duration.as_millis() as u64,
            "call failed within timeout"
        );
    }

    fn record_timeout(&self, limit: Duration) {
        self.config.event_listeners.emit(&TimeLimiterEvent::Timeout {
            pattern_name: self.config.name.clone(),
            timestamp: Instant::now(),
            timeout_duration: limit,
        });

        #[cfg(feature = "metrics")]
        counter!("timelimiter_calls_total", "timelimiter" => self.config.name.clone(), "result" => "timeout").increment(1);

        #[cfg(feature = "tracing")]
        warn!(
            timelimiter = %self.config.name,
            timeout_ms = limit.as_millis() as u64,
            cancelled = self.config.cancel_running_call,
            "call timed out"
        );
    }
}
