use crate::config::RetryConfig;
use crate::error::RetryError;
use crate::events::RetryEvent;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

#[cfg(feature = "metrics")]
use metrics::{counter, histogram};

#[cfg(feature = "tracing")]
use tracing::{debug, warn};

/// Determines whether an error should be retried.
pub type RetryPredicate<E> = Arc<dyn Fn(&E) -> bool + Send + Sync>;

/// Per-attempt view of a retried execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryContext {
    /// Current attempt, starting at 1.
    pub attempt: usize,
    /// Maximum number of attempts.
    pub max_attempts: usize,
    /// Delay before the next attempt if this one fails; `None` on the last
    /// attempt.
    pub next_delay: Option<Duration>,
}

impl RetryContext {
    /// Returns true if no retry follows this attempt.
    pub fn is_last_attempt(&self) -> bool {
        self.attempt >= self.max_attempts
    }
}

/// Runs operations with bounded retries and backoff.
///
/// Cloning is cheap; clones share configuration and listeners.
///
/// ```rust
/// use callgate_retry::{RetryConfig, RetryPolicy};
/// use std::time::Duration;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let policy = RetryPolicy::new(
///     RetryConfig::builder()
///         .max_attempts(3)
///         .fixed_backoff(Duration::from_millis(1))
///         .build(),
/// );
///
/// let result = policy
///     .execute(
///         |ctx| async move {
///             if ctx.attempt < 3 { Err("flaky") } else { Ok(ctx.attempt) }
///         },
///         |_err| true,
///     )
///     .await;
/// assert_eq!(result, Ok(3));
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    config: Arc<RetryConfig>,
}

impl RetryPolicy {
    /// Creates a policy from a configuration.
    pub fn new(config: RetryConfig) -> Self {
        #[cfg(feature = "metrics")]
        crate::describe_metrics();

        Self {
            config: Arc::new(config),
        }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Name of this policy.
    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// Maximum number of attempts, including the first.
    pub fn max_attempts(&self) -> usize {
        self.config.max_attempts
    }

    /// Delay after failed attempt `attempt` (1-based), or `None` when no
    /// retry follows it.
    pub fn delay_after(&self, attempt: usize) -> Option<Duration> {
        if attempt == 0 || attempt >= self.config.max_attempts {
            return None;
        }
        Some(self.config.interval_fn.next_interval(attempt - 1))
    }

    /// Builds the context handed to attempt `attempt`.
    pub fn context(&self, attempt: usize) -> RetryContext {
        RetryContext {
            attempt,
            max_attempts: self.config.max_attempts,
            next_delay: self.delay_after(attempt),
        }
    }

    /// Runs `op` until it succeeds, fails with an error `should_retry`
    /// declines, or the attempts run out.
    ///
    /// Backoff sleeps are tokio sleeps; dropping the returned future stops
    /// further attempts.
    pub async fn execute<T, E, F, Fut, P>(
        &self,
        mut op: F,
        should_retry: P,
    ) -> Result<T, RetryError<E>>
    where
        F: FnMut(RetryContext) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        P: Fn(&E) -> bool,
    {
        let mut attempt = 1;
        loop {
            let ctx = self.context(attempt);
            match op(ctx).await {
                Ok(value) => {
                    self.record_success(attempt);
                    return Ok(value);
                }
                Err(error) if !should_retry(&error) => {
                    self.record_ignored(attempt);
                    return Err(RetryError::Aborted {
                        name: self.config.name.clone(),
                        attempts: attempt,
                        error,
                    });
                }
                Err(error) => match ctx.next_delay {
                    None => {
                        self.record_exhausted(attempt);
                        return Err(RetryError::Exhausted {
                            name: self.config.name.clone(),
                            attempts: attempt,
                            last: error,
                        });
                    }
                    Some(delay) => {
                        self.record_retry(attempt, delay);
                        if !delay.is_zero() {
                            tokio::time::sleep(delay).await;
                        }
                        attempt += 1;
                    }
                },
            }
        }
    }

    fn record_success(&self, attempts: usize) {
        self.config.event_listeners.emit(&RetryEvent::Success {
            pattern_name: self.config.name.clone(),
            timestamp: Instant::now(),
            attempts,
        });

        #[cfg(feature = "metrics")]
        self.record_call_metrics("success", attempts);

        #[cfg(feature = "tracing")]
        {
            if attempts > 1 {
                debug!(retry = %self.config.name, attempts, "succeeded after retries");
            }
        }
    }

    fn record_ignored(&self, attempts: usize) {
        self.config.event_listeners.emit(&RetryEvent::IgnoredError {
            pattern_name: self.config.name.clone(),
            timestamp: Instant::now(),
            attempts,
        });

        #[cfg(feature = "metrics")]
        self.record_call_metrics("aborted", attempts);

        #[cfg(feature = "tracing")]
        debug!(retry = %self.config.name, attempts, "error not retryable");
    }

    fn record_exhausted(&self, attempts: usize) {
        self.config.event_listeners.emit(&RetryEvent::Exhausted {
            pattern_name: self.config.name.clone(),
            timestamp: Instant::now(),
            attempts,
        });

        #[cfg(feature = "metrics")]
        self.record_call_metrics("exhausted", attempts);

        #[cfg(feature = "tracing")]
        warn!(retry = %self.config.name, attempts, "retries exhausted");
    }

    fn record_retry(&self, attempt: usize, delay: Duration) {
        self.config.event_listeners.emit(&RetryEvent::Retry {
            pattern_name: self.config.name.clone(),
            timestamp: Instant::now(),
            attempt,
            delay,
        });

        #[cfg(feature = "tracing")]
        debug!(
            retry = %self.config.name,
            attempt,
            delay_ms = delay.as_millis() as u64,
            "attempt failed, backing off"
        );
    }

    #[cfg(feature = "metrics")]
    fn record_call_metrics(&self, result: &'static str, attempts: usize) {
        counter!("retry_calls_total", "retry" => self.config.name.clone(), "result" => result)
            .increment(1);
        counter!("retry_attempts_total", "retry" => self.config.name.clone())
            .increment(attempts as u64);
        histogram!("retry_attempts", "retry" => self.config.name.clone()).record(attempts as f64);
    }
}
