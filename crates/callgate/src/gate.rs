//! The per-resource call pipeline.

use crate::config::GateConfig;
use crate::error::ConfigError;
use crate::state::GateState;
use callgate_bulkhead::Bulkhead;
use callgate_circuitbreaker::CircuitBreaker;
use callgate_core::{AttemptFailure, CallOutcome, GateError, SharedClock, TokioClock};
use callgate_retry::{RetryError, RetryPolicy};
use callgate_timelimiter::{TimeLimiter, TimeLimiterError};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, debug_span, warn, Instrument};

/// Why one attempt inside the retry loop did not produce a value.
enum AttemptError<E> {
    /// The breaker refused the attempt.
    Rejected,
    /// The attempt ran and failed.
    Failed(AttemptFailure<E>),
}

/// Bulkhead, circuit breaker, timeout guard and retry policy for one
/// protected resource.
///
/// Each invocation runs the fixed pipeline:
///
/// 1. acquire a bulkhead permit, failing fast with
///    [`GateError::BulkheadRejected`];
/// 2. ask the breaker to admit the call, failing with
///    [`GateError::CircuitOpen`];
/// 3. run attempts through the timeout guard, recording each outcome in
///    the breaker, until one succeeds or the retry policy gives up. Every
///    retry is re-admitted by the breaker first.
///
/// The bulkhead permit is released exactly once on every exit path,
/// including when the invocation future is dropped.
pub struct ResourceGate {
    name: String,
    config: GateConfig,
    bulkhead: Bulkhead,
    breaker: CircuitBreaker,
    limiter: TimeLimiter,
    retry: RetryPolicy,
}

impl ResourceGate {
    /// Builds a gate for `name` from validated settings.
    pub fn new(name: impl Into<String>, config: GateConfig) -> Result<Self, ConfigError> {
        Self::with_clock(name, config, Arc::new(TokioClock))
    }

    /// Builds a gate whose breaker reads time from `clock`.
    pub fn with_clock(
        name: impl Into<String>,
        config: GateConfig,
        clock: SharedClock,
    ) -> Result<Self, ConfigError> {
        let name = name.into();
        config.validate().map_err(|reason| ConfigError::Invalid {
            resource: name.clone(),
            reason,
        })?;

        Ok(Self {
            bulkhead: Bulkhead::new(config.bulkhead_config(&name)),
            breaker: CircuitBreaker::with_clock(config.circuit_breaker_config(&name), clock),
            limiter: TimeLimiter::new(config.time_limiter_config(&name)),
            retry: RetryPolicy::new(config.retry_config(&name)),
            name,
            config,
        })
    }

    /// Assembles a gate from components built elsewhere, for example with
    /// event listeners attached.
    ///
    /// `config` is kept for reporting only; the components' own settings
    /// apply.
    pub fn from_parts(
        name: impl Into<String>,
        config: GateConfig,
        bulkhead: Bulkhead,
        breaker: CircuitBreaker,
        limiter: TimeLimiter,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            name: name.into(),
            config,
            bulkhead,
            breaker,
            limiter,
            retry,
        }
    }

    /// Runs `call` through the pipeline, retrying every failure.
    ///
    /// `call` is invoked once per attempt and never after the returned
    /// future is dropped.
    pub async fn invoke<F, Fut, T, E>(&self, call: F) -> Result<T, GateError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        T: Send + 'static,
        E: Send + 'static,
    {
        self.invoke_with(call, |_| true).await
    }

    /// Runs `call` through the pipeline, retrying only errors for which
    /// `is_retryable` returns true.
    ///
    /// A non-retryable error ends the invocation with
    /// [`GateError::CallFailed`]. Timeouts are always retryable.
    pub async fn invoke_with<F, Fut, T, E, P>(
        &self,
        mut call: F,
        is_retryable: P,
    ) -> Result<T, GateError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        T: Send + 'static,
        E: Send + 'static,
        P: Fn(&E) -> bool,
    {
        let span = debug_span!("gate.invoke", resource = %self.name);
        async move {
            let bulkhead_permit = self.bulkhead.acquire().await.map_err(|err| {
                warn!(resource = %self.name, "bulkhead rejected call");
                GateError::from(err)
            })?;

            let Some(first_admission) = self.breaker.try_acquire() else {
                warn!(resource = %self.name, state = %self.breaker.state(), "circuit rejected call");
                return Err(self.circuit_open());
            };
            let mut admission = Some(first_admission);

            let result = self
                .retry
                .execute(
                    |ctx| {
                        let attempt = admission
                            .take()
                            .or_else(|| self.breaker.try_acquire())
                            .map(|permit| (permit, call()));
                        let limiter = &self.limiter;
                        let name = self.name.as_str();

                        async move {
                            let Some((permit, fut)) = attempt else {
                                return Err(AttemptError::Rejected);
                            };

                            let (outcome, result) = match limiter.run(fut).await {
                                Ok(value) => (permit.complete(true), Ok(value)),
                                Err(TimeLimiterError::Inner(err)) => {
                                    (permit.complete(false), Err(AttemptFailure::Failure(err)))
                                }
                                Err(TimeLimiterError::Timeout { after }) => {
                                    permit.record(CallOutcome::Timeout);
                                    (CallOutcome::Timeout, Err(AttemptFailure::Timeout { after }))
                                }
                            };

                            debug!(
                                resource = %name,
                                attempt = ctx.attempt,
                                outcome = outcome.as_str(),
                                "attempt finished"
                            );
                            result.map_err(AttemptError::Failed)
                        }
                    },
                    |err| match err {
                        AttemptError::Rejected => false,
                        AttemptError::Failed(AttemptFailure::Timeout { .. }) => true,
                        AttemptError::Failed(AttemptFailure::Failure(e)) => is_retryable(e),
                    },
                )
                .await;

            bulkhead_permit.release();
            result.map_err(|err| self.finish(err))
        }
        .instrument(span)
        .await
    }

    fn finish<E>(&self, err: RetryError<AttemptError<E>>) -> GateError<E> {
        match err {
            RetryError::Aborted {
                error: AttemptError::Rejected,
                attempts,
                ..
            }
            | RetryError::Exhausted {
                last: AttemptError::Rejected,
                attempts,
                ..
            } => {
                warn!(resource = %self.name, attempts, "circuit opened during retries");
                self.circuit_open()
            }
            RetryError::Aborted {
                error: AttemptError::Failed(AttemptFailure::Failure(e)),
                attempts,
                ..
            } => {
                debug!(resource = %self.name, attempts, "non-retryable failure");
                GateError::CallFailed(e)
            }
            RetryError::Aborted {
                error: AttemptError::Failed(last),
                attempts,
                ..
            }
            | RetryError::Exhausted {
                last: AttemptError::Failed(last),
                attempts,
                ..
            } => {
                warn!(resource = %self.name, attempts, "retries exhausted");
                GateError::RetryExhausted {
                    name: self.name.clone(),
                    attempts,
                    last,
                }
            }
        }
    }

    fn circuit_open<E>(&self) -> GateError<E> {
        GateError::CircuitOpen {
            name: self.name.clone(),
        }
    }

    /// Observability view of this gate.
    pub fn state(&self) -> GateState {
        let snapshot = self.breaker.snapshot();
        let stats = self.bulkhead.stats();
        GateState {
            name: self.name.clone(),
            state: snapshot.state,
            window: snapshot.window,
            circuit_rejections: snapshot.rejected_calls,
            bulkhead_rejections: stats.rejected_total,
            in_flight: stats.in_flight,
            max_concurrent_calls: stats.max_concurrent_calls,
        }
    }

    /// Resource name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Settings this gate was built from.
    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    /// The shared bulkhead.
    pub fn bulkhead(&self) -> &Bulkhead {
        &self.bulkhead
    }

    /// The shared circuit breaker.
    pub fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    /// The per-attempt timeout guard.
    pub fn time_limiter(&self) -> &TimeLimiter {
        &self.limiter
    }

    /// The retry policy.
    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }
}

impl fmt::Debug for ResourceGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceGate")
            .field("name", &self.name)
            .field("breaker", &self.breaker)
            .field("bulkhead", &self.bulkhead)
            .finish_non_exhaustive()
    }
}
