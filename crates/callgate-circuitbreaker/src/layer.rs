use crate::{CircuitBreaker, CircuitBreakerError};
use futures::future::BoxFuture;
use std::task::{Context, Poll};
use tower::{Layer, Service};

/// A Tower Layer that puts a shared [`CircuitBreaker`] in front of a service.
///
/// Every service produced by the layer, and every clone of those services,
/// reports into the same circuit. An `Err` from the inner service counts as
/// a failure; an `Ok` is a success or, past the slow-call threshold, slow.
///
/// ```rust
/// use callgate_circuitbreaker::{CircuitBreaker, CircuitBreakerConfig, CircuitBreakerLayer};
/// use tower::{ServiceBuilder, service_fn};
///
/// let breaker = CircuitBreaker::new(
///     CircuitBreakerConfig::builder()
///         .name("catalog")
///         .failure_rate_threshold(50.0)
///         .sliding_window_size(20)
///         .build(),
/// );
///
/// let service = ServiceBuilder::new()
///     .layer(CircuitBreakerLayer::new(breaker))
///     .service(service_fn(|req: String| async move { Ok::<_, std::io::Error>(req) }));
/// ```
#[derive(Clone, Debug)]
pub struct CircuitBreakerLayer {
    breaker: CircuitBreaker,
}

impl CircuitBreakerLayer {
    /// Creates a layer reporting into `breaker`.
    pub fn new(breaker: CircuitBreaker) -> Self {
        Self { breaker }
    }

    /// The shared breaker behind this layer.
    pub fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }
}

impl<S> Layer<S> for CircuitBreakerLayer {
    type Service = CircuitBreakerService<S>;

    fn layer(&self, service: S) -> Self::Service {
        CircuitBreakerService {
            inner: service,
            breaker: self.breaker.clone(),
        }
    }
}

/// A Tower Service guarded by a circuit breaker.
#[derive(Clone, Debug)]
pub struct CircuitBreakerService<S> {
    inner: S,
    breaker: CircuitBreaker,
}

impl<S> CircuitBreakerService<S> {
    /// The shared breaker guarding this service.
    pub fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }
}

impl<S, Req> Service<Req> for CircuitBreakerService<S>
where
    S: Service<Req> + Clone + Send + 'static,
    S::Response: Send + 'static,
    S::Error: Send + 'static,
    S::Future: Send + 'static,
    Req: Send + 'static,
{
    type Response = S::Response;
    type Error = CircuitBreakerError<S::Error>;
    type Future = BoxFuture<'static, Result<S::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner
            .poll_ready(cx)
            .map_err(CircuitBreakerError::Inner)
    }

    fn call(&mut self, req: Req) -> Self::Future {
        let breaker = self.breaker.clone();
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        Box::pin(async move {
            let Some(permit) = breaker.try_acquire() else {
                #[cfg(feature = "tracing")]
                tracing::debug!(breaker = breaker.name(), "circuit breaker rejected call");

                return Err(CircuitBreakerError::OpenCircuit {
                    name: breaker.name().to_string(),
                });
            };

            let result = inner.call(req).await;
            permit.complete(result.is_ok());
            result.map_err(CircuitBreakerError::Inner)
        })
    }
}
