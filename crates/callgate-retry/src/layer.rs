use crate::config::RetryConfig;
use crate::policy::{RetryPolicy, RetryPredicate};
use crate::Retry;
use std::sync::Arc;
use tower::Layer;

/// A Tower [`Layer`] that retries failed requests.
///
/// Requests must be `Clone`; each attempt calls the inner service with a
/// fresh clone.
///
/// # Examples
///
/// ```
/// use callgate_retry::{RetryConfig, RetryLayer};
/// use tower::ServiceBuilder;
/// use std::time::Duration;
///
/// # #[derive(Debug, Clone)]
/// # struct MyError { transient: bool }
/// let layer = RetryLayer::<MyError>::from(
///     RetryConfig::builder()
///         .max_attempts(5)
///         .exponential_backoff(Duration::from_millis(100))
///         .build(),
/// )
/// .retry_on(|err: &MyError| err.transient);
///
/// let service = ServiceBuilder::new()
///     .layer(layer)
///     .service(tower::service_fn(|req: String| async move { Ok::<_, MyError>(req) }));
/// ```
pub struct RetryLayer<E> {
    policy: RetryPolicy,
    predicate: Option<RetryPredicate<E>>,
}

impl<E> RetryLayer<E> {
    /// Creates a layer that retries every error under `policy`.
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            predicate: None,
        }
    }

    /// Only retries errors for which `predicate` returns true.
    pub fn retry_on<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&E) -> bool + Send + Sync + 'static,
    {
        self.predicate = Some(Arc::new(predicate));
        self
    }

    /// The policy applied by this layer.
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }
}

impl<E> Clone for RetryLayer<E> {
    fn clone(&self) -> Self {
        Self {
            policy: self.policy.clone(),
            predicate: self.predicate.clone(),
        }
    }
}

impl<E> From<RetryConfig> for RetryLayer<E> {
    fn from(config: RetryConfig) -> Self {
        Self::new(RetryPolicy::new(config))
    }
}

impl RetryConfig {
    /// Creates a layer from this configuration that retries every error.
    pub fn layer<E>(self) -> RetryLayer<E> {
        RetryLayer::from(self)
    }
}

impl<S, E> Layer<S> for RetryLayer<E> {
    type Service = Retry<S, E>;

    fn layer(&self, service: S) -> Self::Service {
        Retry::new(service, self.policy.clone(), self.predicate.clone())
    }
}
