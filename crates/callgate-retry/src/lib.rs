//! Bounded retry with backoff.
//!
//! A [`RetryPolicy`] runs an async operation until it succeeds, fails with
//! an error the caller declines to retry, or uses up `max_attempts`. Between
//! attempts it sleeps on the tokio timer for an interval chosen by an
//! [`IntervalFunction`]:
//!
//! - [`ExponentialBackoff`]: `base * 2^(attempt-1)`, the default
//! - [`ExponentialRandomBackoff`]: the same with uniform jitter
//! - [`FixedInterval`]: constant delay
//! - [`FnInterval`]: any closure
//!
//! Each attempt receives a [`RetryContext`] describing where it sits in the
//! sequence.
//!
//! # Examples
//!
//! ```
//! use callgate_retry::RetryConfig;
//! use tower::{Layer, ServiceExt};
//! use std::time::Duration;
//!
//! # #[derive(Debug, Clone)]
//! # struct MyError;
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let layer = RetryConfig::builder()
//!     .name("catalog")
//!     .max_attempts(5)
//!     .exponential_backoff(Duration::from_millis(100))
//!     .on_retry(|attempt, delay| {
//!         println!("attempt {attempt} failed, next in {delay:?}");
//!     })
//!     .build()
//!     .layer::<MyError>();
//!
//! let service = layer.layer(tower::service_fn(|req: String| async move {
//!     Ok::<_, MyError>(format!("Response: {}", req))
//! }));
//! let response = service.oneshot("items".to_string()).await.unwrap();
//! assert_eq!(response, "Response: items");
//! # }
//! ```

mod backoff;
mod config;
mod error;
mod events;
mod layer;
mod policy;

pub use backoff::{
    ExponentialBackoff, ExponentialRandomBackoff, FixedInterval, FnInterval, IntervalFunction,
};
pub use config::{RetryConfig, RetryConfigBuilder};
pub use error::RetryError;
pub use events::RetryEvent;
pub use layer::RetryLayer;
pub use policy::{RetryContext, RetryPolicy, RetryPredicate};

use futures::future::BoxFuture;
use std::task::{Context, Poll};
use tower::{Service, ServiceExt};

#[cfg(feature = "metrics")]
use metrics::{describe_counter, describe_histogram};

#[cfg(feature = "metrics")]
static METRICS_INIT: std::sync::Once = std::sync::Once::new();

#[cfg(feature = "metrics")]
pub(crate) fn describe_metrics() {
    METRICS_INIT.call_once(|| {
        describe_counter!(
            "retry_calls_total",
            "Total number of retried operations by final result"
        );
        describe_counter!(
            "retry_attempts_total",
            "Total number of attempts made by retried operations"
        );
        describe_histogram!("retry_attempts", "Attempts needed per retried operation");
    });
}

/// A Tower [`Service`] that retries failed requests.
///
/// Returns the final attempt's error once the policy gives up.
pub struct Retry<S, E> {
    inner: S,
    policy: RetryPolicy,
    predicate: Option<RetryPredicate<E>>,
}

impl<S, E> Retry<S, E> {
    /// Creates a new `Retry` service wrapping the given service.
    pub fn new(inner: S, policy: RetryPolicy, predicate: Option<RetryPredicate<E>>) -> Self {
        Self {
            inner,
            policy,
            predicate,
        }
    }

    /// The policy applied to each request.
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }
}

impl<S, E> Clone for Retry<S, E>
where
    S: Clone,
{
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            policy: self.policy.clone(),
            predicate: self.predicate.clone(),
        }
    }
}

impl<S, Req, E> Service<Req> for Retry<S, E>
where
    S: Service<Req, Error = E> + Clone + Send + 'static,
    S::Future: Send + 'static,
    S::Response: Send + 'static,
    Req: Clone + Send + 'static,
    E: Send + 'static,
{
    type Response = S::Response;
    type Error = E;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Req) -> Self::Future {
        let service = self.inner.clone();
        let policy = self.policy.clone();
        let predicate = self.predicate.clone();

        Box::pin(async move {
            policy
                .execute(
                    move |_ctx| service.clone().oneshot(req.clone()),
                    move |err: &E| predicate.as_ref().map_or(true, |p| p(err)),
                )
                .await
                .map_err(RetryError::into_inner)
        })
    }
}
