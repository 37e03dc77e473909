use crate::error::TimeLimiterError;
use crate::limiter::TimeLimiter;
use futures::future::BoxFuture;
use std::task::{Context, Poll};
use tower::Service;

/// A Tower service that applies a deadline to an inner service.
#[derive(Clone, Debug)]
pub struct TimeLimiterService<S> {
    inner: S,
    limiter: TimeLimiter,
}

impl<S> TimeLimiterService<S> {
    pub(crate) fn new(inner: S, limiter: TimeLimiter) -> Self {
        Self { inner, limiter }
    }

    /// The time limiter applied to each call.
    pub fn limiter(&self) -> &TimeLimiter {
        &self.limiter
    }
}

impl<S, Req> Service<Req> for TimeLimiterService<S>
where
    S: Service<Req> + Clone + Send + 'static,
    S::Future: Send + 'static,
    S::Response: Send + 'static,
    S::Error: Send + 'static,
    Req: Send + 'static,
{
    type Response = S::Response;
    type Error = TimeLimiterError<S::Error>;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx).map_err(TimeLimiterError::Inner)
    }

    fn call(&mut self, req: Req) -> Self::Future {
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);
        let limiter = self.limiter.clone();

        let call = inner.call(req);
        Box::pin(async move { limiter.run(call).await })
    }
}
