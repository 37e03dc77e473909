//! Tower integration for [`ResourceGate`].

use crate::gate::ResourceGate;
use callgate_core::GateError;
use futures::future::BoxFuture;
use std::sync::Arc;
use std::task::{Context, Poll};
use tower::{Layer, Service, ServiceExt};

/// Layer that routes every request through one [`ResourceGate`].
///
/// All services produced by the layer share the gate's circuit and
/// bulkhead.
///
/// ```
/// use callgate::{GateConfig, GateLayer, ResourceGate};
/// use tower::{Layer, ServiceExt};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let gate = ResourceGate::new("catalog", GateConfig::default()).unwrap();
/// let service = GateLayer::new(gate).layer(tower::service_fn(|id: u32| async move {
///     Ok::<_, std::io::Error>(format!("item {id}"))
/// }));
///
/// assert_eq!(service.oneshot(7).await.unwrap(), "item 7");
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct GateLayer {
    gate: Arc<ResourceGate>,
}

impl GateLayer {
    /// Creates a layer that owns `gate`.
    pub fn new(gate: ResourceGate) -> Self {
        Self::shared(Arc::new(gate))
    }

    /// Creates a layer over a gate that is also used elsewhere, for example
    /// one taken from a [`GateRegistry`](crate::GateRegistry).
    pub fn shared(gate: Arc<ResourceGate>) -> Self {
        Self { gate }
    }

    /// The gate behind this layer.
    pub fn gate(&self) -> &Arc<ResourceGate> {
        &self.gate
    }
}

impl<S> Layer<S> for GateLayer {
    type Service = GateService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        GateService {
            inner,
            gate: Arc::clone(&self.gate),
        }
    }
}

/// Service produced by [`GateLayer`].
///
/// Each attempt calls a fresh clone of the inner service with a clone of
/// the request.
#[derive(Clone, Debug)]
pub struct GateService<S> {
    inner: S,
    gate: Arc<ResourceGate>,
}

impl<S> GateService<S> {
    /// The gate guarding this service.
    pub fn gate(&self) -> &ResourceGate {
        &self.gate
    }
}

impl<S, Req> Service<Req> for GateService<S>
where
    S: Service<Req> + Clone + Send + 'static,
    S::Future: Send + 'static,
    S::Response: Send + 'static,
    S::Error: Send + 'static,
    Req: Clone + Send + 'static,
{
    type Response = S::Response;
    type Error = GateError<S::Error>;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx).map_err(GateError::CallFailed)
    }

    fn call(&mut self, req: Req) -> Self::Future {
        let gate = Arc::clone(&self.gate);
        let clone = self.inner.clone();
        let inner = std::mem::replace(&mut self.inner, clone);

        Box::pin(async move {
            gate.invoke(move || inner.clone().oneshot(req.clone()))
                .await
        })
    }
}
