//! Tower layer implementation for the bulkhead.

use crate::bulkhead::Bulkhead;
use crate::config::BulkheadConfig;
use crate::service::BulkheadService;
use tower::Layer;

/// Layer that applies bulkhead concurrency limiting.
///
/// Every service produced by one layer shares the same permits.
#[derive(Clone, Debug)]
pub struct BulkheadLayer {
    bulkhead: Bulkhead,
}

impl BulkheadLayer {
    /// Creates a layer around an existing bulkhead.
    pub fn new(bulkhead: Bulkhead) -> Self {
        Self { bulkhead }
    }

    /// Creates a layer with a fresh bulkhead built from `config`.
    ///
    /// # Examples
    ///
    /// ```
    /// use callgate_bulkhead::{BulkheadConfig, BulkheadLayer};
    /// use std::time::Duration;
    ///
    /// let layer = BulkheadLayer::from_config(
    ///     BulkheadConfig::builder()
    ///         .max_concurrent_calls(10)
    ///         .max_wait_duration(Some(Duration::from_secs(5)))
    ///         .build(),
    /// );
    /// assert_eq!(layer.bulkhead().available_permits(), 10);
    /// ```
    pub fn from_config(config: BulkheadConfig) -> Self {
        Self::new(Bulkhead::new(config))
    }

    /// The shared bulkhead behind this layer.
    pub fn bulkhead(&self) -> &Bulkhead {
        &self.bulkhead
    }
}

impl<S> Layer<S> for BulkheadLayer {
    type Service = BulkheadService<S>;

    fn layer(&self, service: S) -> Self::Service {
        BulkheadService::new(service, self.bulkhead.clone())
    }
}
