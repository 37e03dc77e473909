//! The shared bulkhead and its permits.

use crate::config::BulkheadConfig;
use crate::error::BulkheadError;
use crate::events::BulkheadEvent;
#[cfg(feature = "metrics")]
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
#[cfg(feature = "metrics")]
use std::sync::Once;
use std::time::Duration;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::time::Instant;

#[cfg(feature = "metrics")]
static METRICS_INIT: Once = Once::new();

#[cfg(feature = "metrics")]
fn describe_metrics() {
    METRICS_INIT.call_once(|| {
        describe_counter!(
            "bulkhead_calls_permitted_total",
            "Total number of calls permitted through the bulkhead"
        );
        describe_counter!(
            "bulkhead_calls_rejected_total",
            "Total number of calls rejected by the bulkhead"
        );
        describe_counter!(
            "bulkhead_calls_released_total",
            "Total number of permits released"
        );
        describe_gauge!(
            "bulkhead_concurrent_calls",
            "Current number of concurrent calls"
        );
        describe_histogram!(
            "bulkhead_wait_duration_seconds",
            "Time spent waiting to acquire a permit"
        );
        describe_histogram!(
            "bulkhead_call_duration_seconds",
            "How long permits were held"
        );
    });
}

struct Inner {
    semaphore: Arc<Semaphore>,
    config: BulkheadConfig,
    acquired: AtomicU64,
    released: AtomicU64,
    rejected: AtomicU64,
}

impl Inner {
    fn in_flight(&self) -> usize {
        let acquired = self.acquired.load(Ordering::SeqCst);
        let released = self.released.load(Ordering::SeqCst);
        acquired.saturating_sub(released) as usize
    }
}

/// Counting semaphore limiting concurrent calls to one resource.
///
/// Clones share the same permits and counters.
#[derive(Clone)]
pub struct Bulkhead {
    inner: Arc<Inner>,
}

impl Bulkhead {
    /// Largest supported `max_concurrent_calls`.
    pub const MAX_CONCURRENT_CALLS: usize = Semaphore::MAX_PERMITS;

    /// Creates a bulkhead from `config`.
    pub fn new(config: BulkheadConfig) -> Self {
        #[cfg(feature = "metrics")]
        describe_metrics();

        Self {
            inner: Arc::new(Inner {
                semaphore: Arc::new(Semaphore::new(config.max_concurrent_calls)),
                config,
                acquired: AtomicU64::new(0),
                released: AtomicU64::new(0),
                rejected: AtomicU64::new(0),
            }),
        }
    }

    /// Waits for a permit.
    ///
    /// With no `max_wait_duration` this waits until a permit frees up. A zero
    /// wait fails fast. Otherwise the call is rejected once the wait
    /// elapses. Dropping the returned future while waiting acquires
    /// nothing.
    pub async fn acquire(&self) -> Result<BulkheadPermit, BulkheadError> {
        let start = Instant::now();
        let semaphore = Arc::clone(&self.inner.semaphore);

        let permit = match self.inner.config.max_wait_duration {
            Some(wait) if wait.is_zero() => semaphore.try_acquire_owned().ok(),
            Some(wait) => tokio::time::timeout(wait, semaphore.acquire_owned())
                .await
                .ok()
                .and_then(Result::ok),
            None => semaphore.acquire_owned().await.ok(),
        };

        let waited = start.elapsed();
        match permit {
            Some(permit) => Ok(self.admit(permit, waited)),
            None => Err(self.reject(waited)),
        }
    }

    /// Takes a permit only if one is free right now.
    pub fn try_acquire(&self) -> Result<BulkheadPermit, BulkheadError> {
        match Arc::clone(&self.inner.semaphore).try_acquire_owned() {
            Ok(permit) => Ok(self.admit(permit, Duration::ZERO)),
            Err(_) => Err(self.reject(Duration::ZERO)),
        }
    }

    fn admit(&self, permit: OwnedSemaphorePermit, waited: Duration) -> BulkheadPermit {
        let config = &self.inner.config;
        self.inner.acquired.fetch_add(1, Ordering::SeqCst);
        let concurrent_calls = self.inner.in_flight();

        config.event_listeners.emit(&BulkheadEvent::CallPermitted {
            pattern_name: config.name.clone(),
            timestamp: Instant::now(),
            concurrent_calls,
            waited,
        });

        #[cfg(feature = "tracing")]
        tracing::trace!(bulkhead = %config.name, concurrent_calls, ?waited, "bulkhead permit acquired");

        #[cfg(feature = "metrics")]
        {
            counter!("bulkhead_calls_permitted_total", "bulkhead" => config.name.clone())
                .increment(1);
            gauge!("bulkhead_concurrent_calls", "bulkhead" => config.name.clone())
                .set(concurrent_calls as f64);
            histogram!("bulkhead_wait_duration_seconds", "bulkhead" => config.name.clone())
                .record(waited.as_secs_f64());
        }

        BulkheadPermit {
            permit: Some(permit),
            inner: Arc::clone(&self.inner),
            acquired_at: Instant::now(),
        }
    }

    fn reject(&self, waited: Duration) -> BulkheadError {
        let config = &self.inner.config;
        self.inner.rejected.fetch_add(1, Ordering::SeqCst);

        config.event_listeners.emit(&BulkheadEvent::CallRejected {
            pattern_name: config.name.clone(),
            timestamp: Instant::now(),
            max_concurrent_calls: config.max_concurrent_calls,
            waited,
        });

        #[cfg(feature = "tracing")]
        tracing::warn!(
            bulkhead = %config.name,
            max_concurrent_calls = config.max_concurrent_calls,
            ?waited,
            "bulkhead full, call rejected"
        );

        #[cfg(feature = "metrics")]
        counter!("bulkhead_calls_rejected_total", "bulkhead" => config.name.clone()).increment(1);

        BulkheadError::Rejected {
            name: config.name.clone(),
            max_concurrent_calls: config.max_concurrent_calls,
            waited,
        }
    }

    /// Calls currently holding a permit.
    pub fn in_flight(&self) -> usize {
        self.inner.in_flight()
    }

    /// Permits free right now.
    pub fn available_permits(&self) -> usize {
        self.inner.semaphore.available_permits()
    }

    /// Lifetime counters.
    pub fn stats(&self) -> BulkheadStats {
        BulkheadStats {
            max_concurrent_calls: self.inner.config.max_concurrent_calls,
            in_flight: self.inner.in_flight(),
            acquired_total: self.inner.acquired.load(Ordering::SeqCst),
            released_total: self.inner.released.load(Ordering::SeqCst),
            rejected_total: self.inner.rejected.load(Ordering::SeqCst),
        }
    }

    /// Bulkhead name.
    pub fn name(&self) -> &str {
        &self.inner.config.name
    }

    /// Bulkhead configuration.
    pub fn config(&self) -> &BulkheadConfig {
        &self.inner.config
    }
}

impl fmt::Debug for Bulkhead {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bulkhead")
            .field("name", &self.inner.config.name)
            .field("stats", &self.stats())
            .finish()
    }
}

/// Counters exposed for observability and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BulkheadStats {
    /// Configured capacity.
    pub max_concurrent_calls: usize,
    /// Permits currently held.
    pub in_flight: usize,
    /// Permits handed out since creation.
    pub acquired_total: u64,
    /// Permits returned since creation.
    pub released_total: u64,
    /// Calls rejected since creation.
    pub rejected_total: u64,
}

/// A held bulkhead slot.
///
/// The slot is returned exactly once: by [`BulkheadPermit::release`] or
/// when the permit is dropped, including when the future owning it is
/// cancelled. `release` consumes the permit, so releasing twice does not
/// compile.
#[must_use = "dropping the permit releases the bulkhead slot immediately"]
pub struct BulkheadPermit {
    permit: Option<OwnedSemaphorePermit>,
    inner: Arc<Inner>,
    acquired_at: Instant,
}

impl BulkheadPermit {
    /// Returns the slot to the bulkhead.
    pub fn release(self) {
        drop(self);
    }

    /// How long this permit has been held.
    pub fn held_for(&self) -> Duration {
        self.acquired_at.elapsed()
    }
}

impl Drop for BulkheadPermit {
    fn drop(&mut self) {
        let Some(permit) = self.permit.take() else {
            return;
        };

        // counters first, so in_flight never exceeds the semaphore
        self.inner.released.fetch_add(1, Ordering::SeqCst);
        drop(permit);

        let config = &self.inner.config;
        let held = self.acquired_at.elapsed();
        config.event_listeners.emit(&BulkheadEvent::CallReleased {
            pattern_name: config.name.clone(),
            timestamp: Instant::now(),
            held,
        });

        #[cfg(feature = "metrics")]
        {
            counter!("bulkhead_calls_released_total", "bulkhead" => config.name.clone())
                .increment(1);
            gauge!("bulkhead_concurrent_calls", "bulkhead" => config.name.clone())
                .set(self.inner.in_flight() as f64);
            histogram!("bulkhead_call_duration_seconds", "bulkhead" => config.name.clone())
                .record(held.as_secs_f64());
        }
    }
}

impl fmt::Debug for BulkheadPermit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BulkheadPermit")
            .field("bulkhead", &self.inner.config.name)
            .field("acquired_at", &self.acquired_at)
            .finish()
    }
}
