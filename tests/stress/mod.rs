//! High-volume and high-concurrency runs checking that permits balance and
//! state stays consistent under load.

pub mod bulkhead;
pub mod circuit_breaker;
pub mod gate;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Tracks peak concurrent operations.
pub struct ConcurrencyTracker {
    current: AtomicUsize,
    peak: AtomicUsize,
}

impl ConcurrencyTracker {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            current: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        })
    }

    pub fn enter(&self) {
        let current = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(current, Ordering::SeqCst);
    }

    pub fn exit(&self) {
        self.current.fetch_sub(1, Ordering::SeqCst);
    }

    /// Enters now and exits when the guard drops, including on
    /// cancellation.
    pub fn track(self: &Arc<Self>) -> TrackGuard {
        self.enter();
        TrackGuard(Arc::clone(self))
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub fn current(&self) -> usize {
        self.current.load(Ordering::SeqCst)
    }
}

pub struct TrackGuard(Arc<ConcurrencyTracker>);

impl Drop for TrackGuard {
    fn drop(&mut self) {
        self.0.exit();
    }
}
