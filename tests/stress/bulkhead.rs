//! Bulkhead stress tests

use callgate_bulkhead::{Bulkhead, BulkheadConfig};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::sleep;

use super::ConcurrencyTracker;

/// Thousands of queued acquisitions against a small bulkhead.
#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
#[ignore]
async fn stress_large_queue() {
    let tracker = ConcurrencyTracker::new();
    let processed = Arc::new(AtomicUsize::new(0));
    let bulkhead = Bulkhead::new(
        BulkheadConfig::builder()
            .name("queue")
            .max_concurrent_calls(10)
            .max_wait_duration(Some(Duration::from_secs(30)))
            .build(),
    );

    let start = Instant::now();
    let handles: Vec<_> = (0..1_000)
        .map(|_| {
            let bulkhead = bulkhead.clone();
            let tracker = Arc::clone(&tracker);
            let processed = Arc::clone(&processed);
            tokio::spawn(async move {
                let permit = bulkhead.acquire().await.unwrap();
                tracker.enter();
                sleep(Duration::from_millis(5)).await;
                processed.fetch_add(1, Ordering::Relaxed);
                tracker.exit();
                permit.release();
            })
        })
        .collect();

    for handle in handles {
        handle.await.unwrap();
    }

    println!("processed 1000 queued calls in {:?}", start.elapsed());
    assert_eq!(processed.load(Ordering::Relaxed), 1_000);
    assert!(tracker.peak() <= 10);
    assert_eq!(tracker.current(), 0);
    assert_eq!(bulkhead.in_flight(), 0);
}

/// Rapid acquire/release cycles on a single permit.
#[tokio::test]
#[ignore]
async fn stress_permit_churn() {
    let bulkhead = Bulkhead::new(BulkheadConfig::builder().max_concurrent_calls(1).build());

    for _ in 0..100_000 {
        let permit = bulkhead.try_acquire().unwrap();
        permit.release();
    }

    let stats = bulkhead.stats();
    assert_eq!(stats.acquired_total, 100_000);
    assert_eq!(stats.released_total, 100_000);
    assert_eq!(stats.rejected_total, 0);
}
