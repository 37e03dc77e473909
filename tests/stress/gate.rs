//! Gate stress tests

use callgate::{GateConfig, GateError, ResourceGate};
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;

use super::ConcurrencyTracker;

#[derive(Debug)]
struct Flaky;

fn gate(max_concurrent_calls: usize) -> Arc<ResourceGate> {
    Arc::new(
        ResourceGate::new(
            "stress",
            GateConfig {
                window_size: 50,
                min_calls: 20,
                failure_rate_threshold: 60.0,
                open_wait_duration: Duration::from_millis(20),
                half_open_permitted_calls: 5,
                max_retry_attempts: 3,
                retry_base_delay: Duration::from_millis(1),
                timeout_duration: Duration::from_millis(30),
                cancel_running_call: true,
                max_concurrent_calls,
                max_wait_for_permit: Duration::from_millis(5),
                ..GateConfig::default()
            },
        )
        .unwrap(),
    )
}

async fn run_random_invocations(gate: Arc<ResourceGate>, invocations: usize) -> usize {
    let tracker = ConcurrencyTracker::new();
    let mut handles = Vec::with_capacity(invocations);

    for _ in 0..invocations {
        let gate = Arc::clone(&gate);
        let tracker = Arc::clone(&tracker);
        handles.push(tokio::spawn(async move {
            gate.invoke(move || {
                let tracker = Arc::clone(&tracker);
                // 0..70 fail, 70..95 succeed, 95..100 hang past the deadline
                let roll = rand::rng().random_range(0..100);
                async move {
                    let _guard = tracker.track();
                    match roll {
                        0..=69 => Err(Flaky),
                        70..=94 => Ok(roll),
                        _ => {
                            sleep(Duration::from_millis(50)).await;
                            Ok(roll)
                        }
                    }
                }
            })
            .await
        }));
    }

    let mut errors = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => {}
            Err(
                GateError::BulkheadRejected { .. }
                | GateError::CircuitOpen { .. }
                | GateError::RetryExhausted { .. },
            ) => errors += 1,
            Err(other) => panic!("unexpected error: {other:?}"),
        }
    }

    let peak = tracker.peak();
    assert!(
        peak <= gate.state().max_concurrent_calls,
        "peak concurrency {peak} exceeded the bulkhead"
    );
    errors
}

/// Permit balance across 10,000 concurrent invocations with random outcomes.
#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
#[ignore]
async fn stress_permit_balance_under_random_outcomes() {
    let gate = gate(16);
    let errors = run_random_invocations(Arc::clone(&gate), 10_000).await;

    let stats = gate.bulkhead().stats();
    println!("errors: {errors}, stats: {stats:?}");
    assert_eq!(stats.acquired_total, stats.released_total);
    assert_eq!(stats.in_flight, 0);
    assert_eq!(gate.state().in_flight, 0);
    assert_eq!(
        stats.acquired_total + stats.rejected_total,
        10_000,
        "every invocation either acquired or was rejected"
    );
}

/// A smaller run of the same check that stays in the default suite.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn permit_balance_under_random_outcomes() {
    let gate = gate(8);
    run_random_invocations(Arc::clone(&gate), 500).await;

    let stats = gate.bulkhead().stats();
    assert_eq!(stats.acquired_total, stats.released_total);
    assert_eq!(stats.in_flight, 0);
}

/// Cancelling thousands of in-flight invocations leaks no permits.
#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
#[ignore]
async fn stress_cancellation_storm() {
    let gate = gate(32);
    let mut handles = Vec::new();

    for _ in 0..5_000 {
        let gate = Arc::clone(&gate);
        handles.push(tokio::spawn(async move {
            gate.invoke(|| async {
                sleep(Duration::from_millis(10)).await;
                Ok::<_, Flaky>(())
            })
            .await
        }));
    }
    sleep(Duration::from_millis(2)).await;
    for handle in &handles {
        handle.abort();
    }
    for handle in handles {
        let _ = handle.await;
    }

    let stats = gate.bulkhead().stats();
    assert_eq!(stats.acquired_total, stats.released_total);
    assert_eq!(stats.in_flight, 0);
}
