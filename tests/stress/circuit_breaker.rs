//! Circuit breaker stress tests

use callgate_circuitbreaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState};
use callgate_core::CallOutcome;
use rand::Rng;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Default)]
struct Tally {
    admitted: AtomicU64,
    rejected: AtomicU64,
    recorded: AtomicU64,
    discarded: AtomicU64,
    abandoned: AtomicU64,
}

struct Observed {
    permitted: Arc<AtomicU64>,
    rejected: Arc<AtomicU64>,
    outcomes: Arc<AtomicU64>,
    transitions: Arc<Mutex<Vec<(CircuitState, CircuitState)>>>,
}

fn breaker() -> (CircuitBreaker, Observed) {
    let observed = Observed {
        permitted: Arc::new(AtomicU64::new(0)),
        rejected: Arc::new(AtomicU64::new(0)),
        outcomes: Arc::new(AtomicU64::new(0)),
        transitions: Arc::new(Mutex::new(Vec::new())),
    };
    let permitted = Arc::clone(&observed.permitted);
    let rejected = Arc::clone(&observed.rejected);
    let outcomes = Arc::clone(&observed.outcomes);
    let transitions = Arc::clone(&observed.transitions);

    let breaker = CircuitBreaker::new(
        CircuitBreakerConfig::builder()
            .name("stress_breaker")
            .sliding_window_size(20)
            .minimum_number_of_calls(10)
            .failure_rate_threshold(50.0)
            .wait_duration_in_open(Duration::from_millis(1))
            .permitted_calls_in_half_open(3)
            .on_call_permitted(move |_| {
                permitted.fetch_add(1, Ordering::SeqCst);
            })
            .on_call_rejected(move |_| {
                rejected.fetch_add(1, Ordering::SeqCst);
            })
            .on_outcome(move |_, _| {
                outcomes.fetch_add(1, Ordering::SeqCst);
            })
            .on_state_transition(move |from, to| {
                transitions.lock().unwrap().push((from, to));
            })
            .build(),
    );
    (breaker, observed)
}

async fn hammer(breaker: CircuitBreaker, tally: Arc<Tally>, iterations: usize) {
    for _ in 0..iterations {
        let Some(permit) = breaker.try_acquire() else {
            tally.rejected.fetch_add(1, Ordering::SeqCst);
            tokio::task::yield_now().await;
            continue;
        };
        tally.admitted.fetch_add(1, Ordering::SeqCst);

        // Let other tasks move the circuit while this call is in flight.
        tokio::task::yield_now().await;

        let roll = rand::rng().random_range(0..100);
        if roll < 5 {
            drop(permit);
            tally.abandoned.fetch_add(1, Ordering::SeqCst);
            continue;
        }
        let outcome = match roll {
            5..50 => CallOutcome::Failure,
            50..60 => CallOutcome::Timeout,
            _ => CallOutcome::Success,
        };
        if permit.record(outcome) {
            tally.recorded.fetch_add(1, Ordering::SeqCst);
        } else {
            tally.discarded.fetch_add(1, Ordering::SeqCst);
        }
    }
}

async fn run_concurrent(tasks: usize, iterations: usize) {
    let (breaker, observed) = breaker();
    let tally = Arc::new(Tally::default());

    let handles: Vec<_> = (0..tasks)
        .map(|_| tokio::spawn(hammer(breaker.clone(), Arc::clone(&tally), iterations)))
        .collect();
    for handle in handles {
        handle.await.unwrap();
    }

    let admitted = tally.admitted.load(Ordering::SeqCst);
    let rejected = tally.rejected.load(Ordering::SeqCst);
    let recorded = tally.recorded.load(Ordering::SeqCst);
    let discarded = tally.discarded.load(Ordering::SeqCst);
    let abandoned = tally.abandoned.load(Ordering::SeqCst);

    assert_eq!(admitted + rejected, (tasks * iterations) as u64);
    assert_eq!(
        recorded + discarded + abandoned,
        admitted,
        "every admitted call is counted once, dropped as stale, or abandoned"
    );
    assert_eq!(observed.permitted.load(Ordering::SeqCst), admitted);
    assert_eq!(observed.rejected.load(Ordering::SeqCst), rejected);
    assert_eq!(observed.outcomes.load(Ordering::SeqCst), recorded);
    assert_eq!(breaker.snapshot().rejected_calls, rejected);

    let transitions = observed.transitions.lock().unwrap();
    assert!(!transitions.is_empty(), "a 55% failure mix should trip the circuit");
    assert_eq!(transitions[0].0, CircuitState::Closed);
    for pair in transitions.windows(2) {
        assert_eq!(pair[0].1, pair[1].0, "transitions must chain: {pair:?}");
    }
    assert_eq!(transitions.last().map(|t| t.1), Some(breaker.state()));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_outcomes_are_never_lost_or_double_counted() {
    run_concurrent(16, 500).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
#[ignore]
async fn heavy_concurrent_outcome_accounting() {
    run_concurrent(64, 5_000).await;
}
