use callgate_circuitbreaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState};
use callgate_core::{CallOutcome, ManualClock};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

fn breaker(clock: Arc<ManualClock>, window: usize, min: usize) -> CircuitBreaker {
    CircuitBreaker::with_clock(
        CircuitBreakerConfig::builder()
            .name("thresholds")
            .sliding_window_size(window)
            .minimum_number_of_calls(min)
            .failure_rate_threshold(50.0)
            .slow_call_rate_threshold(80.0)
            .slow_call_duration_threshold(Duration::from_millis(100))
            .wait_duration_in_open(Duration::from_secs(5))
            .build(),
        clock,
    )
}

fn record(breaker: &CircuitBreaker, outcome: CallOutcome) {
    breaker
        .try_acquire()
        .expect("circuit should admit")
        .record(outcome);
}

#[test]
fn nothing_is_evaluated_before_minimum_calls() {
    let breaker = breaker(Arc::new(ManualClock::new()), 10, 5);
    for _ in 0..4 {
        record(&breaker, CallOutcome::Failure);
    }
    assert_eq!(breaker.state(), CircuitState::Closed);

    record(&breaker, CallOutcome::Failure);
    assert_eq!(breaker.state(), CircuitState::Open);
}

#[test]
fn failure_rate_at_threshold_opens() {
    let breaker = breaker(Arc::new(ManualClock::new()), 4, 4);
    for outcome in [
        CallOutcome::Success,
        CallOutcome::Failure,
        CallOutcome::Success,
    ] {
        record(&breaker, outcome);
    }
    let rate = breaker.snapshot().window.failure_rate;
    assert!((rate - 100.0 / 3.0).abs() < 1e-9, "{rate}");
    assert_eq!(breaker.state(), CircuitState::Closed);

    record(&breaker, CallOutcome::Timeout);
    assert_eq!(breaker.state(), CircuitState::Open);
}

#[test]
fn old_outcomes_slide_out_of_the_window() {
    let breaker = breaker(Arc::new(ManualClock::new()), 4, 4);
    for outcome in [
        CallOutcome::Failure,
        CallOutcome::Success,
        CallOutcome::Success,
        CallOutcome::Success,
    ] {
        record(&breaker, outcome);
    }
    // [S, S, S, F] after the oldest failure is evicted.
    for outcome in [CallOutcome::Success, CallOutcome::Failure] {
        record(&breaker, outcome);
    }

    let window = breaker.snapshot().window;
    assert_eq!(window.total, 4);
    assert_eq!(window.failures, 1);
    assert_eq!(breaker.state(), CircuitState::Closed);
}

#[test]
fn slow_rate_opens_independently_of_failures() {
    let breaker = breaker(Arc::new(ManualClock::new()), 5, 5);
    for _ in 0..4 {
        record(&breaker, CallOutcome::Slow);
    }
    record(&breaker, CallOutcome::Success);
    assert_eq!(breaker.state(), CircuitState::Open);
}

#[test]
fn classification_uses_the_breaker_clock() {
    let clock = Arc::new(ManualClock::new());
    let breaker = breaker(clock.clone(), 10, 5);

    let permit = breaker.try_acquire().unwrap();
    clock.advance(Duration::from_millis(150));
    assert_eq!(permit.complete(true), CallOutcome::Slow);

    let permit = breaker.try_acquire().unwrap();
    clock.advance(Duration::from_millis(150));
    assert_eq!(permit.complete(false), CallOutcome::Failure);

    let permit = breaker.try_acquire().unwrap();
    assert_eq!(permit.complete(true), CallOutcome::Success);
}

#[test]
fn transition_listener_fires_once_per_breach() {
    let opened = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&opened);
    let breaker = CircuitBreaker::with_clock(
        CircuitBreakerConfig::builder()
            .sliding_window_size(4)
            .minimum_number_of_calls(2)
            .on_state_transition(move |_, to| {
                if to == CircuitState::Open {
                    counter.fetch_add(1, Ordering::SeqCst);
                }
            })
            .build(),
        Arc::new(ManualClock::new()),
    );

    for _ in 0..2 {
        record(&breaker, CallOutcome::Failure);
    }
    for _ in 0..5 {
        assert!(breaker.try_acquire().is_none());
    }
    assert_eq!(opened.load(Ordering::SeqCst), 1);
    assert_eq!(breaker.snapshot().rejected_calls, 5);
}

#[test]
fn forced_states_and_reset() {
    let breaker = breaker(Arc::new(ManualClock::new()), 4, 2);

    breaker.force_open();
    assert!(breaker.is_open());
    assert!(breaker.try_acquire().is_none());

    breaker.force_closed();
    assert_eq!(breaker.state(), CircuitState::Closed);
    record(&breaker, CallOutcome::Failure);

    breaker.reset();
    let snapshot = breaker.snapshot();
    assert_eq!(snapshot.state, CircuitState::Closed);
    assert_eq!(snapshot.window.total, 0);
    assert_eq!(snapshot.rejected_calls, 0);
}
