use callgate_circuitbreaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState};
use callgate_core::{CallOutcome, ManualClock};
use std::sync::Arc;
use std::time::Duration;

const OPEN_WAIT: Duration = Duration::from_secs(30);

fn open_breaker(clock: &Arc<ManualClock>, trials: usize) -> CircuitBreaker {
    let breaker = CircuitBreaker::with_clock(
        CircuitBreakerConfig::builder()
            .name("half-open")
            .sliding_window_size(2)
            .minimum_number_of_calls(2)
            .wait_duration_in_open(OPEN_WAIT)
            .permitted_calls_in_half_open(trials)
            .build(),
        clock.clone(),
    );
    for _ in 0..2 {
        breaker.try_acquire().unwrap().record(CallOutcome::Failure);
    }
    assert_eq!(breaker.state(), CircuitState::Open);
    breaker
}

#[test]
fn stays_open_until_the_wait_elapses() {
    let clock = Arc::new(ManualClock::new());
    let breaker = open_breaker(&clock, 2);

    clock.advance(OPEN_WAIT - Duration::from_millis(1));
    assert!(breaker.try_acquire().is_none());
    assert_eq!(breaker.state(), CircuitState::Open);

    clock.advance(Duration::from_millis(1));
    assert!(breaker.try_acquire().is_some());
    assert_eq!(breaker.state(), CircuitState::HalfOpen);
}

#[test]
fn trial_budget_is_enforced() {
    let clock = Arc::new(ManualClock::new());
    let breaker = open_breaker(&clock, 2);
    clock.advance(OPEN_WAIT);

    let first = breaker.try_acquire().unwrap();
    let second = breaker.try_acquire().unwrap();
    assert!(breaker.try_acquire().is_none());

    first.record(CallOutcome::Success);
    assert_eq!(breaker.state(), CircuitState::HalfOpen);
    second.record(CallOutcome::Success);
    assert_eq!(breaker.state(), CircuitState::Closed);
}

#[test]
fn slow_trial_reopens() {
    let clock = Arc::new(ManualClock::new());
    let breaker = open_breaker(&clock, 3);
    clock.advance(OPEN_WAIT);

    breaker.try_acquire().unwrap().record(CallOutcome::Success);
    breaker.try_acquire().unwrap().record(CallOutcome::Slow);
    assert_eq!(breaker.state(), CircuitState::Open);

    // The wait restarts from the reopening.
    assert!(breaker.try_acquire().is_none());
}

#[test]
fn outcomes_from_before_a_transition_are_ignored() {
    let clock = Arc::new(ManualClock::new());
    let breaker = open_breaker(&clock, 1);
    clock.advance(OPEN_WAIT);

    let trial = breaker.try_acquire().unwrap();
    breaker.force_closed();

    assert!(!trial.record(CallOutcome::Failure));
    assert_eq!(breaker.state(), CircuitState::Closed);
    assert_eq!(breaker.snapshot().window.total, 0);
}

#[test]
fn abandoned_trial_frees_its_slot() {
    let clock = Arc::new(ManualClock::new());
    let breaker = open_breaker(&clock, 1);
    clock.advance(OPEN_WAIT);

    let trial = breaker.try_acquire().unwrap();
    assert!(breaker.try_acquire().is_none());
    drop(trial);

    let retry = breaker.try_acquire().expect("slot should be free again");
    retry.record(CallOutcome::Success);
    assert_eq!(breaker.state(), CircuitState::Closed);
}
