//! Circuit breaker metrics regression tests

use super::helpers::*;
use callgate_circuitbreaker::{CircuitBreaker, CircuitBreakerConfig};
use callgate_core::CallOutcome;
use serial_test::serial;

#[test]
#[serial]
fn circuitbreaker_metrics_exist() {
    init_recorder();

    let breaker = CircuitBreaker::new(
        CircuitBreakerConfig::builder()
            .name("metrics_cb")
            .sliding_window_size(4)
            .minimum_number_of_calls(2)
            .build(),
    );

    for outcome in [CallOutcome::Success, CallOutcome::Slow, CallOutcome::Failure, CallOutcome::Failure] {
        if let Some(permit) = breaker.try_acquire() {
            permit.record(outcome);
        }
    }
    assert!(breaker.try_acquire().is_none());

    assert_counter_exists("circuitbreaker_calls_total");
    assert_metric_has_label("circuitbreaker_calls_total", "circuitbreaker", "metrics_cb");
    assert_metric_has_label("circuitbreaker_calls_total", "outcome", "success");
    assert_metric_has_label("circuitbreaker_calls_total", "outcome", "failure");
    assert_metric_has_label("circuitbreaker_calls_total", "outcome", "rejected");

    assert_counter_exists("circuitbreaker_slow_calls_total");

    assert_counter_exists("circuitbreaker_transitions_total");
    assert_metric_has_label("circuitbreaker_transitions_total", "from", "Closed");
    assert_metric_has_label("circuitbreaker_transitions_total", "to", "Open");

    assert_gauge_exists("circuitbreaker_state");
    assert_metric_has_label("circuitbreaker_state", "state", "Open");

    assert_histogram_exists("circuitbreaker_call_duration_seconds");
}
