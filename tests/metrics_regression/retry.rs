//! Retry metrics regression tests

use super::helpers::*;
use callgate_retry::{RetryConfig, RetryPolicy};
use serial_test::serial;
use std::time::Duration;

#[tokio::test]
#[serial]
async fn retry_metrics_exist() {
    init_recorder();

    let policy = RetryPolicy::new(
        RetryConfig::builder()
            .name("metrics_retry")
            .max_attempts(2)
            .fixed_backoff(Duration::from_millis(1))
            .build(),
    );

    let _ = policy
        .execute(|ctx| async move { if ctx.attempt == 2 { Ok(()) } else { Err(()) } }, |_| true)
        .await;
    let _: Result<(), _> = policy.execute(|_| async { Err(()) }, |_| true).await;
    let _: Result<(), _> = policy.execute(|_| async { Err(()) }, |_| false).await;

    assert_counter_exists("retry_calls_total");
    assert_metric_has_label("retry_calls_total", "retry", "metrics_retry");
    assert_metric_has_label("retry_calls_total", "result", "success");
    assert_metric_has_label("retry_calls_total", "result", "exhausted");
    assert_metric_has_label("retry_calls_total", "result", "aborted");
    assert_counter_exists("retry_attempts_total");
    assert_histogram_exists("retry_attempts");
}
