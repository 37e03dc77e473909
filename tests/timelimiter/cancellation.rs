use callgate_timelimiter::{TimeLimiter, TimeLimiterConfig, TimeLimiterError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;

fn limiter(cancel: bool) -> TimeLimiter {
    TimeLimiter::new(
        TimeLimiterConfig::builder()
            .name("cancellation")
            .timeout_duration(Duration::from_millis(50))
            .cancel_running_call(cancel)
            .build(),
    )
}

async fn slow_call(finished: Arc<AtomicBool>) -> Result<(), std::io::Error> {
    sleep(Duration::from_millis(200)).await;
    finished.store(true, Ordering::SeqCst);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn background_mode_lets_the_call_finish() {
    let finished = Arc::new(AtomicBool::new(false));

    let result = limiter(false).run(slow_call(Arc::clone(&finished))).await;
    assert!(matches!(result, Err(TimeLimiterError::Timeout { .. })));
    assert!(!finished.load(Ordering::SeqCst));

    sleep(Duration::from_millis(200)).await;
    assert!(finished.load(Ordering::SeqCst));
}

#[tokio::test(start_paused = true)]
async fn cancel_mode_drops_the_call() {
    let finished = Arc::new(AtomicBool::new(false));

    let result = limiter(true).run(slow_call(Arc::clone(&finished))).await;
    assert!(result.unwrap_err().is_timeout());

    sleep(Duration::from_millis(500)).await;
    assert!(!finished.load(Ordering::SeqCst));
}

#[tokio::test(start_paused = true)]
async fn inner_errors_are_not_timeouts() {
    let result = limiter(true)
        .run(async { Err::<(), _>("refused") })
        .await;
    let err = result.unwrap_err();
    assert!(!err.is_timeout());
    assert_eq!(err.into_inner(), Some("refused"));
}
