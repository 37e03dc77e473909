use callgate_timelimiter::{TimeLimiter, TimeLimiterConfig, TimeLimiterError};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tower::{Layer, ServiceExt};

#[tokio::test(start_paused = true)]
async fn deadline_is_exact_under_paused_time() {
    let limiter = TimeLimiter::new(
        TimeLimiterConfig::builder()
            .timeout_duration(Duration::from_millis(120))
            .build(),
    );

    let start = Instant::now();
    let result = limiter
        .run(async {
            sleep(Duration::from_secs(1)).await;
            Ok::<_, ()>(())
        })
        .await;

    assert_eq!(
        result,
        Err(TimeLimiterError::Timeout {
            after: Duration::from_millis(120)
        })
    );
    assert_eq!(start.elapsed(), Duration::from_millis(120));
}

#[tokio::test(start_paused = true)]
async fn call_finishing_just_before_the_deadline_succeeds() {
    let limiter = TimeLimiter::new(
        TimeLimiterConfig::builder()
            .timeout_duration(Duration::from_millis(100))
            .build(),
    );

    let result = limiter
        .run(async {
            sleep(Duration::from_millis(99)).await;
            Ok::<_, ()>("made it")
        })
        .await;
    assert_eq!(result, Ok("made it"));
}

#[tokio::test(start_paused = true)]
async fn per_call_override_wins() {
    let limiter = TimeLimiter::new(TimeLimiterConfig::builder().build());
    let result = limiter
        .run_with_timeout(
            async {
                sleep(Duration::from_millis(20)).await;
                Ok::<_, ()>(())
            },
            Duration::from_millis(10),
        )
        .await;
    assert!(result.unwrap_err().is_timeout());
}

#[tokio::test(start_paused = true)]
async fn layer_reports_timeouts_to_listeners() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let s = Arc::clone(&seen);

    let layer = TimeLimiterConfig::builder()
        .name("search")
        .timeout_duration(Duration::from_millis(30))
        .on_timeout(move |after| s.lock().unwrap().push(after))
        .build()
        .layer();

    let service = layer.layer(tower::service_fn(|delay_ms: u64| async move {
        sleep(Duration::from_millis(delay_ms)).await;
        Ok::<_, std::io::Error>(delay_ms)
    }));

    assert_eq!(service.clone().oneshot(10).await.unwrap(), 10);
    assert!(service.oneshot(100).await.unwrap_err().is_timeout());
    assert_eq!(*seen.lock().unwrap(), vec![Duration::from_millis(30)]);
}
