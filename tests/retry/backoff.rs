use callgate_retry::{
    ExponentialBackoff, ExponentialRandomBackoff, FixedInterval, FnInterval, IntervalFunction,
    RetryConfig, RetryPolicy,
};
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;

#[test]
fn exponential_doubles_from_the_base() {
    let backoff = ExponentialBackoff::new(Duration::from_millis(500));
    let delays: Vec<_> = (0..4).map(|retry| backoff.next_interval(retry)).collect();
    assert_eq!(
        delays,
        [500, 1000, 2000, 4000].map(Duration::from_millis).to_vec()
    );
}

#[test]
fn exponential_respects_the_cap() {
    let backoff =
        ExponentialBackoff::new(Duration::from_millis(100)).max_interval(Duration::from_millis(250));
    assert_eq!(backoff.next_interval(0), Duration::from_millis(100));
    assert_eq!(backoff.next_interval(1), Duration::from_millis(200));
    assert_eq!(backoff.next_interval(2), Duration::from_millis(250));
    assert_eq!(backoff.next_interval(60), Duration::from_millis(250));
}

#[test]
fn huge_retry_counts_saturate() {
    let backoff = ExponentialBackoff::new(Duration::from_secs(1));
    assert!(backoff.next_interval(10_000) >= Duration::from_secs(1));
}

#[test]
fn jitter_stays_within_the_factor() {
    let backoff = ExponentialRandomBackoff::new(Duration::from_millis(1000), 0.25);
    for _ in 0..200 {
        let first = backoff.next_interval(0);
        assert!(first >= Duration::from_millis(750), "{first:?}");
        assert!(first <= Duration::from_millis(1250), "{first:?}");

        let third = backoff.next_interval(2);
        assert!(third >= Duration::from_millis(3000), "{third:?}");
        assert!(third <= Duration::from_millis(5000), "{third:?}");
    }
}

#[test]
fn fixed_and_custom_intervals() {
    let fixed = FixedInterval::new(Duration::from_millis(40));
    assert_eq!(fixed.next_interval(0), fixed.next_interval(9));

    let linear = FnInterval::new(|retry| Duration::from_millis(10 * (retry as u64 + 1)));
    assert_eq!(linear.next_interval(0), Duration::from_millis(10));
    assert_eq!(linear.next_interval(4), Duration::from_millis(50));
}

#[tokio::test(start_paused = true)]
async fn custom_backoff_drives_the_sleeps() {
    let policy = RetryPolicy::new(
        RetryConfig::builder()
            .max_attempts(3)
            .backoff(FnInterval::new(|retry| {
                Duration::from_millis(25 * (retry as u64 + 1))
            }))
            .build(),
    );
    let starts = Mutex::new(Vec::new());
    let origin = Instant::now();

    let _: Result<(), _> = policy
        .execute(
            |_| {
                starts.lock().unwrap().push(origin.elapsed());
                async { Err(()) }
            },
            |_| true,
        )
        .await;

    assert_eq!(
        starts.into_inner().unwrap(),
        [0, 25, 75].map(Duration::from_millis).to_vec()
    );
}
