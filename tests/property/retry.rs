//! Property tests for the retry policy.
//!
//! Invariants tested:
//! - `max - 1` failures followed by a success return the success
//! - `max` failures exhaust with `attempts == max`
//! - Total backoff equals the sum of the configured delays

use callgate_retry::{RetryConfig, RetryError, RetryPolicy};
use proptest::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::runtime::Builder;
use tokio::time::Instant;

fn runtime() -> tokio::runtime::Runtime {
    Builder::new_current_thread()
        .enable_time()
        .start_paused(true)
        .build()
        .unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(50))]

    #[test]
    fn attempts_never_exceed_the_maximum(
        max_attempts in 1usize..=8,
        failures in 0usize..=10,
        base_ms in 0u64..=50,
    ) {
        let policy = RetryPolicy::new(
            RetryConfig::builder()
                .name("prop")
                .max_attempts(max_attempts)
                .exponential_backoff(Duration::from_millis(base_ms))
                .build(),
        );
        let calls = AtomicUsize::new(0);

        let (result, elapsed) = runtime().block_on(async {
            let start = Instant::now();
            let result = policy
                .execute(
                    |ctx| {
                        calls.fetch_add(1, Ordering::SeqCst);
                        async move {
                            if ctx.attempt <= failures { Err(ctx.attempt) } else { Ok(ctx.attempt) }
                        }
                    },
                    |_| true,
                )
                .await;
            (result, start.elapsed())
        });

        let made = calls.load(Ordering::SeqCst);
        if failures < max_attempts {
            prop_assert_eq!(result, Ok(failures + 1));
            prop_assert_eq!(made, failures + 1);
        } else {
            prop_assert_eq!(
                result,
                Err(RetryError::Exhausted {
                    name: "prop".to_string(),
                    attempts: max_attempts,
                    last: max_attempts,
                })
            );
            prop_assert_eq!(made, max_attempts);
        }

        let expected: u64 = (0..made - 1).map(|retry| base_ms << retry).sum();
        prop_assert_eq!(elapsed, Duration::from_millis(expected));
    }
}
