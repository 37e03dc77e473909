//! Property tests for the bulkhead.
//!
//! Invariants tested:
//! - Concurrency never exceeds the configured maximum
//! - Every acquired permit is released exactly once

use callgate_bulkhead::{Bulkhead, BulkheadConfig};
use proptest::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Builder;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(30))]

    #[test]
    fn concurrency_is_bounded_and_permits_balance(
        max_concurrent in 1usize..=8,
        tasks in 1usize..=60,
        wait_ms in prop::option::of(0u64..20),
        hold_ms in prop::collection::vec(0u64..5, 60),
    ) {
        let rt = Builder::new_current_thread()
            .enable_time()
            .start_paused(true)
            .build()
            .unwrap();

        rt.block_on(async {
            let bulkhead = Bulkhead::new(
                BulkheadConfig::builder()
                    .max_concurrent_calls(max_concurrent)
                    .max_wait_duration(wait_ms.map(Duration::from_millis))
                    .build(),
            );
            let current = Arc::new(AtomicUsize::new(0));
            let peak = Arc::new(AtomicUsize::new(0));

            let handles: Vec<_> = (0..tasks)
                .map(|i| {
                    let bulkhead = bulkhead.clone();
                    let current = Arc::clone(&current);
                    let peak = Arc::clone(&peak);
                    let hold = Duration::from_millis(hold_ms[i]);
                    tokio::spawn(async move {
                        let Ok(permit) = bulkhead.acquire().await else {
                            return false;
                        };
                        let now = current.fetch_add(1, Ordering::SeqCst) + 1;
                        peak.fetch_max(now, Ordering::SeqCst);
                        tokio::time::sleep(hold).await;
                        current.fetch_sub(1, Ordering::SeqCst);
                        permit.release();
                        true
                    })
                })
                .collect();

            let mut admitted = 0u64;
            for handle in handles {
                if handle.await.unwrap() {
                    admitted += 1;
                }
            }

            let stats = bulkhead.stats();
            prop_assert!(peak.load(Ordering::SeqCst) <= max_concurrent);
            prop_assert_eq!(stats.acquired_total, admitted);
            prop_assert_eq!(stats.released_total, admitted);
            prop_assert_eq!(stats.rejected_total, tasks as u64 - admitted);
            prop_assert_eq!(stats.in_flight, 0);
            if wait_ms.is_none() {
                prop_assert_eq!(admitted, tasks as u64);
            }
            Ok(())
        })?;
    }
}
