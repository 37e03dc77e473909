use callgate_bulkhead::{Bulkhead, BulkheadConfig};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

fn bulkhead(released: Arc<AtomicUsize>) -> Bulkhead {
    Bulkhead::new(
        BulkheadConfig::builder()
            .name("permits")
            .max_concurrent_calls(2)
            .on_call_released(move |_| {
                released.fetch_add(1, Ordering::SeqCst);
            })
            .build(),
    )
}

#[tokio::test]
async fn explicit_release_and_drop_each_release_once() {
    let released = Arc::new(AtomicUsize::new(0));
    let bulkhead = bulkhead(Arc::clone(&released));

    let a = bulkhead.acquire().await.unwrap();
    let b = bulkhead.acquire().await.unwrap();
    assert_eq!(bulkhead.in_flight(), 2);

    a.release();
    drop(b);

    assert_eq!(released.load(Ordering::SeqCst), 2);
    assert_eq!(bulkhead.in_flight(), 0);
    assert_eq!(bulkhead.available_permits(), 2);
}

#[tokio::test]
async fn cancelled_task_releases_its_permit() {
    let released = Arc::new(AtomicUsize::new(0));
    let bulkhead = bulkhead(Arc::clone(&released));
    let (started_tx, started_rx) = tokio::sync::oneshot::channel();

    let task = {
        let bulkhead = bulkhead.clone();
        tokio::spawn(async move {
            let _permit = bulkhead.acquire().await.unwrap();
            let _ = started_tx.send(());
            std::future::pending::<()>().await;
        })
    };
    started_rx.await.unwrap();
    assert_eq!(bulkhead.in_flight(), 1);

    task.abort();
    assert!(task.await.unwrap_err().is_cancelled());

    assert_eq!(bulkhead.in_flight(), 0);
    assert_eq!(released.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn panicking_task_releases_its_permit() {
    let released = Arc::new(AtomicUsize::new(0));
    let bulkhead = bulkhead(Arc::clone(&released));

    let task = {
        let bulkhead = bulkhead.clone();
        tokio::spawn(async move {
            let _permit = bulkhead.acquire().await.unwrap();
            panic!("call blew up");
        })
    };
    assert!(task.await.unwrap_err().is_panic());

    let stats = bulkhead.stats();
    assert_eq!(stats.acquired_total, stats.released_total);
    assert_eq!(stats.in_flight, 0);
}

#[tokio::test(start_paused = true)]
async fn dropped_waiter_acquires_nothing() {
    let released = Arc::new(AtomicUsize::new(0));
    let bulkhead = Bulkhead::new(
        BulkheadConfig::builder()
            .max_concurrent_calls(1)
            .on_call_released(move |_| {
                released.fetch_add(1, Ordering::SeqCst);
            })
            .build(),
    );
    let held = bulkhead.acquire().await.unwrap();

    let waiting = tokio::time::timeout(Duration::from_millis(10), bulkhead.acquire()).await;
    assert!(waiting.is_err());

    held.release();
    let stats = bulkhead.stats();
    assert_eq!(stats.acquired_total, 1);
    assert_eq!(stats.released_total, 1);
    assert_eq!(bulkhead.available_permits(), 1);
}
