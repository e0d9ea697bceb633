//! Virtual time: sleepers, timeouts and scheduling through the public API.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, UNIX_EPOCH};

use stagehand::clock::{Clock, MockClock};
use stagehand::{Context, ContextError};

fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

#[tokio::test]
#[should_panic(expected = "cannot move mock clock backwards")]
async fn test_set_backwards_panics() {
    let clock = MockClock::starting_at(UNIX_EPOCH + Duration::from_secs(10));
    clock.set(UNIX_EPOCH).await;
}

#[tokio::test]
async fn test_sleep_released_only_when_fully_elapsed() {
    let clock = MockClock::new();
    let woke = Arc::new(AtomicBool::new(false));

    let sleeper = {
        let clock = clock.clone();
        let woke = woke.clone();
        tokio::spawn(async move {
            clock.sleep(ms(2)).await;
            woke.store(true, Ordering::SeqCst);
        })
    };

    clock.await_scheduled(1).await;
    clock.add(ms(1)).await;
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
    assert!(!woke.load(Ordering::SeqCst));
    assert_eq!(clock.scheduled(), 1);

    clock.add(ms(1)).await;
    sleeper.await.unwrap();
    assert!(woke.load(Ordering::SeqCst));
    assert_eq!(clock.scheduled(), 0);
}

#[tokio::test]
async fn test_await_scheduled_waits_for_registration() {
    let clock = MockClock::new();
    assert_eq!(clock.scheduled(), 0);

    let sleepers: Vec<_> = (1..=3)
        .map(|n| {
            let clock = clock.clone();
            tokio::spawn(async move { clock.sleep(Duration::from_secs(n)).await })
        })
        .collect();

    clock.await_scheduled(3).await;
    assert_eq!(clock.scheduled(), 3);

    clock.add(Duration::from_secs(3)).await;
    for sleeper in sleepers {
        sleeper.await.unwrap();
    }
}

#[tokio::test]
async fn test_many_sleepers_released_by_one_add() {
    let clock = MockClock::new();
    let woke = Arc::new(AtomicUsize::new(0));

    let sleepers: Vec<_> = (0..100)
        .map(|_| {
            let clock = clock.clone();
            let woke = woke.clone();
            tokio::spawn(async move {
                clock.sleep(ms(1)).await;
                woke.fetch_add(1, Ordering::SeqCst);
            })
        })
        .collect();

    clock.await_scheduled(100).await;
    clock.add(ms(1)).await;

    for sleeper in sleepers {
        sleeper.await.unwrap();
    }
    assert_eq!(woke.load(Ordering::SeqCst), 100);
}

#[tokio::test]
async fn test_timeout_expires_after_add() {
    let clock = MockClock::new();
    let (ctx, _cancel) = clock.with_timeout(&Context::background(), Duration::from_secs(1));
    assert_eq!(ctx.deadline(), Some(UNIX_EPOCH + Duration::from_secs(1)));
    assert_eq!(ctx.err(), None);

    clock.add(ms(999)).await;
    assert_eq!(ctx.err(), None);

    clock.add(ms(1)).await;
    ctx.done().await;
    assert_eq!(ctx.err(), Some(ContextError::DeadlineExceeded));
}

#[tokio::test]
async fn test_cancel_before_deadline_wins() {
    let clock = MockClock::new();
    let (ctx, cancel) = clock.with_timeout(&Context::background(), Duration::from_secs(1));

    cancel.cancel();
    clock.add(Duration::from_secs(1)).await;

    assert_eq!(ctx.err(), Some(ContextError::Canceled));
}

#[tokio::test]
async fn test_child_of_expired_scope_is_done() {
    let clock = MockClock::new();
    let (parent, _cancel) = clock.with_timeout(&Context::background(), Duration::from_secs(1));
    clock.add(Duration::from_secs(1)).await;

    let (child, _cancel) = clock.with_timeout(&parent, Duration::from_secs(10));
    assert_eq!(child.err(), Some(ContextError::DeadlineExceeded));
    assert_eq!(clock.scheduled(), 0);
}
