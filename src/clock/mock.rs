//! Virtual clock for deterministic tests.
//!
//! Time only moves when a test calls [`MockClock::add`] or [`MockClock::set`].
//! Everything that waits on the clock (`sleep`, `with_timeout`,
//! `with_deadline`) registers a *waiter*: a deadline plus a callback. Advancing
//! time drains due waiters earliest-first.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use stagehand::clock::{Clock, MockClock};
//!
//! # #[tokio::main] async fn main() {
//! let clock = MockClock::new();
//! let sleeper = {
//!     let clock = clock.clone();
//!     tokio::spawn(async move { clock.sleep(Duration::from_secs(5)).await })
//! };
//!
//! clock.await_scheduled(1).await;
//! clock.add(Duration::from_secs(5)).await;
//! sleeper.await.unwrap();
//! # }
//! ```

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use tokio::sync::{oneshot, watch};

use super::Clock;
use crate::context::{CancelHandle, Context, ContextError};

/// Real time granted to other tasks after each waiter fires, so that work
/// woken by the callback is visible before the next waiter runs.
const SETTLE_DELAY: Duration = Duration::from_millis(1);

type Callback = Box<dyn FnOnce() + Send + 'static>;

struct Waiter {
    id: u64,
    deadline: SystemTime,
    fire: Callback,
}

struct Schedule {
    now: SystemTime,
    next_id: u64,
    waiters: Vec<Waiter>,
}

struct Shared {
    schedule: Mutex<Schedule>,
    /// Number of pending waiters, republished on every change.
    scheduled: watch::Sender<usize>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Schedule> {
        self.schedule.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, schedule: &Schedule) {
        let count = schedule.waiters.len();
        self.scheduled.send_if_modified(|current| {
            let changed = *current != count;
            *current = count;
            changed
        });
    }

    /// Register `fire` to run at `deadline`. A deadline that has already been
    /// reached fires inline and registers nothing.
    fn schedule(&self, deadline: SystemTime, fire: Callback) -> Option<u64> {
        let mut schedule = self.lock();
        if deadline <= schedule.now {
            drop(schedule);
            fire();
            return None;
        }

        let id = schedule.next_id;
        schedule.next_id += 1;
        schedule.waiters.push(Waiter { id, deadline, fire });
        self.publish(&schedule);
        Some(id)
    }

    fn schedule_after(&self, duration: Duration, fire: Callback) -> Option<u64> {
        let deadline = self.lock().now + duration;
        self.schedule(deadline, fire)
    }

    fn remove(&self, id: u64) {
        let mut schedule = self.lock();
        schedule.waiters.retain(|w| w.id != id);
        self.publish(&schedule);
    }

    /// Take the earliest waiter due at or before `target` and move `now` to
    /// its deadline.
    fn pop_due(&self, target: SystemTime) -> Option<Waiter> {
        let mut schedule = self.lock();
        schedule.waiters.sort_by_key(|w| (w.deadline, w.id));

        let due = schedule.waiters.first().is_some_and(|w| w.deadline <= target);
        if !due {
            return None;
        }

        let waiter = schedule.waiters.remove(0);
        if waiter.deadline > schedule.now {
            schedule.now = waiter.deadline;
        }
        self.publish(&schedule);
        Some(waiter)
    }
}

/// Deregisters a sleeper's waiter if the sleep future is dropped early.
struct Registration {
    shared: Arc<Shared>,
    id: u64,
}

impl Drop for Registration {
    fn drop(&mut self) {
        self.shared.remove(self.id);
    }
}

/// A clock whose time only advances under test control.
///
/// Clones share the same virtual time and waiters.
#[derive(Clone)]
pub struct MockClock {
    shared: Arc<Shared>,
}

impl MockClock {
    /// A mock clock starting at the Unix epoch.
    pub fn new() -> Self {
        Self::starting_at(UNIX_EPOCH)
    }

    /// A mock clock starting at `now`.
    pub fn starting_at(now: SystemTime) -> Self {
        let (scheduled, _) = watch::channel(0);
        Self {
            shared: Arc::new(Shared {
                schedule: Mutex::new(Schedule {
                    now,
                    next_id: 0,
                    waiters: Vec::new(),
                }),
                scheduled,
            }),
        }
    }

    /// Advance virtual time by `duration`, firing every waiter that falls due
    /// in deadline order.
    ///
    /// While a waiter's callback runs, `now()` reports that waiter's deadline
    /// and the lock is released, so callbacks may register new waiters; those
    /// also fire if they fall within the advanced window.
    pub async fn add(&self, duration: Duration) {
        let target = self.shared.lock().now + duration;

        let mut fired = 0usize;
        while let Some(waiter) = self.shared.pop_due(target) {
            (waiter.fire)();
            fired += 1;
            tokio::time::sleep(SETTLE_DELAY).await;
        }

        let mut schedule = self.shared.lock();
        if schedule.now < target {
            schedule.now = target;
        }
        tracing::trace!(fired, pending = schedule.waiters.len(), "Mock clock advanced");
    }

    /// Move virtual time forward to `instant`.
    ///
    /// # Panics
    ///
    /// Panics if `instant` is earlier than the current virtual time.
    pub async fn set(&self, instant: SystemTime) {
        let now = self.now();
        let delta = match instant.duration_since(now) {
            Ok(delta) => delta,
            Err(_) => panic!(
                "cannot move mock clock backwards: now={:?}, requested={:?}",
                now, instant
            ),
        };
        self.add(delta).await;
    }

    /// Wait until at least `count` waiters are registered.
    ///
    /// Lets a test avoid advancing time before a concurrent `sleep` or
    /// `with_timeout` has registered its waiter.
    pub async fn await_scheduled(&self, count: usize) {
        let mut rx = self.shared.scheduled.subscribe();
        // The sender lives as long as `self`, so this only returns Ok.
        let _ = rx.wait_for(|scheduled| *scheduled >= count).await;
    }

    /// Number of waiters currently registered.
    pub fn scheduled(&self) -> usize {
        self.shared.lock().waiters.len()
    }
}

impl Default for MockClock {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for MockClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let schedule = self.shared.lock();
        f.debug_struct("MockClock")
            .field("now", &schedule.now)
            .field("scheduled", &schedule.waiters.len())
            .finish()
    }
}

#[async_trait]
impl Clock for MockClock {
    fn now(&self) -> SystemTime {
        self.shared.lock().now
    }

    /// Blocks until virtual time has advanced by `duration`. A zero duration
    /// returns immediately.
    async fn sleep(&self, duration: Duration) {
        if duration.is_zero() {
            return;
        }

        let (tx, rx) = oneshot::channel();
        let id = self.shared.schedule_after(
            duration,
            Box::new(move || {
                let _ = tx.send(());
            }),
        );
        let _registration = id.map(|id| Registration {
            shared: self.shared.clone(),
            id,
        });
        let _ = rx.await;
    }

    fn with_deadline(&self, parent: &Context, deadline: SystemTime) -> (Context, CancelHandle) {
        let ctx = parent.child(Some(deadline));
        if ctx.is_done() {
            return (ctx.clone(), CancelHandle::new(ctx));
        }

        let timer_ctx = ctx.clone();
        let id = self.shared.schedule(
            deadline,
            Box::new(move || timer_ctx.cancel_with(ContextError::DeadlineExceeded)),
        );

        let handle = CancelHandle::new(ctx.clone());
        let handle = match id {
            Some(id) => {
                let shared = self.shared.clone();
                handle.with_release(move || shared.remove(id))
            }
            None => handle,
        };
        (ctx, handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex as StdMutex;

    fn secs(n: u64) -> Duration {
        Duration::from_secs(n)
    }

    #[tokio::test]
    async fn test_waiters_fire_in_deadline_order() {
        let clock = MockClock::new();
        let seen = Arc::new(StdMutex::new(Vec::new()));

        for offset in [3, 1, 2] {
            let seen = seen.clone();
            let observer = clock.clone();
            clock.shared.schedule(
                UNIX_EPOCH + secs(offset),
                Box::new(move || seen.lock().unwrap().push((offset, observer.now()))),
            );
        }

        clock.add(secs(5)).await;

        let seen = seen.lock().unwrap().clone();
        assert_eq!(
            seen,
            vec![
                (1, UNIX_EPOCH + secs(1)),
                (2, UNIX_EPOCH + secs(2)),
                (3, UNIX_EPOCH + secs(3)),
            ]
        );
        assert_eq!(clock.now(), UNIX_EPOCH + secs(5));
        assert_eq!(clock.scheduled(), 0);
    }

    #[tokio::test]
    async fn test_equal_deadlines_fire_in_registration_order() {
        let clock = MockClock::new();
        let seen = Arc::new(StdMutex::new(Vec::new()));

        for label in ["first", "second", "third"] {
            let seen = seen.clone();
            clock
                .shared
                .schedule(UNIX_EPOCH + secs(1), Box::new(move || seen.lock().unwrap().push(label)));
        }

        clock.add(secs(1)).await;
        assert_eq!(*seen.lock().unwrap(), vec!["first", "second", "third"]);
    }

    #[tokio::test]
    async fn test_callback_may_schedule_within_window() {
        let clock = MockClock::new();
        let seen = Arc::new(StdMutex::new(Vec::new()));

        let inner_seen = seen.clone();
        let inner_clock = clock.clone();
        clock.shared.schedule(
            UNIX_EPOCH + secs(1),
            Box::new(move || {
                let later_seen = inner_seen.clone();
                let observer = inner_clock.clone();
                inner_clock.shared.schedule_after(
                    secs(1),
                    Box::new(move || later_seen.lock().unwrap().push(observer.now())),
                );
                inner_seen.lock().unwrap().push(inner_clock.now());
            }),
        );

        clock.add(secs(3)).await;
        assert_eq!(
            *seen.lock().unwrap(),
            vec![UNIX_EPOCH + secs(1), UNIX_EPOCH + secs(2)]
        );
    }

    #[tokio::test]
    async fn test_waiters_past_target_stay_pending() {
        let clock = MockClock::new();
        clock.shared.schedule(UNIX_EPOCH + secs(10), Box::new(|| {}));

        clock.add(secs(9)).await;
        assert_eq!(clock.scheduled(), 1);
        assert_eq!(clock.now(), UNIX_EPOCH + secs(9));
    }

    #[tokio::test]
    async fn test_dropped_sleep_deregisters() {
        let clock = MockClock::new();
        let sleeper = {
            let clock = clock.clone();
            tokio::spawn(async move { clock.sleep(secs(1)).await })
        };

        clock.await_scheduled(1).await;
        sleeper.abort();
        let _ = sleeper.await;

        assert_eq!(clock.scheduled(), 0);
    }

    #[tokio::test]
    async fn test_cancel_deregisters_timeout() {
        let clock = MockClock::new();
        let (ctx, cancel) = clock.with_timeout(&Context::background(), secs(1));
        assert_eq!(clock.scheduled(), 1);

        cancel.cancel();
        assert_eq!(clock.scheduled(), 0);
        assert_eq!(ctx.err(), Some(ContextError::Canceled));
    }

    #[tokio::test]
    async fn test_zero_timeout_expires_immediately() {
        let clock = MockClock::new();
        let (ctx, _cancel) = clock.with_timeout(&Context::background(), Duration::ZERO);
        assert_eq!(ctx.err(), Some(ContextError::DeadlineExceeded));
        assert_eq!(clock.scheduled(), 0);
    }

    #[tokio::test]
    async fn test_set_moves_forward() {
        let clock = MockClock::starting_at(UNIX_EPOCH + secs(100));
        clock.set(UNIX_EPOCH + secs(150)).await;
        assert_eq!(clock.since(UNIX_EPOCH + secs(100)), secs(50));
    }
}
