//! Time source abstraction.
//!
//! # Data Flow
//! ```text
//! Lifecycle
//!     → Clock::now / since (hook runtime measurement)
//!     → Clock::with_timeout (start/stop deadlines in `lifecycle::run`)
//!
//! SystemClock: OS wall clock + Tokio timers
//! MockClock:   virtual time, advanced only by `add` / `set`
//! ```
//!
//! # Design Decisions
//! - Clocks are passed in explicitly, never read from a global
//! - Wall-clock `SystemTime` so records and deadlines are printable
//! - The mock is a small discrete-event scheduler: waiters fire in
//!   deadline order, each observing `now()` equal to its own deadline

pub mod mock;
pub mod system;

use std::time::{Duration, SystemTime};

use async_trait::async_trait;

use crate::context::{CancelHandle, Context};

pub use mock::MockClock;
pub use system::SystemClock;

/// A source of time and timers.
#[async_trait]
pub trait Clock: Send + Sync + 'static {
    /// The current time.
    fn now(&self) -> SystemTime;

    /// Time elapsed since `earlier`, or zero if `earlier` is in the future.
    fn since(&self, earlier: SystemTime) -> Duration {
        self.now().duration_since(earlier).unwrap_or_default()
    }

    /// Wait until `duration` has passed on this clock.
    async fn sleep(&self, duration: Duration);

    /// Derive a scope from `parent` that expires at `deadline`.
    fn with_deadline(&self, parent: &Context, deadline: SystemTime) -> (Context, CancelHandle);

    /// Derive a scope from `parent` that expires after `timeout`.
    fn with_timeout(&self, parent: &Context, timeout: Duration) -> (Context, CancelHandle) {
        self.with_deadline(parent, self.now() + timeout)
    }
}
