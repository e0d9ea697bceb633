//! Wall-clock implementation backed by the OS and the Tokio timer.

use std::time::{Duration, SystemTime};

use async_trait::async_trait;

use super::Clock;
use crate::context::{CancelHandle, Context, ContextError};

/// The real clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

#[async_trait]
impl Clock for SystemClock {
    fn now(&self) -> SystemTime {
        SystemTime::now()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }

    /// Must be called from within a Tokio runtime: the deadline is enforced
    /// by a spawned timer task that exits early once the scope is done.
    fn with_deadline(&self, parent: &Context, deadline: SystemTime) -> (Context, CancelHandle) {
        let ctx = parent.child(Some(deadline));
        let handle = CancelHandle::new(ctx.clone());

        let remaining = match deadline.duration_since(SystemTime::now()) {
            Ok(remaining) if !remaining.is_zero() => remaining,
            _ => {
                ctx.cancel_with(ContextError::DeadlineExceeded);
                return (ctx, handle);
            }
        };

        let timer_ctx = ctx.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = tokio::time::sleep(remaining) => {
                    timer_ctx.cancel_with(ContextError::DeadlineExceeded);
                }
                _ = timer_ctx.done() => {}
            }
        });

        (ctx, handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_timeout_expires() {
        let clock = SystemClock;
        let (ctx, _cancel) = clock.with_timeout(&Context::background(), Duration::from_millis(10));
        assert!(ctx.deadline().is_some());

        ctx.done().await;
        assert_eq!(ctx.err(), Some(ContextError::DeadlineExceeded));
    }

    #[tokio::test]
    async fn test_cancel_before_timeout() {
        let clock = SystemClock;
        let (ctx, cancel) = clock.with_timeout(&Context::background(), Duration::from_secs(60));
        cancel.cancel();
        assert_eq!(ctx.err(), Some(ContextError::Canceled));
    }

    #[tokio::test]
    async fn test_past_deadline_is_done_immediately() {
        let clock = SystemClock;
        let (ctx, _cancel) = clock.with_deadline(&Context::background(), SystemTime::UNIX_EPOCH);
        assert_eq!(ctx.err(), Some(ContextError::DeadlineExceeded));
    }

    #[tokio::test]
    async fn test_since_is_non_negative() {
        let clock = SystemClock;
        let start = clock.now();
        clock.sleep(Duration::from_millis(5)).await;
        assert!(clock.since(start) >= Duration::from_millis(5));
        assert_eq!(clock.since(start + Duration::from_secs(3600)), Duration::ZERO);
    }
}
