//! Start, wait for a shutdown signal, stop.
//!
//! # Responsibilities
//! - Bound start and stop by the configured deadlines
//! - Roll back started hooks when start fails
//! - Emit run-level events (Started, RollingBack, Stopping, ...)
//!
//! # Design Decisions
//! - Fail fast: any start error is returned after rollback
//! - Deadlines come from the lifecycle's clock, so tests drive them with a
//!   mock clock
//! - A hook that ignores its context is abandoned at the deadline

use std::future::Future;
use std::time::Duration;

use super::{Lifecycle, LifecycleError};
use crate::config::LifecycleConfig;
use crate::context::{Context, ContextError};
use crate::observability::Event;

/// Start `lifecycle`, wait for `signal`, then stop it.
///
/// If start fails, the hooks that did start are stopped and the start error
/// is returned.
pub async fn run<S>(
    lifecycle: &Lifecycle,
    config: &LifecycleConfig,
    signal: S,
) -> Result<(), LifecycleError>
where
    S: Future<Output = ()>,
{
    let root = Context::background();

    if let Err(start_err) = start_within(lifecycle, &root, config.start_timeout()).await {
        lifecycle.logger().log_event(&Event::RollingBack {
            start_err: start_err.to_string(),
        });
        let rollback = stop_within(lifecycle, &root, config.stop_timeout()).await;
        lifecycle.logger().log_event(&Event::RolledBack {
            err: rollback.err().map(|e| e.to_string()),
        });
        lifecycle.logger().log_event(&Event::Started {
            err: Some(start_err.to_string()),
        });
        return Err(start_err);
    }
    lifecycle.logger().log_event(&Event::Started { err: None });

    signal.await;
    lifecycle.logger().log_event(&Event::Stopping);

    let result = stop_within(lifecycle, &root, config.stop_timeout()).await;
    lifecycle.logger().log_event(&Event::Stopped {
        err: result.as_ref().err().map(|e| e.to_string()),
    });
    result
}

/// Start with a deadline `timeout` from now on the lifecycle's clock.
pub async fn start_within(
    lifecycle: &Lifecycle,
    parent: &Context,
    timeout: Duration,
) -> Result<(), LifecycleError> {
    let (ctx, cancel) = lifecycle.clock().with_timeout(parent, timeout);

    let result = tokio::select! {
        biased;
        result = lifecycle.start(&ctx) => result,
        _ = ctx.done() => {
            tracing::warn!(?timeout, "Start abandoned at deadline");
            Err(expired(&ctx).into())
        }
    };

    cancel.cancel();
    result
}

/// Stop with a deadline `timeout` from now on the lifecycle's clock.
pub async fn stop_within(
    lifecycle: &Lifecycle,
    parent: &Context,
    timeout: Duration,
) -> Result<(), LifecycleError> {
    let (ctx, cancel) = lifecycle.clock().with_timeout(parent, timeout);

    let result = tokio::select! {
        biased;
        result = lifecycle.stop(&ctx) => result,
        _ = ctx.done() => {
            tracing::warn!(?timeout, "Stop abandoned at deadline");
            lifecycle.mark_stopped();
            Err(expired(&ctx).into())
        }
    };

    cancel.cancel();
    result
}

fn expired(ctx: &Context) -> ContextError {
    ctx.err().unwrap_or(ContextError::DeadlineExceeded)
}
