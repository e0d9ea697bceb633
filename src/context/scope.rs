//! The `Context` type and its cancel handle.

use std::any::Any;
use std::fmt;
use std::sync::{Arc, OnceLock};
use std::time::SystemTime;

use tokio_util::sync::CancellationToken;

use super::ContextError;

/// A cancellable scope with an optional deadline and typed values.
///
/// Cloning is cheap; clones observe the same cancellation.
#[derive(Clone)]
pub struct Context {
    inner: Arc<Inner>,
}

struct Inner {
    parent: Option<Context>,
    token: CancellationToken,
    /// Set at most once, before `token` is cancelled.
    reason: OnceLock<ContextError>,
    deadline: Option<SystemTime>,
    value: Option<Arc<dyn Any + Send + Sync>>,
}

impl Context {
    /// The root scope. It is never done.
    pub fn background() -> Self {
        Self {
            inner: Arc::new(Inner {
                parent: None,
                token: CancellationToken::new(),
                reason: OnceLock::new(),
                deadline: None,
                value: None,
            }),
        }
    }

    /// Derive a child scope that can be cancelled independently of `self`.
    pub fn with_cancel(&self) -> (Context, CancelHandle) {
        let child = self.child(None);
        let handle = CancelHandle::new(child.clone());
        (child, handle)
    }

    /// Derive a child scope carrying `value`, retrievable with [`Context::value`].
    pub fn with_value<T: Any + Send + Sync>(&self, value: T) -> Context {
        self.derive(None, Some(Arc::new(value)))
    }

    /// Look up the nearest value of type `T`, walking towards the root.
    pub fn value<T: Any + Send + Sync>(&self) -> Option<&T> {
        let mut current = Some(self);
        while let Some(ctx) = current {
            if let Some(found) = ctx
                .inner
                .value
                .as_ref()
                .and_then(|v| (**v).downcast_ref::<T>())
            {
                return Some(found);
            }
            current = ctx.inner.parent.as_ref();
        }
        None
    }

    /// The earliest deadline of this scope or any ancestor.
    pub fn deadline(&self) -> Option<SystemTime> {
        self.inner.deadline
    }

    /// Wait until the scope is done.
    pub async fn done(&self) {
        self.inner.token.cancelled().await;
    }

    /// Return true if the scope is cancelled or past its deadline.
    pub fn is_done(&self) -> bool {
        self.inner.token.is_cancelled()
    }

    /// Why the scope is done, or `None` while it is still live.
    pub fn err(&self) -> Option<ContextError> {
        if !self.is_done() {
            return None;
        }
        if let Some(reason) = self.inner.reason.get() {
            return Some(*reason);
        }
        match &self.inner.parent {
            Some(parent) => parent.err(),
            None => Some(ContextError::Canceled),
        }
    }

    /// Create a child scope whose deadline is the earlier of `deadline` and
    /// the parent's.
    pub(crate) fn child(&self, deadline: Option<SystemTime>) -> Context {
        self.derive(deadline, None)
    }

    fn derive(
        &self,
        deadline: Option<SystemTime>,
        value: Option<Arc<dyn Any + Send + Sync>>,
    ) -> Context {
        let deadline = match (self.deadline(), deadline) {
            (Some(parent), Some(own)) => Some(parent.min(own)),
            (parent, own) => own.or(parent),
        };
        Context {
            inner: Arc::new(Inner {
                parent: Some(self.clone()),
                token: self.inner.token.child_token(),
                reason: OnceLock::new(),
                deadline,
                value,
            }),
        }
    }

    /// Mark the scope done with `reason` unless it is already done.
    pub(crate) fn cancel_with(&self, reason: ContextError) {
        if self.inner.token.is_cancelled() {
            return;
        }
        let _ = self.inner.reason.set(reason);
        self.inner.token.cancel();
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::background()
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("deadline", &self.inner.deadline)
            .field("err", &self.err())
            .field("has_value", &self.inner.value.is_some())
            .finish()
    }
}

/// Cancels the [`Context`] it was created with.
///
/// Dropping the handle does not cancel; call [`CancelHandle::cancel`].
pub struct CancelHandle {
    ctx: Context,
    release: Option<Box<dyn Fn() + Send + Sync>>,
}

impl CancelHandle {
    pub(crate) fn new(ctx: Context) -> Self {
        Self { ctx, release: None }
    }

    /// Attach a callback run on every `cancel`, used by clocks to drop timers.
    pub(crate) fn with_release(mut self, release: impl Fn() + Send + Sync + 'static) -> Self {
        self.release = Some(Box::new(release));
        self
    }

    /// Cancel the scope with [`ContextError::Canceled`]. Idempotent; a scope
    /// that already hit its deadline keeps reporting `DeadlineExceeded`.
    pub fn cancel(&self) {
        self.ctx.cancel_with(ContextError::Canceled);
        if let Some(release) = &self.release {
            release();
        }
    }
}

impl fmt::Debug for CancelHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancelHandle").field("ctx", &self.ctx).finish()
    }
}
