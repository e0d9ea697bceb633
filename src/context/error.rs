//! Context termination reasons.

use thiserror::Error;

/// Why a [`Context`](super::Context) is done.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ContextError {
    /// The scope was cancelled explicitly through its [`CancelHandle`](super::CancelHandle).
    #[error("context canceled")]
    Canceled,

    /// The scope's deadline passed before it was cancelled.
    #[error("context deadline exceeded")]
    DeadlineExceeded,
}

impl ContextError {
    /// Return true if this error came from a deadline rather than a cancel.
    pub fn is_deadline_exceeded(&self) -> bool {
        matches!(self, ContextError::DeadlineExceeded)
    }
}
