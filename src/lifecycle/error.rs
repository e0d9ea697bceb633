//! Lifecycle error taxonomy.

use thiserror::Error;

use super::{LifecycleState, Phase};
use crate::context::ContextError;

/// Errors returned by `Lifecycle::start` and `Lifecycle::stop`.
#[derive(Debug, Error)]
pub enum LifecycleError {
    /// `start` or `stop` was called without a context.
    #[error("called {0} with nil context")]
    NilContext(Phase),

    /// `start` was called while the lifecycle was not stopped.
    #[error("attempted to start lifecycle when in state: {0}")]
    InvalidState(LifecycleState),

    /// A `stop` took over while this `start` was still running hooks.
    #[error("start interrupted by stop, lifecycle now in state: {0}")]
    Interrupted(LifecycleState),

    /// The context was done before or between hooks.
    #[error(transparent)]
    Context(#[from] ContextError),

    /// A hook action returned an error. Displays as the hook's own error.
    #[error(transparent)]
    Hook(anyhow::Error),

    /// Several OnStop actions failed.
    #[error("{}", join(.0))]
    Multiple(Vec<LifecycleError>),
}

fn join(errors: &[LifecycleError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl LifecycleError {
    /// Collapse collected errors: none is success, one is itself, more
    /// become [`LifecycleError::Multiple`].
    pub(crate) fn combine(mut errors: Vec<LifecycleError>) -> Result<(), LifecycleError> {
        match errors.len() {
            0 => Ok(()),
            1 => Err(errors.remove(0)),
            _ => Err(LifecycleError::Multiple(errors)),
        }
    }

    /// The individual errors, flattening [`LifecycleError::Multiple`].
    pub fn errors(&self) -> Vec<&LifecycleError> {
        match self {
            LifecycleError::Multiple(errors) => errors.iter().flat_map(|e| e.errors()).collect(),
            other => vec![other],
        }
    }

    /// The context error, if this error (or any component) came from one.
    pub fn context_error(&self) -> Option<ContextError> {
        self.errors().into_iter().find_map(|e| match e {
            LifecycleError::Context(err) => Some(*err),
            _ => None,
        })
    }

    /// The hook's own error, if this is a single hook failure.
    pub fn hook_error(&self) -> Option<&anyhow::Error> {
        match self {
            LifecycleError::Hook(err) => Some(err),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        assert_eq!(
            LifecycleError::NilContext(Phase::Start).to_string(),
            "called OnStart with nil context"
        );
        assert_eq!(
            LifecycleError::InvalidState(LifecycleState::Started).to_string(),
            "attempted to start lifecycle when in state: started"
        );
        assert_eq!(
            LifecycleError::from(ContextError::Canceled).to_string(),
            "context canceled"
        );
        assert_eq!(
            LifecycleError::Hook(anyhow::anyhow!("disk full")).to_string(),
            "disk full"
        );
    }

    #[test]
    fn test_combine() {
        assert!(LifecycleError::combine(Vec::new()).is_ok());

        let single = LifecycleError::combine(vec![ContextError::Canceled.into()]).unwrap_err();
        assert!(matches!(single, LifecycleError::Context(ContextError::Canceled)));

        let multiple = LifecycleError::combine(vec![
            LifecycleError::Hook(anyhow::anyhow!("a")),
            LifecycleError::Hook(anyhow::anyhow!("b")),
            ContextError::DeadlineExceeded.into(),
        ])
        .unwrap_err();
        assert_eq!(multiple.to_string(), "a; b; context deadline exceeded");
        assert_eq!(multiple.errors().len(), 3);
        assert_eq!(multiple.context_error(), Some(ContextError::DeadlineExceeded));
        assert!(multiple.hook_error().is_none());
    }
}
