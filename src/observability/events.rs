//! Lifecycle events and the sink they are delivered to.

use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use crate::lifecycle::CallerFrame;

/// A structured fact about hook execution or the run loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// An OnStart action is about to run.
    OnStartExecuting {
        function: String,
        caller: CallerFrame,
    },
    /// An OnStart action returned.
    OnStartExecuted {
        function: String,
        caller: CallerFrame,
        runtime: Duration,
        err: Option<String>,
    },
    /// An OnStop action is about to run.
    OnStopExecuting {
        function: String,
        caller: CallerFrame,
    },
    /// An OnStop action returned.
    OnStopExecuted {
        function: String,
        caller: CallerFrame,
        runtime: Duration,
        err: Option<String>,
    },
    /// The start phase finished.
    Started { err: Option<String> },
    /// Start failed; hooks that did start are being stopped.
    RollingBack { start_err: String },
    /// Rollback finished.
    RolledBack { err: Option<String> },
    /// The shutdown signal arrived.
    Stopping,
    /// The stop phase finished.
    Stopped { err: Option<String> },
}

/// Receives lifecycle events.
pub trait EventLogger: Send + Sync {
    fn log_event(&self, event: &Event);
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NopLogger;

impl EventLogger for NopLogger {
    fn log_event(&self, _event: &Event) {}
}

/// Keeps every event in memory, in arrival order.
#[derive(Debug, Default)]
pub struct MemoryLogger {
    events: Mutex<Vec<Event>>,
}

impl MemoryLogger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the events received so far.
    pub fn events(&self) -> Vec<Event> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl EventLogger for MemoryLogger {
    fn log_event(&self, event: &Event) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event.clone());
    }
}
