//! Shared utilities for lifecycle integration tests.

use std::sync::{Arc, Mutex};

use stagehand::clock::MockClock;
use stagehand::observability::MemoryLogger;
use stagehand::{Hook, Lifecycle};

/// Ordered log of hook invocations, shared between hooks.
#[derive(Clone, Default)]
pub struct Calls(Arc<Mutex<Vec<String>>>);

#[allow(dead_code)]
impl Calls {
    pub fn push(&self, call: impl Into<String>) {
        self.0.lock().unwrap().push(call.into());
    }

    pub fn snapshot(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }
}

/// A lifecycle wired to an in-memory event log and a mock clock.
#[allow(dead_code)]
pub struct Harness {
    pub lifecycle: Lifecycle,
    pub logger: Arc<MemoryLogger>,
    pub clock: MockClock,
    pub calls: Calls,
}

#[allow(dead_code)]
pub fn harness() -> Harness {
    let logger = Arc::new(MemoryLogger::new());
    let clock = MockClock::new();
    Harness {
        lifecycle: Lifecycle::new(logger.clone(), Arc::new(clock.clone())),
        logger,
        clock,
        calls: Calls::default(),
    }
}

/// A hook that records `start <name>` and `stop <name>`.
#[allow(dead_code)]
pub fn tracked(calls: &Calls, name: &'static str) -> Hook {
    let on_start = calls.clone();
    let on_stop = calls.clone();
    Hook::new()
        .on_start(move |_| {
            on_start.push(format!("start {name}"));
            async { Ok(()) }
        })
        .on_stop(move |_| {
            on_stop.push(format!("stop {name}"));
            async { Ok(()) }
        })
}

/// Like [`tracked`], but OnStart fails with `start <name> failed`.
#[allow(dead_code)]
pub fn failing_start(calls: &Calls, name: &'static str) -> Hook {
    let on_start = calls.clone();
    let on_stop = calls.clone();
    Hook::new()
        .on_start(move |_| {
            on_start.push(format!("start {name}"));
            async move { Err(anyhow::anyhow!("start {name} failed")) }
        })
        .on_stop(move |_| {
            on_stop.push(format!("stop {name}"));
            async { Ok(()) }
        })
}

/// Like [`tracked`], but OnStop fails with `stop <name> failed`.
#[allow(dead_code)]
pub fn failing_stop(calls: &Calls, name: &'static str) -> Hook {
    let on_start = calls.clone();
    let on_stop = calls.clone();
    Hook::new()
        .on_start(move |_| {
            on_start.push(format!("start {name}"));
            async { Ok(()) }
        })
        .on_stop(move |_| {
            on_stop.push(format!("stop {name}"));
            async move { Err(anyhow::anyhow!("stop {name} failed")) }
        })
}
