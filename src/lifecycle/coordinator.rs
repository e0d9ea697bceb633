//! The hook registry and its start/stop state machine.
//!
//! # State Transitions
//! ```text
//! Stopped → Starting: start() with a live context
//! Starting → Started: every OnStart succeeded
//! Starting → IncompleteStart: an OnStart failed or the context ended
//! Started | IncompleteStart | Starting → Stopping → Stopped: stop()
//! ```
//!
//! # Design Decisions
//! - Start is fail-fast, stop is best-effort
//! - No implicit rollback: after a failed start the caller runs stop()
//! - The lock is never held while a hook runs

use std::fmt;
use std::panic::Location;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use super::hook::Action;
use super::{CallerFrame, Hook, HookRecord, HookRecords, LifecycleError, Phase};
use crate::clock::Clock;
use crate::context::Context;
use crate::observability::{Event, EventLogger};

/// Where the lifecycle is in its start/stop cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LifecycleState {
    /// Idle: never started, or fully stopped.
    #[default]
    Stopped,
    Starting,
    /// A start failed part-way; stop() unwinds the hooks that did start.
    IncompleteStart,
    Started,
    Stopping,
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LifecycleState::Stopped => "stopped",
            LifecycleState::Starting => "starting",
            LifecycleState::IncompleteStart => "incompleteStart",
            LifecycleState::Started => "started",
            LifecycleState::Stopping => "stopping",
        };
        f.write_str(name)
    }
}

#[derive(Default)]
struct Inner {
    state: LifecycleState,
    hooks: Vec<Arc<Hook>>,
    /// High-water mark: `hooks[..num_started]` started successfully.
    num_started: usize,
    /// Bumped by every start and stop; a start only records progress while
    /// the epoch it began with is current.
    epoch: u64,
    running_hook: Option<CallerFrame>,
    start_records: HookRecords,
    stop_records: HookRecords,
}

/// Runs registered hooks: OnStart in append order, OnStop in reverse.
pub struct Lifecycle {
    logger: Arc<dyn EventLogger>,
    clock: Arc<dyn Clock>,
    inner: Mutex<Inner>,
}

impl Lifecycle {
    pub fn new(logger: Arc<dyn EventLogger>, clock: Arc<dyn Clock>) -> Self {
        Self {
            logger,
            clock,
            inner: Mutex::new(Inner::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn logger(&self) -> &dyn EventLogger {
        self.logger.as_ref()
    }

    pub(crate) fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    /// Register `hook`, recording the caller's location as its provenance.
    ///
    /// Hooks appended after `start` only run on the next start.
    #[track_caller]
    pub fn append(&self, mut hook: Hook) {
        hook.caller = CallerFrame::from_location(Location::caller());

        let mut inner = self.lock();
        if inner.state != LifecycleState::Stopped {
            tracing::warn!(
                state = %inner.state,
                caller = %hook.caller,
                "Hook appended to a running lifecycle"
            );
        }
        inner.hooks.push(Arc::new(hook));
    }

    /// Run every OnStart action in append order, stopping at the first error.
    ///
    /// On error the hooks that did start stay started; call [`Lifecycle::stop`]
    /// to unwind them.
    pub async fn start<'a>(
        &self,
        ctx: impl Into<Option<&'a Context>>,
    ) -> Result<(), LifecycleError> {
        let ctx = ctx
            .into()
            .ok_or(LifecycleError::NilContext(Phase::Start))?;

        let (hooks, epoch) = {
            let mut inner = self.lock();
            if inner.state != LifecycleState::Stopped {
                return Err(LifecycleError::InvalidState(inner.state));
            }
            if let Some(err) = ctx.err() {
                return Err(err.into());
            }
            inner.state = LifecycleState::Starting;
            inner.num_started = 0;
            inner.epoch += 1;
            inner.start_records = HookRecords::with_capacity(inner.hooks.len());
            (inner.hooks.clone(), inner.epoch)
        };

        let result = self.start_hooks(ctx, &hooks, epoch).await;

        let mut inner = self.lock();
        // A concurrent stop() may already have taken over.
        if inner.epoch == epoch && inner.state == LifecycleState::Starting {
            inner.running_hook = None;
            inner.state = match result {
                Ok(()) => LifecycleState::Started,
                Err(_) => LifecycleState::IncompleteStart,
            };
        }
        result
    }

    async fn start_hooks(
        &self,
        ctx: &Context,
        hooks: &[Arc<Hook>],
        epoch: u64,
    ) -> Result<(), LifecycleError> {
        for hook in hooks {
            if let Some(err) = ctx.err() {
                return Err(err.into());
            }
            self.check_epoch(epoch)?;

            if let Some(action) = hook.action(Phase::Start) {
                let (record, result) = self.run_action(Phase::Start, ctx, hook, action).await;

                let mut inner = self.lock();
                if inner.epoch != epoch {
                    tracing::warn!(
                        caller = %hook.caller,
                        state = %inner.state,
                        "OnStart finished after stop took over; its OnStop will not run"
                    );
                    return Err(LifecycleError::Interrupted(inner.state));
                }
                inner.start_records.push(record);
                result.map_err(LifecycleError::Hook)?;
            }

            let mut inner = self.lock();
            if inner.epoch != epoch {
                return Err(LifecycleError::Interrupted(inner.state));
            }
            inner.num_started += 1;
        }
        Ok(())
    }

    fn check_epoch(&self, epoch: u64) -> Result<(), LifecycleError> {
        let inner = self.lock();
        if inner.epoch == epoch && inner.state == LifecycleState::Starting {
            Ok(())
        } else {
            Err(LifecycleError::Interrupted(inner.state))
        }
    }

    /// Run OnStop for every started hook in reverse order.
    ///
    /// Failures do not halt the walk; all of them are returned together. A
    /// context that ends part-way stops the walk, and its error is returned
    /// alongside any hook failures collected before it.
    pub async fn stop<'a>(
        &self,
        ctx: impl Into<Option<&'a Context>>,
    ) -> Result<(), LifecycleError> {
        let ctx = ctx
            .into()
            .ok_or(LifecycleError::NilContext(Phase::Stop))?;

        let (hooks, num_started) = {
            let mut inner = self.lock();
            if !matches!(
                inner.state,
                LifecycleState::Started | LifecycleState::IncompleteStart | LifecycleState::Starting
            ) {
                return Ok(());
            }
            inner.state = LifecycleState::Stopping;
            inner.epoch += 1;
            let num_started = inner.num_started.min(inner.hooks.len());
            inner.stop_records = HookRecords::with_capacity(num_started);
            (inner.hooks.clone(), num_started)
        };

        let errors = self.stop_hooks(ctx, &hooks[..num_started]).await;
        self.mark_stopped();

        LifecycleError::combine(errors)
    }

    async fn stop_hooks(&self, ctx: &Context, started: &[Arc<Hook>]) -> Vec<LifecycleError> {
        let mut errors = Vec::new();
        for hook in started.iter().rev() {
            if let Some(err) = ctx.err() {
                errors.push(err.into());
                break;
            }

            let Some(action) = hook.action(Phase::Stop) else {
                continue;
            };
            let (record, result) = self.run_action(Phase::Stop, ctx, hook, action).await;
            self.lock().stop_records.push(record);
            if let Err(err) = result {
                errors.push(LifecycleError::Hook(err));
            }
        }
        errors
    }

    /// Return to idle, forgetting which hooks had started. Also used when a
    /// stop is abandoned at its deadline.
    pub(crate) fn mark_stopped(&self) {
        let mut inner = self.lock();
        inner.state = LifecycleState::Stopped;
        inner.num_started = 0;
        inner.epoch += 1;
        inner.running_hook = None;
    }

    async fn run_action(
        &self,
        phase: Phase,
        ctx: &Context,
        hook: &Hook,
        action: &Action,
    ) -> (HookRecord, anyhow::Result<()>) {
        let function = hook.function_name(phase);
        let caller = hook.caller;

        self.lock().running_hook = Some(caller);
        self.logger.log_event(&executing(phase, &function, caller));

        let begin = self.clock.now();
        let result = action.call(ctx.clone()).await;
        let runtime = self.clock.since(begin);

        let err = result.as_ref().err().map(|e| format!("{:#}", e));
        self.logger
            .log_event(&executed(phase, &function, caller, runtime, err));

        let record = HookRecord {
            function,
            caller,
            runtime,
        };
        (record, result)
    }

    pub fn state(&self) -> LifecycleState {
        self.lock().state
    }

    /// Number of registered hooks.
    pub fn len(&self) -> usize {
        self.lock().hooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().hooks.is_empty()
    }

    /// Records of the OnStart actions run by the latest start.
    pub fn start_hook_records(&self) -> HookRecords {
        self.lock().start_records.clone()
    }

    /// Records of the OnStop actions run by the latest stop.
    pub fn stop_hook_records(&self) -> HookRecords {
        self.lock().stop_records.clone()
    }

    /// Provenance of the hook currently running, if any.
    pub fn running_hook_caller(&self) -> Option<CallerFrame> {
        self.lock().running_hook
    }
}

impl fmt::Debug for Lifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.lock();
        f.debug_struct("Lifecycle")
            .field("state", &inner.state)
            .field("hooks", &inner.hooks.len())
            .field("num_started", &inner.num_started)
            .finish()
    }
}

fn executing(phase: Phase, function: &str, caller: CallerFrame) -> Event {
    let function = function.to_string();
    match phase {
        Phase::Start => Event::OnStartExecuting { function, caller },
        Phase::Stop => Event::OnStopExecuting { function, caller },
    }
}

fn executed(
    phase: Phase,
    function: &str,
    caller: CallerFrame,
    runtime: Duration,
    err: Option<String>,
) -> Event {
    let function = function.to_string();
    match phase {
        Phase::Start => Event::OnStartExecuted {
            function,
            caller,
            runtime,
            err,
        },
        Phase::Stop => Event::OnStopExecuted {
            function,
            caller,
            runtime,
            err,
        },
    }
}
