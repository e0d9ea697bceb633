//! Hooks: paired, optional start/stop actions.

use std::any::type_name;
use std::fmt;
use std::future::Future;
use std::panic::Location;

use futures_util::future::{BoxFuture, FutureExt};
use serde::Serialize;

use crate::context::Context;

/// Which half of a hook is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Start,
    Stop,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Start => f.write_str("OnStart"),
            Phase::Stop => f.write_str("OnStop"),
        }
    }
}

/// Where a hook was appended from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct CallerFrame {
    pub file: &'static str,
    pub line: u32,
    pub column: u32,
}

impl CallerFrame {
    pub(crate) fn from_location(location: &'static Location<'static>) -> Self {
        Self {
            file: location.file(),
            line: location.line(),
            column: location.column(),
        }
    }
}

impl Default for CallerFrame {
    fn default() -> Self {
        Self {
            file: "<unknown>",
            line: 0,
            column: 0,
        }
    }
}

impl fmt::Display for CallerFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.column)
    }
}

type ActionFn = Box<dyn Fn(Context) -> BoxFuture<'static, anyhow::Result<()>> + Send + Sync>;

/// One side of a hook: an async callable plus the name it reports under.
pub(crate) struct Action {
    name: &'static str,
    run: ActionFn,
}

impl Action {
    fn new<F, Fut>(f: F) -> Self
    where
        F: Fn(Context) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        Self {
            name: type_name::<F>(),
            run: Box::new(move |ctx| f(ctx).boxed()),
        }
    }

    pub(crate) fn call(&self, ctx: Context) -> BoxFuture<'static, anyhow::Result<()>> {
        (self.run)(ctx)
    }
}

/// A pair of optional lifecycle actions.
///
/// ```
/// use stagehand::lifecycle::Hook;
///
/// let hook = Hook::new()
///     .on_start(|_ctx| async { Ok(()) })
///     .on_stop(|_ctx| async { Ok(()) })
///     .with_start_name("db::connect");
/// assert!(hook.has_start() && hook.has_stop());
/// ```
#[derive(Default)]
pub struct Hook {
    pub(crate) on_start: Option<Action>,
    pub(crate) on_stop: Option<Action>,
    start_name: Option<String>,
    stop_name: Option<String>,
    /// Set by `Lifecycle::append`.
    pub(crate) caller: CallerFrame,
}

impl Hook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` when the lifecycle starts.
    pub fn on_start<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(Context) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.on_start = Some(Action::new(f));
        self
    }

    /// Run `f` when the lifecycle stops, if this hook started.
    pub fn on_stop<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(Context) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.on_stop = Some(Action::new(f));
        self
    }

    /// Report the start action under `name` instead of its type name.
    pub fn with_start_name(mut self, name: impl Into<String>) -> Self {
        self.start_name = Some(name.into());
        self
    }

    /// Report the stop action under `name` instead of its type name.
    pub fn with_stop_name(mut self, name: impl Into<String>) -> Self {
        self.stop_name = Some(name.into());
        self
    }

    pub fn has_start(&self) -> bool {
        self.on_start.is_some()
    }

    pub fn has_stop(&self) -> bool {
        self.on_stop.is_some()
    }

    pub fn caller(&self) -> CallerFrame {
        self.caller
    }

    pub(crate) fn action(&self, phase: Phase) -> Option<&Action> {
        match phase {
            Phase::Start => self.on_start.as_ref(),
            Phase::Stop => self.on_stop.as_ref(),
        }
    }

    pub(crate) fn function_name(&self, phase: Phase) -> String {
        let (custom, action) = match phase {
            Phase::Start => (&self.start_name, &self.on_start),
            Phase::Stop => (&self.stop_name, &self.on_stop),
        };
        match (custom, action) {
            (Some(name), _) => name.clone(),
            (None, Some(action)) => action.name.to_string(),
            (None, None) => String::new(),
        }
    }
}

impl fmt::Debug for Hook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hook")
            .field("on_start", &self.on_start.as_ref().map(|_| self.function_name(Phase::Start)))
            .field("on_stop", &self.on_stop.as_ref().map(|_| self.function_name(Phase::Stop)))
            .field("caller", &self.caller)
            .finish()
    }
}
