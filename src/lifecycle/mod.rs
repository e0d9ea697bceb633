//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Composition root:
//!     Construct components in dependency order
//!     → Lifecycle::append(Hook { on_start, on_stop }) per component
//!
//! Startup (coordinator.rs):
//!     start(ctx) → OnStart hooks in append order → first error halts
//!
//! Shutdown (coordinator.rs):
//!     stop(ctx) → OnStop hooks of started components, in reverse → errors combined
//!
//! Run loop (runner.rs):
//!     start under deadline → (rollback on failure) → wait for signal → stop under deadline
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → stop signal for the run loop
//! ```
//!
//! # Design Decisions
//! - Ordered startup, reverse-ordered shutdown
//! - Start fails fast; stop is best-effort and reports every failure
//! - Rollback is explicit: the caller (or `run`) calls stop after a failed start
//! - Per-hook timing kept as `HookRecords` for startup/shutdown reports

pub mod coordinator;
pub mod error;
pub mod hook;
pub mod records;
pub mod runner;
pub mod shutdown;
pub mod signals;

pub use coordinator::{Lifecycle, LifecycleState};
pub use error::LifecycleError;
pub use hook::{CallerFrame, Hook, Phase};
pub use records::{HookRecord, HookRecords};
pub use runner::{run, start_within, stop_within};
pub use shutdown::Shutdown;
pub use signals::shutdown_signal;
