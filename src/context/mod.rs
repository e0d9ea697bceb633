//! Cancellation scopes handed to every hook.
//!
//! # Data Flow
//! ```text
//! Context::background()
//!     → with_cancel() / with_value() (child scopes)
//!     → Clock::with_timeout() / with_deadline() (deadline-bound child)
//!     → passed by value into each OnStart / OnStop action
//!
//! Cancellation:
//!     parent cancelled → every descendant is done, err() reports the parent's reason
//!     child cancelled  → parent unaffected
//! ```
//!
//! # Design Decisions
//! - Built on `tokio_util::sync::CancellationToken` child tokens
//! - The first reason recorded wins: `Canceled` vs `DeadlineExceeded`
//! - Values are keyed by type; lookup walks up the parent chain

pub mod error;
pub mod scope;

pub use error::ContextError;
pub use scope::{CancelHandle, Context};
