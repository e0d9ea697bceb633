//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Lifecycle / lifecycle::run produce:
//!     → events.rs (structured `Event` values)
//!     → EventLogger sink chosen by the composition root
//!
//! Sinks:
//!     → logging.rs TracingLogger (tracing fields, pretty or JSON output)
//!     → events.rs MemoryLogger (captured for assertions)
//!     → events.rs NopLogger (discarded)
//! ```
//!
//! # Design Decisions
//! - The core emits facts, never formatted text
//! - Sinks are passed in explicitly; there is no global logger
//! - Subscriber setup happens once, in the binary

pub mod events;
pub mod logging;

pub use events::{Event, EventLogger, MemoryLogger, NopLogger};
pub use logging::{init_logging, TracingLogger};
