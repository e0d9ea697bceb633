//! Application lifecycle orchestration.
//!
//! Components register start/stop hooks with a [`Lifecycle`]; the lifecycle
//! starts them in order, stops them in reverse, and reports how long each
//! took. Time comes from a [`clock::Clock`], so tests can drive deadlines
//! with [`clock::MockClock`].

pub mod clock;
pub mod config;
pub mod context;
pub mod lifecycle;
pub mod observability;

pub use config::schema::AppConfig;
pub use context::{Context, ContextError};
pub use lifecycle::{Hook, Lifecycle, LifecycleError, Shutdown};
