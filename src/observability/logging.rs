//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the tracing subscriber
//! - Render lifecycle events as tracing records
//!
//! # Design Decisions
//! - Uses tracing crate for structured logging
//! - JSON format for production, pretty format for development
//! - `RUST_LOG` overrides the configured level

use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use super::events::{Event, EventLogger};
use crate::config::schema::{LogFormat, ObservabilityConfig};

/// Install the global subscriber described by `config`.
pub fn init_logging(config: &ObservabilityConfig) -> Result<(), TryInitError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    match config.log_format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .try_init(),
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .try_init(),
    }
}

/// Writes lifecycle events through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl EventLogger for TracingLogger {
    fn log_event(&self, event: &Event) {
        match event {
            Event::OnStartExecuting { function, caller } => {
                tracing::info!(callee = %function, caller = %caller, "OnStart hook executing");
            }
            Event::OnStartExecuted {
                function,
                caller,
                runtime,
                err: None,
            } => {
                tracing::info!(callee = %function, caller = %caller, runtime = ?runtime, "OnStart hook executed");
            }
            Event::OnStartExecuted {
                function,
                caller,
                err: Some(err),
                ..
            } => {
                tracing::error!(callee = %function, caller = %caller, error = %err, "OnStart hook failed");
            }
            Event::OnStopExecuting { function, caller } => {
                tracing::info!(callee = %function, caller = %caller, "OnStop hook executing");
            }
            Event::OnStopExecuted {
                function,
                caller,
                runtime,
                err: None,
            } => {
                tracing::info!(callee = %function, caller = %caller, runtime = ?runtime, "OnStop hook executed");
            }
            Event::OnStopExecuted {
                function,
                caller,
                err: Some(err),
                ..
            } => {
                tracing::error!(callee = %function, caller = %caller, error = %err, "OnStop hook failed");
            }
            Event::Started { err: None } => tracing::info!("Started"),
            Event::Started { err: Some(err) } => tracing::error!(error = %err, "Start failed"),
            Event::RollingBack { start_err } => {
                tracing::error!(error = %start_err, "Start failed, rolling back");
            }
            Event::RolledBack { err: None } => tracing::info!("Rollback complete"),
            Event::RolledBack { err: Some(err) } => tracing::error!(error = %err, "Rollback failed"),
            Event::Stopping => tracing::info!("Shutdown signal received, stopping"),
            Event::Stopped { err: None } => tracing::info!("Stopped"),
            Event::Stopped { err: Some(err) } => tracing::error!(error = %err, "Stop failed"),
        }
    }
}
