//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, parseable log filters)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: AppConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use thiserror::Error;
use tracing_subscriber::filter::{EnvFilter, LevelFilter};

use crate::config::schema::AppConfig;

/// A single semantic problem with a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field} must be greater than zero")]
    ZeroTimeout { field: &'static str },

    #[error("invalid log level {level:?}: {reason}")]
    InvalidLogLevel { level: String, reason: String },
}

/// Check `config` for values serde accepts but the system cannot use.
pub fn validate_config(config: &AppConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.lifecycle.start_timeout_ms == 0 {
        errors.push(ValidationError::ZeroTimeout {
            field: "lifecycle.start_timeout_ms",
        });
    }
    if config.lifecycle.stop_timeout_ms == 0 {
        errors.push(ValidationError::ZeroTimeout {
            field: "lifecycle.stop_timeout_ms",
        });
    }

    if let Err(reason) = check_log_level(&config.observability.log_level) {
        errors.push(ValidationError::InvalidLogLevel {
            level: config.observability.log_level.clone(),
            reason,
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Accepts a bare level (`info`, `OFF`) or `EnvFilter` directives
/// (`stagehand=debug,info`). A bare word would otherwise parse as a target
/// name, so anything without `=` must be a level.
fn check_log_level(level: &str) -> Result<(), String> {
    if level.contains('=') {
        EnvFilter::try_new(level).map(drop).map_err(|e| e.to_string())
    } else {
        level.parse::<LevelFilter>().map(drop).map_err(|e| e.to_string())
    }
}
