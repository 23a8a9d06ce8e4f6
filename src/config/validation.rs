//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (log levels, addresses, intervals)
//! - Detect inconsistent combinations (watching without a file)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: PlatformConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::PlatformConfig;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Check `config` and collect every problem found.
pub fn validate_config(config: &PlatformConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let observability = &config.observability;
    if !LOG_LEVELS.contains(&observability.log_level.as_str()) {
        errors.push(ValidationError::new(
            "observability.log_level",
            format!("unknown level `{}`", observability.log_level),
        ));
    }
    if observability.metrics_enabled && observability.metrics_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("`{}` is not a socket address", observability.metrics_address),
        ));
    }

    let properties = &config.properties;
    if properties.path.as_deref().is_some_and(|p| p.trim().is_empty()) {
        errors.push(ValidationError::new("properties.path", "must not be empty"));
    }
    if properties.watch && properties.path.is_none() {
        errors.push(ValidationError::new("properties.watch", "requires properties.path"));
    }
    if properties.poll_interval_secs == 0 {
        errors.push(ValidationError::new("properties.poll_interval_secs", "must be > 0"));
    }
    if properties.env_prefix.as_deref().is_some_and(|p| p.trim().is_empty()) {
        errors.push(ValidationError::new("properties.env_prefix", "must not be empty"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
