//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the platform.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

use crate::lifecycle::FailurePolicy;
use crate::routing::ConflictPolicy;

/// Root configuration for the billing platform host.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct PlatformConfig {
    /// Lifecycle coordinator settings.
    pub lifecycle: LifecycleConfig,

    /// Plugin route table settings.
    pub routing: RoutingConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Property source settings.
    pub properties: PropertiesConfig,
}

/// Lifecycle coordinator configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct LifecycleConfig {
    /// What a phase does after a handler fails (`continue` or `abort`).
    pub failure_policy: FailurePolicy,
}

/// Route table configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct RoutingConfig {
    /// What re-registering a prefix does (`replace` or `reject`).
    pub conflict_policy: ConflictPolicy,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Where platform properties come from.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PropertiesConfig {
    /// TOML properties file; nested tables become dotted keys.
    pub path: Option<String>,

    /// Reload the file when it changes.
    pub watch: bool,

    /// Watcher poll interval in seconds.
    pub poll_interval_secs: u64,

    /// Environment variable prefix consulted before the file.
    pub env_prefix: Option<String>,
}

impl Default for PropertiesConfig {
    fn default() -> Self {
        Self {
            path: None,
            watch: false,
            poll_interval_secs: 2,
            env_prefix: Some("BILLING".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config: PlatformConfig = toml::from_str("").unwrap();
        assert_eq!(config.lifecycle.failure_policy, FailurePolicy::Continue);
        assert_eq!(config.routing.conflict_policy, ConflictPolicy::Replace);
        assert_eq!(config.observability.log_level, "info");
        assert!(config.properties.path.is_none());
    }

    #[test]
    fn test_parse_policies() {
        let config: PlatformConfig = toml::from_str(
            r#"
            [lifecycle]
            failure_policy = "abort"

            [routing]
            conflict_policy = "reject"

            [properties]
            path = "platform.properties.toml"
            watch = true
            "#,
        )
        .unwrap();
        assert_eq!(config.lifecycle.failure_policy, FailurePolicy::Abort);
        assert_eq!(config.routing.conflict_policy, ConflictPolicy::Reject);
        assert!(config.properties.watch);
        assert_eq!(config.properties.poll_interval_secs, 2);
    }
}
