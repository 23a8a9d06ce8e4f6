//! Lifecycle error types.

use thiserror::Error;

use crate::lifecycle::level::LifecycleLevel;

/// Boxed error returned by a lifecycle callback.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// A malformed handler declaration, found while a service registers.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    /// A handler was declared for a level name that does not exist.
    #[error("unknown lifecycle level `{0}`")]
    UnknownLevel(String),

    /// The service refused its own declaration.
    #[error("service {service} rejected its handler declaration: {reason}")]
    Rejected { service: String, reason: String },

    /// A declaration error attributed to the service that made it.
    #[error("invalid lifecycle declaration in service {service}: {source}")]
    InvalidDeclaration {
        service: String,
        #[source]
        source: Box<ConfigurationError>,
    },
}

/// A lifecycle handler failed while its level was being fired.
#[derive(Debug, Clone, Error)]
#[error("lifecycle handler of service {service} failed at level {level}: {message}")]
pub struct HandlerInvocationError {
    pub service: String,
    pub level: LifecycleLevel,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = HandlerInvocationError {
            service: "bus".into(),
            level: LifecycleLevel::InitBus,
            message: "queue unavailable".into(),
        };
        assert_eq!(
            err.to_string(),
            "lifecycle handler of service bus failed at level init-bus: queue unavailable"
        );

        let err = ConfigurationError::InvalidDeclaration {
            service: "catalog".into(),
            source: Box::new(ConfigurationError::UnknownLevel("warm-up".into())),
        };
        assert!(err.to_string().contains("catalog"));
        assert!(err.to_string().contains("warm-up"));
    }
}
