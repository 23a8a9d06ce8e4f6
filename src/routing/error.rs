//! Routing and dispatch errors.

use thiserror::Error;

/// Boxed error raised by plugin code.
pub type PluginError = Box<dyn std::error::Error + Send + Sync>;

/// Route table mutation errors.
#[derive(Debug, Error)]
pub enum RouteError {
    /// The prefix is empty or has empty segments.
    #[error("invalid route prefix `{0}`")]
    InvalidPrefix(String),

    /// The prefix is taken and the table rejects re-registration.
    #[error("route prefix {0} is already registered")]
    Conflict(String),
}

/// Outcome of a failed dispatch.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// No registered prefix matches the path. An ordinary outcome, not a fault.
    #[error("no plugin route for {0}")]
    RouteNotFound(String),

    /// The one-time handler initialization failed; a later dispatch retries it.
    #[error("initialization of route {prefix} failed: {source}")]
    Initialization {
        prefix: String,
        #[source]
        source: PluginError,
    },

    /// The handler failed while serving the request.
    #[error("handler for route {prefix} failed: {source}")]
    Invocation {
        prefix: String,
        #[source]
        source: PluginError,
    },

    /// The route's isolation context could not be entered.
    #[error("isolation context {context} unavailable: {source}")]
    Isolation {
        context: String,
        #[source]
        source: PluginError,
    },
}

impl DispatchError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, DispatchError::RouteNotFound(_))
    }

    /// Short label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            DispatchError::RouteNotFound(_) => "not_found",
            DispatchError::Initialization { .. } => "initialization_error",
            DispatchError::Invocation { .. } => "invocation_error",
            DispatchError::Isolation { .. } => "isolation_error",
        }
    }
}
