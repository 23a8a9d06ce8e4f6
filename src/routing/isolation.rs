//! Plugin isolation contexts.
//!
//! # Responsibilities
//! - Carry the execution scope a plugin's code must run under
//! - Enter it for one call and release it on every exit path
//!
//! # Design Decisions
//! - The context is a value attached to the route, not ambient thread state;
//!   the caller's own context is never touched, so nothing needs restoring
//! - Release happens in `Drop`, so errors and panics release too
//! - The plugin host supplies what entering means through `IsolationProvider`

use std::fmt;
use std::sync::Arc;

use uuid::Uuid;

use crate::routing::error::PluginError;

/// Label used for callers that run outside any plugin.
pub const HOST_CONTEXT: &str = "host";

/// Host-specific acquisition of a plugin's execution scope
/// (a namespace, a resource budget, a loaded module...).
pub trait IsolationProvider: Send + Sync {
    fn enter(&self) -> Result<(), PluginError>;

    /// Called exactly once for every successful `enter`.
    fn exit(&self);
}

/// The execution scope attached to a plugin route.
#[derive(Clone)]
pub struct IsolationContext {
    label: Arc<str>,
    provider: Option<Arc<dyn IsolationProvider>>,
}

impl IsolationContext {
    pub fn new(label: impl Into<String>, provider: Arc<dyn IsolationProvider>) -> Self {
        Self {
            label: Arc::from(label.into()),
            provider: Some(provider),
        }
    }

    /// A context with nothing to acquire; only the label is tracked.
    pub fn unconfined(label: impl Into<String>) -> Self {
        Self {
            label: Arc::from(label.into()),
            provider: None,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Acquire the context; it is released when the guard drops.
    pub fn enter(&self) -> Result<IsolationGuard<'_>, PluginError> {
        if let Some(provider) = &self.provider {
            provider.enter()?;
        }
        tracing::trace!(context = %self.label, "Entered isolation context");
        Ok(IsolationGuard { context: self })
    }
}

impl fmt::Debug for IsolationContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IsolationContext")
            .field("label", &self.label)
            .field("confined", &self.provider.is_some())
            .finish()
    }
}

/// A held isolation context.
pub struct IsolationGuard<'a> {
    context: &'a IsolationContext,
}

impl Drop for IsolationGuard<'_> {
    fn drop(&mut self) {
        if let Some(provider) = &self.context.provider {
            provider.exit();
        }
        tracing::trace!(context = %self.context.label, "Left isolation context");
    }
}

/// Per-request information supplied by the transport.
#[derive(Debug, Clone)]
pub struct DispatchContext {
    pub request_id: Uuid,
    /// Isolation label of the caller.
    pub caller: String,
}

impl DispatchContext {
    pub fn new() -> Self {
        Self {
            request_id: Uuid::new_v4(),
            caller: HOST_CONTEXT.to_string(),
        }
    }

    pub fn with_caller(mut self, caller: impl Into<String>) -> Self {
        self.caller = caller.into();
        self
    }
}

impl Default for DispatchContext {
    fn default() -> Self {
        Self::new()
    }
}

/// What plugin code sees while it runs inside its isolation context.
pub struct ExecutionScope<'a> {
    guard: IsolationGuard<'a>,
    prefix: &'a str,
    dispatch: Option<&'a DispatchContext>,
}

impl<'a> ExecutionScope<'a> {
    pub(crate) fn enter(
        isolation: &'a IsolationContext,
        prefix: &'a str,
        dispatch: Option<&'a DispatchContext>,
    ) -> Result<Self, PluginError> {
        Ok(Self {
            guard: isolation.enter()?,
            prefix,
            dispatch,
        })
    }

    /// Label of the isolation context the code runs under.
    pub fn isolation(&self) -> &str {
        self.guard.context.label()
    }

    /// The route prefix being served.
    pub fn prefix(&self) -> &str {
        self.prefix
    }

    /// Request id, absent while the route is being torn down.
    pub fn request_id(&self) -> Option<Uuid> {
        self.dispatch.map(|ctx| ctx.request_id)
    }

    /// Isolation label of the dispatching caller.
    pub fn caller(&self) -> Option<&str> {
        self.dispatch.map(|ctx| ctx.caller.as_str())
    }
}
