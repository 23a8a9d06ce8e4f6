//! Services and the handlers they declare.
//!
//! # Responsibilities
//! - Define the capability a service implements to take part in the lifecycle
//! - Collect a service's (level, callback) pairs exactly once
//! - Reject malformed declarations at registration time
//!
//! # Design Decisions
//! - Services describe themselves; nothing is discovered by introspection
//! - Callbacks take no arguments, so arity mistakes cannot compile
//! - A service whose declaration is invalid contributes no handlers at all

use std::fmt;
use std::sync::Arc;

use crate::lifecycle::error::{ConfigurationError, HandlerError};
use crate::lifecycle::level::LifecycleLevel;

/// Ordering used by services that do not override it.
pub const DEFAULT_REGISTRATION_ORDERING: i32 = 0;

/// Zero-argument lifecycle callback.
pub type LifecycleCallback = Arc<dyn Fn() -> Result<(), HandlerError> + Send + Sync>;

/// A service that takes part in platform startup and shutdown.
///
/// Callbacks usually capture a clone of the `Arc` passed to
/// [`declare_handlers`](PlatformService::declare_handlers).
pub trait PlatformService: Send + Sync {
    /// Service name, used in logs. Unnamed services are allowed.
    fn name(&self) -> Option<&str>;

    /// Position relative to other services within one level (lower fires first).
    fn registration_ordering(&self) -> i32 {
        DEFAULT_REGISTRATION_ORDERING
    }

    /// Declare this service's lifecycle callbacks.
    fn declare_handlers(self: Arc<Self>, handlers: &mut HandlerDeclarations);
}

/// Source of the fixed set of services known at coordinator construction.
pub trait ServiceDirectory {
    fn services(&self) -> Vec<Arc<dyn PlatformService>>;
}

impl ServiceDirectory for Vec<Arc<dyn PlatformService>> {
    fn services(&self) -> Vec<Arc<dyn PlatformService>> {
        self.clone()
    }
}

/// Name and ordering of a registered service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceIdentity {
    pub name: Option<String>,
    pub registration_ordering: i32,
}

impl ServiceIdentity {
    fn of(service: &dyn PlatformService) -> Self {
        Self {
            name: service.name().map(str::to_string),
            registration_ordering: service.registration_ordering(),
        }
    }
}

impl fmt::Display for ServiceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => f.write_str(name),
            None => write!(f, "<unnamed:{}>", self.registration_ordering),
        }
    }
}

/// A (service, level, callback) triple. Immutable once created.
#[derive(Clone)]
pub struct LifecycleHandler {
    service: Arc<ServiceIdentity>,
    level: LifecycleLevel,
    callback: LifecycleCallback,
}

impl LifecycleHandler {
    pub fn service(&self) -> &ServiceIdentity {
        &self.service
    }

    pub fn level(&self) -> LifecycleLevel {
        self.level
    }

    pub(crate) fn invoke(&self) -> Result<(), HandlerError> {
        (self.callback)()
    }
}

impl fmt::Debug for LifecycleHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LifecycleHandler")
            .field("service", &self.service)
            .field("level", &self.level)
            .finish_non_exhaustive()
    }
}

/// Collector handed to [`PlatformService::declare_handlers`].
#[derive(Default)]
pub struct HandlerDeclarations {
    declared: Vec<(LifecycleLevel, LifecycleCallback)>,
    errors: Vec<ConfigurationError>,
    rejection: Option<String>,
}

impl HandlerDeclarations {
    /// Declare a callback for `level`.
    pub fn on<F>(&mut self, level: LifecycleLevel, callback: F) -> &mut Self
    where
        F: Fn() -> Result<(), HandlerError> + Send + Sync + 'static,
    {
        self.declared.push((level, Arc::new(callback)));
        self
    }

    /// Declare a callback for a level given by name, e.g. from a plugin manifest.
    pub fn on_named<F>(&mut self, level: &str, callback: F) -> &mut Self
    where
        F: Fn() -> Result<(), HandlerError> + Send + Sync + 'static,
    {
        match level.parse::<LifecycleLevel>() {
            Ok(level) => self.on(level, callback),
            Err(err) => {
                self.errors.push(err);
                self
            }
        }
    }

    /// Mark the whole declaration invalid.
    pub fn reject(&mut self, reason: impl Into<String>) {
        self.rejection = Some(reason.into());
    }
}

/// Extract the handlers `service` declares.
///
/// Called once per service instance. Declaration order is preserved.
pub fn describe(service: Arc<dyn PlatformService>) -> Result<Vec<LifecycleHandler>, ConfigurationError> {
    let identity = Arc::new(ServiceIdentity::of(service.as_ref()));
    let mut declarations = HandlerDeclarations::default();
    service.declare_handlers(&mut declarations);

    if let Some(reason) = declarations.rejection {
        return Err(ConfigurationError::Rejected {
            service: identity.to_string(),
            reason,
        });
    }
    if let Some(err) = declarations.errors.into_iter().next() {
        return Err(ConfigurationError::InvalidDeclaration {
            service: identity.to_string(),
            source: Box::new(err),
        });
    }

    Ok(declarations
        .declared
        .into_iter()
        .map(|(level, callback)| LifecycleHandler {
            service: identity.clone(),
            level,
            callback,
        })
        .collect())
}
