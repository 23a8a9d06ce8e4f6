//! Plugin routes and their handler state.
//!
//! # States
//! - Uninitialized: registered, handler `init` not yet succeeded
//! - Ready: `init` succeeded; requests are served
//! - Retired: unregistered or replaced; never invoked again
//!
//! # State Transitions
//! ```text
//! Uninitialized → Ready:     first dispatch, init succeeds (write lock)
//! Uninitialized → Uninitialized: init fails; the next dispatch retries
//! Uninitialized | Ready → Retired: unregister/replace (write lock)
//! ```
//!
//! # Design Decisions
//! - One `RwLock` per route: unrelated routes never contend
//! - Initialization holds the write lock, so concurrent first dispatches
//!   run `init` exactly once and the others reuse its outcome
//! - Requests hold the read lock while the handler runs, so retiring waits
//!   for in-flight requests and no request reaches the handler afterwards
//! - A handler must not unregister its own route from inside `handle`

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, PoisonError, RwLock};

use crate::lifecycle::coordinator::panic_message;
use crate::observability::metrics;
use crate::routing::error::{DispatchError, PluginError};
use crate::routing::isolation::{DispatchContext, ExecutionScope, IsolationContext};

/// Request handed to a plugin handler.
#[derive(Debug, Clone)]
pub struct PluginRequest {
    /// Normalised request path.
    pub path: String,
    /// The part of the path below the route prefix (`/` when equal).
    pub path_info: String,
    pub payload: Vec<u8>,
}

/// Response produced by a plugin handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl PluginResponse {
    pub fn ok(body: impl Into<Vec<u8>>) -> Self {
        Self {
            status: 200,
            body: body.into(),
        }
    }

    pub fn with_status(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

/// A request handler contributed by a plugin.
pub trait PluginHandler: Send + Sync {
    /// One-time setup, run lazily on the first dispatch to the route.
    fn init(&self, _scope: &ExecutionScope<'_>) -> Result<(), PluginError> {
        Ok(())
    }

    fn handle(
        &self,
        scope: &ExecutionScope<'_>,
        request: &PluginRequest,
    ) -> Result<PluginResponse, PluginError>;

    /// Teardown, run once when an initialized route is retired.
    fn destroy(&self, _scope: &ExecutionScope<'_>) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RouteState {
    Uninitialized,
    Ready,
    Retired,
}

/// A registered (prefix, handler, isolation context) association.
pub struct PluginRoute {
    prefix: String,
    handler: Arc<dyn PluginHandler>,
    isolation: IsolationContext,
    state: RwLock<RouteState>,
}

impl PluginRoute {
    pub(crate) fn new(
        prefix: String,
        handler: Arc<dyn PluginHandler>,
        isolation: IsolationContext,
    ) -> Self {
        Self {
            prefix,
            handler,
            isolation,
            state: RwLock::new(RouteState::Uninitialized),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn isolation(&self) -> &IsolationContext {
        &self.isolation
    }

    pub fn handler(&self) -> &Arc<dyn PluginHandler> {
        &self.handler
    }

    pub fn is_initialized(&self) -> bool {
        self.current() == RouteState::Ready
    }

    pub fn is_retired(&self) -> bool {
        self.current() == RouteState::Retired
    }

    fn current(&self) -> RouteState {
        *self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Serve `request`, initializing the handler first if needed.
    pub(crate) fn call(
        &self,
        request: &PluginRequest,
        context: &DispatchContext,
    ) -> Result<PluginResponse, DispatchError> {
        loop {
            {
                let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
                match *state {
                    RouteState::Ready => return self.invoke(request, context),
                    RouteState::Retired => {
                        return Err(DispatchError::RouteNotFound(request.path.clone()))
                    }
                    RouteState::Uninitialized => {}
                }
            }
            self.initialize(&request.path, context)?;
        }
    }

    fn initialize(&self, path: &str, context: &DispatchContext) -> Result<(), DispatchError> {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        match *state {
            RouteState::Ready => return Ok(()),
            RouteState::Retired => return Err(DispatchError::RouteNotFound(path.to_string())),
            RouteState::Uninitialized => {}
        }

        let outcome = self.in_scope(Some(context), |scope| self.handler.init(scope))?;
        match outcome {
            Ok(()) => {
                *state = RouteState::Ready;
                metrics::record_route_initialization(&self.prefix, true);
                tracing::info!(
                    prefix = %self.prefix,
                    context = %self.isolation.label(),
                    "Plugin route initialized"
                );
                Ok(())
            }
            Err(source) => {
                metrics::record_route_initialization(&self.prefix, false);
                tracing::warn!(
                    prefix = %self.prefix,
                    error = %source,
                    "Plugin route initialization failed"
                );
                Err(DispatchError::Initialization {
                    prefix: self.prefix.clone(),
                    source,
                })
            }
        }
    }

    /// Caller holds the read lock in the `Ready` state.
    fn invoke(
        &self,
        request: &PluginRequest,
        context: &DispatchContext,
    ) -> Result<PluginResponse, DispatchError> {
        self.in_scope(Some(context), |scope| self.handler.handle(scope, request))?
            .map_err(|source| DispatchError::Invocation {
                prefix: self.prefix.clone(),
                source,
            })
    }

    /// Stop serving. Waits for in-flight requests; runs `destroy` if initialized.
    pub(crate) fn retire(&self) {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        let previous = std::mem::replace(&mut *state, RouteState::Retired);
        if previous != RouteState::Ready {
            return;
        }

        let destroyed = self.in_scope(None, |scope| {
            self.handler.destroy(scope);
            Ok(())
        });
        match destroyed {
            Ok(Ok(())) => tracing::debug!(prefix = %self.prefix, "Plugin route destroyed"),
            Ok(Err(err)) => {
                tracing::warn!(prefix = %self.prefix, error = %err, "Plugin route teardown failed")
            }
            Err(err) => {
                tracing::warn!(prefix = %self.prefix, error = %err, "Plugin route teardown failed")
            }
        }
    }

    /// Run `f` inside the route's isolation context, turning panics into errors.
    ///
    /// The outer error reports a context that could not be entered.
    fn in_scope<T>(
        &self,
        dispatch: Option<&DispatchContext>,
        f: impl FnOnce(&ExecutionScope<'_>) -> Result<T, PluginError>,
    ) -> Result<Result<T, PluginError>, DispatchError> {
        let scope = ExecutionScope::enter(&self.isolation, &self.prefix, dispatch).map_err(
            |source| DispatchError::Isolation {
                context: self.isolation.label().to_string(),
                source,
            },
        )?;

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| f(&scope)));
        drop(scope);
        Ok(match outcome {
            Ok(result) => result,
            Err(payload) => Err(format!("panicked: {}", panic_message(payload.as_ref())).into()),
        })
    }
}

impl fmt::Debug for PluginRoute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginRoute")
            .field("prefix", &self.prefix)
            .field("isolation", &self.isolation)
            .field("state", &self.current())
            .finish_non_exhaustive()
    }
}
