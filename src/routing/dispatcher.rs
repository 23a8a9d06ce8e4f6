//! Request dispatch to plugin routes.
//!
//! # Responsibilities
//! - Resolve a request path to a route (longest segment prefix)
//! - Lazily initialize the route's handler, exactly once
//! - Invoke the handler inside the route's isolation context
//! - Report not-found, initialization and invocation failures to the caller
//!
//! # Design Decisions
//! - No retries: a failed invocation is returned as-is
//! - No intrinsic timeout; the transport bounds request duration
//! - Cheap to clone; every worker thread can hold its own copy

use std::sync::Arc;
use std::time::Instant;

use crate::observability::metrics;
use crate::routing::error::DispatchError;
use crate::routing::isolation::DispatchContext;
use crate::routing::matcher::{normalize_path, path_info};
use crate::routing::route::{PluginRequest, PluginResponse, PluginRoute};
use crate::routing::table::RouteTable;

/// Routes inbound requests to plugin handlers.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    table: Arc<RouteTable>,
}

impl Dispatcher {
    pub fn new(table: Arc<RouteTable>) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &Arc<RouteTable> {
        &self.table
    }

    /// Find the route serving `path`.
    pub fn resolve(&self, path: &str) -> Result<Arc<PluginRoute>, DispatchError> {
        self.table
            .resolve(path)
            .ok_or_else(|| DispatchError::RouteNotFound(normalize_path(path)))
    }

    /// Serve one request.
    pub fn dispatch(
        &self,
        path: &str,
        payload: Vec<u8>,
        context: &DispatchContext,
    ) -> Result<PluginResponse, DispatchError> {
        let span = tracing::debug_span!(
            "dispatch",
            request_id = %context.request_id,
            path = %path
        );
        let _entered = span.enter();
        let started = Instant::now();

        let path = normalize_path(path);
        let result = self
            .resolve(&path)
            .and_then(|route| self.serve(route, &path, payload, context));

        let outcome = match &result {
            Ok(_) => "ok",
            Err(err) => err.kind(),
        };
        metrics::record_dispatch(outcome, started.elapsed());

        match &result {
            Ok(response) => tracing::debug!(status = response.status, "Request dispatched"),
            Err(DispatchError::RouteNotFound(_)) => tracing::debug!("No route for request"),
            Err(err) => tracing::warn!(error = %err, "Dispatch failed"),
        }
        result
    }

    /// Call a resolved route. A route replaced between lookup and call is
    /// looked up once more, so the prefix's current handler serves it.
    fn serve(
        &self,
        route: Arc<PluginRoute>,
        path: &str,
        payload: Vec<u8>,
        context: &DispatchContext,
    ) -> Result<PluginResponse, DispatchError> {
        let mut request = PluginRequest {
            path: path.to_string(),
            path_info: path_info(route.prefix(), path).to_string(),
            payload,
        };
        match route.call(&request, context) {
            Err(DispatchError::RouteNotFound(_)) => {
                let current = self.resolve(path)?;
                if Arc::ptr_eq(&current, &route) {
                    return Err(DispatchError::RouteNotFound(path.to_string()));
                }
                tracing::debug!(prefix = %current.prefix(), "Route replaced during dispatch, retrying");
                request.path_info = path_info(current.prefix(), path).to_string();
                current.call(&request, context)
            }
            other => other,
        }
    }
}
