//! Concurrent prefix → route mapping.
//!
//! # Responsibilities
//! - Register and unregister plugin routes at any time
//! - Resolve a request path to the longest registered segment prefix
//!
//! # Design Decisions
//! - `DashMap` shards the table; readers and writers never take a global lock
//! - Entries are whole `Arc<PluginRoute>` values, so a reader sees either the
//!   old route or the new one, never a partial entry
//! - Re-registration follows an explicit `ConflictPolicy`
//! - Replaced and removed routes are retired after the map is updated and
//!   outside any shard lock

use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::observability::metrics;
use crate::routing::error::RouteError;
use crate::routing::isolation::IsolationContext;
use crate::routing::matcher::{normalize_path, normalize_prefix, segment_prefixes};
use crate::routing::route::{PluginHandler, PluginRoute};

/// What `register` does when the prefix is already taken.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConflictPolicy {
    /// Retire the existing route and install the new one (logged).
    #[default]
    Replace,
    /// Fail with `RouteError::Conflict`.
    Reject,
}

/// Route table counters.
#[derive(Debug, Clone, Serialize)]
pub struct RouteStats {
    pub route_count: usize,
    pub initialized_count: usize,
}

/// The live set of plugin routes.
#[derive(Debug, Default)]
pub struct RouteTable {
    routes: DashMap<String, Arc<PluginRoute>>,
    policy: ConflictPolicy,
}

impl RouteTable {
    pub fn new(policy: ConflictPolicy) -> Self {
        Self {
            routes: DashMap::new(),
            policy,
        }
    }

    pub fn conflict_policy(&self) -> ConflictPolicy {
        self.policy
    }

    /// Associate `prefix` with a fresh, uninitialized route.
    pub fn register(
        &self,
        prefix: &str,
        handler: Arc<dyn PluginHandler>,
        isolation: IsolationContext,
    ) -> Result<Arc<PluginRoute>, RouteError> {
        let prefix = normalize_prefix(prefix)?;
        let route = Arc::new(PluginRoute::new(prefix.clone(), handler, isolation));

        let replaced = match self.routes.entry(prefix.clone()) {
            Entry::Occupied(mut occupied) => match self.policy {
                ConflictPolicy::Reject => {
                    tracing::warn!(prefix = %prefix, "Rejected duplicate route registration");
                    return Err(RouteError::Conflict(prefix));
                }
                ConflictPolicy::Replace => Some(occupied.insert(route.clone())),
            },
            Entry::Vacant(vacant) => {
                vacant.insert(route.clone());
                None
            }
        };

        if let Some(previous) = replaced {
            tracing::warn!(
                prefix = %prefix,
                previous_context = %previous.isolation().label(),
                context = %route.isolation().label(),
                "Replacing registered route"
            );
            previous.retire();
        } else {
            tracing::info!(
                prefix = %prefix,
                context = %route.isolation().label(),
                "Registered plugin route"
            );
        }
        metrics::record_route_count(self.routes.len());
        Ok(route)
    }

    /// Remove `prefix`. Absent prefixes are a no-op.
    ///
    /// Once this returns, no dispatch reaches the removed handler.
    pub fn unregister(&self, prefix: &str) -> Option<Arc<PluginRoute>> {
        let Ok(prefix) = normalize_prefix(prefix) else {
            tracing::debug!(prefix = %prefix, "Ignoring unregister of invalid prefix");
            return None;
        };

        let Some((_, route)) = self.routes.remove(&prefix) else {
            tracing::debug!(prefix = %prefix, "Unregister of unknown route ignored");
            return None;
        };

        route.retire();
        tracing::info!(prefix = %prefix, "Unregistered plugin route");
        metrics::record_route_count(self.routes.len());
        Some(route)
    }

    /// Remove `route` only if it is still the one registered under its prefix.
    pub fn unregister_route(&self, route: &Arc<PluginRoute>) -> bool {
        let removed = self
            .routes
            .remove_if(route.prefix(), |_, current| Arc::ptr_eq(current, route));
        let Some((prefix, route)) = removed else {
            return false;
        };

        route.retire();
        tracing::info!(prefix = %prefix, "Unregistered plugin route");
        metrics::record_route_count(self.routes.len());
        true
    }

    /// Longest registered segment prefix of `path`.
    pub fn resolve(&self, path: &str) -> Option<Arc<PluginRoute>> {
        let path = normalize_path(path);
        segment_prefixes(&path)
            .find_map(|candidate| self.routes.get(candidate).map(|entry| entry.value().clone()))
    }

    /// Route registered under exactly `prefix`.
    pub fn get(&self, prefix: &str) -> Option<Arc<PluginRoute>> {
        let prefix = normalize_prefix(prefix).ok()?;
        self.routes.get(&prefix).map(|entry| entry.value().clone())
    }

    /// Registered prefixes, sorted.
    pub fn prefixes(&self) -> Vec<String> {
        let mut prefixes: Vec<String> = self.routes.iter().map(|entry| entry.key().clone()).collect();
        prefixes.sort();
        prefixes
    }

    pub fn stats(&self) -> RouteStats {
        let mut stats = RouteStats {
            route_count: 0,
            initialized_count: 0,
        };
        for entry in self.routes.iter() {
            stats.route_count += 1;
            if entry.value().is_initialized() {
                stats.initialized_count += 1;
            }
        }
        stats
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}
