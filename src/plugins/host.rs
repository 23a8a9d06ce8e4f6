//! Plugin activation and deactivation.

use std::sync::{Arc, Mutex, PoisonError};

use dashmap::DashMap;
use thiserror::Error;

use crate::routing::{IsolationContext, PluginHandler, PluginRoute, RouteError, RouteTable};

/// A plugin's routes, installed and removed together.
pub struct PluginBundle {
    name: String,
    isolation: IsolationContext,
    routes: Vec<(String, Arc<dyn PluginHandler>)>,
}

impl PluginBundle {
    /// A bundle whose routes run under `isolation`.
    pub fn new(name: impl Into<String>, isolation: IsolationContext) -> Self {
        Self {
            name: name.into(),
            isolation,
            routes: Vec::new(),
        }
    }

    pub fn route(mut self, prefix: impl Into<String>, handler: Arc<dyn PluginHandler>) -> Self {
        self.routes.push((prefix.into(), handler));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

#[derive(Debug, Error)]
#[error("failed to activate plugin {plugin}: {source}")]
pub struct ActivationError {
    pub plugin: String,
    #[source]
    pub source: RouteError,
}

/// Tracks which routes each active plugin owns.
///
/// Activation and deactivation of one plugin name are serialized; different
/// plugins proceed independently.
#[derive(Debug)]
pub struct PluginHost {
    table: Arc<RouteTable>,
    active: DashMap<String, Vec<Arc<PluginRoute>>>,
    gates: DashMap<String, Arc<Mutex<()>>>,
}

impl PluginHost {
    pub fn new(table: Arc<RouteTable>) -> Self {
        Self {
            table,
            active: DashMap::new(),
            gates: DashMap::new(),
        }
    }

    fn gate(&self, name: &str) -> Arc<Mutex<()>> {
        self.gates.entry(name.to_string()).or_default().clone()
    }

    /// Register every route of `bundle`.
    ///
    /// An active plugin with the same name is deactivated first. If any
    /// route fails to register, the routes already registered are removed
    /// again and the plugin is not active.
    pub fn activate(&self, bundle: PluginBundle) -> Result<usize, ActivationError> {
        let PluginBundle {
            name,
            isolation,
            routes,
        } = bundle;
        let gate = self.gate(&name);
        let _serialized = gate.lock().unwrap_or_else(PoisonError::into_inner);
        self.remove_routes(&name);

        let mut installed = Vec::with_capacity(routes.len());
        for (prefix, handler) in routes {
            match self.table.register(&prefix, handler, isolation.clone()) {
                Ok(route) => installed.push(route),
                Err(source) => {
                    for route in &installed {
                        self.table.unregister_route(route);
                    }
                    tracing::error!(plugin = %name, error = %source, "Plugin activation rolled back");
                    return Err(ActivationError { plugin: name, source });
                }
            }
        }

        let count = installed.len();
        tracing::info!(plugin = %name, routes = count, context = %isolation.label(), "Plugin activated");
        if let Some(leftover) = self.active.insert(name.clone(), installed) {
            for route in &leftover {
                self.table.unregister_route(route);
            }
        }
        self.prune_orphans(&name);
        Ok(count)
    }

    /// Remove the routes `name` still owns. Unknown plugins are a no-op.
    ///
    /// Prefixes that another plugin has since taken over are left alone.
    pub fn deactivate(&self, name: &str) -> usize {
        let gate = self.gate(name);
        let _serialized = gate.lock().unwrap_or_else(PoisonError::into_inner);
        self.remove_routes(name)
    }

    /// Caller holds the gate for `name`.
    fn remove_routes(&self, name: &str) -> usize {
        let Some((_, routes)) = self.active.remove(name) else {
            tracing::debug!(plugin = %name, "Deactivation of inactive plugin ignored");
            return 0;
        };

        let removed = routes
            .iter()
            .filter(|route| self.table.unregister_route(route))
            .count();
        tracing::info!(plugin = %name, routes = removed, "Plugin deactivated");
        removed
    }

    /// Forget plugins whose routes have all been taken over by others.
    fn prune_orphans(&self, keep: &str) {
        self.active.retain(|name, routes| {
            let owns_any = routes.iter().any(|route| self.owns(route));
            if !owns_any && name != keep {
                tracing::info!(plugin = %name, "Plugin lost all its routes, no longer active");
            }
            owns_any || name == keep
        });
    }

    fn owns(&self, route: &Arc<PluginRoute>) -> bool {
        self.table
            .get(route.prefix())
            .is_some_and(|current| Arc::ptr_eq(&current, route))
    }

    /// Deactivate every plugin.
    pub fn deactivate_all(&self) -> usize {
        self.active_plugins()
            .iter()
            .map(|name| self.deactivate(name))
            .sum()
    }

    /// Names of active plugins, sorted.
    pub fn active_plugins(&self) -> Vec<String> {
        let mut names: Vec<String> = self.active.iter().map(|entry| entry.key().clone()).collect();
        names.sort();
        names
    }

    pub fn is_active(&self, name: &str) -> bool {
        self.active.contains_key(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::{ConflictPolicy, ExecutionScope, PluginError, PluginRequest, PluginResponse};

    struct Echo;

    impl PluginHandler for Echo {
        fn handle(
            &self,
            _scope: &ExecutionScope<'_>,
            request: &PluginRequest,
        ) -> Result<PluginResponse, PluginError> {
            Ok(PluginResponse::ok(request.path_info.clone()))
        }
    }

    fn bundle(name: &str, prefixes: &[&str]) -> PluginBundle {
        prefixes.iter().fold(
            PluginBundle::new(name, IsolationContext::unconfined(name)),
            |bundle, prefix| bundle.route(*prefix, Arc::new(Echo)),
        )
    }

    #[test]
    fn test_activate_and_deactivate() {
        let table = Arc::new(RouteTable::default());
        let host = PluginHost::new(table.clone());

        assert_eq!(host.activate(bundle("tax", &["/tax", "/tax/rates"])).unwrap(), 2);
        assert_eq!(table.prefixes(), vec!["/tax", "/tax/rates"]);
        assert!(host.is_active("tax"));

        assert_eq!(host.deactivate("tax"), 2);
        assert!(table.is_empty());
        assert_eq!(host.deactivate("tax"), 0);
    }

    #[test]
    fn test_reactivation_replaces_previous_bundle() {
        let table = Arc::new(RouteTable::default());
        let host = PluginHost::new(table.clone());

        host.activate(bundle("tax", &["/tax", "/vat"])).unwrap();
        host.activate(bundle("tax", &["/tax"])).unwrap();
        assert_eq!(table.prefixes(), vec!["/tax"]);
        assert_eq!(host.active_plugins(), vec!["tax"]);
    }

    #[test]
    fn test_reject_conflict_rolls_back_whole_bundle() {
        let table = Arc::new(RouteTable::new(ConflictPolicy::Reject));
        let host = PluginHost::new(table.clone());

        host.activate(bundle("usage", &["/usage"])).unwrap();
        let err = host.activate(bundle("metering", &["/meter", "/usage"])).unwrap_err();

        assert_eq!(err.plugin, "metering");
        assert!(matches!(err.source, RouteError::Conflict(_)));
        assert_eq!(table.prefixes(), vec!["/usage"]);
        assert!(!host.is_active("metering"));
    }

    #[test]
    fn test_deactivate_leaves_taken_over_prefix() {
        let table = Arc::new(RouteTable::default());
        let host = PluginHost::new(table.clone());

        host.activate(bundle("old", &["/invoices"])).unwrap();
        host.activate(bundle("new", &["/invoices"])).unwrap();

        assert_eq!(host.active_plugins(), vec!["new"]);
        assert_eq!(host.deactivate("old"), 0);
        assert_eq!(table.resolve("/invoices").unwrap().isolation().label(), "new");
        assert_eq!(host.deactivate_all(), 1);
        assert!(table.is_empty());
    }
}
