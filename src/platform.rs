//! Platform composition root.
//!
//! # Responsibilities
//! - Build the lifecycle coordinator, route table, dispatcher and plugin host
//!   from a validated `PlatformConfig`
//! - Register the infrastructure services ahead of application services
//! - Expose one handle the host binary (or an embedding process) drives
//!
//! # Design Decisions
//! - Infrastructure services are ordinary `PlatformService`s; they get no
//!   special path through the coordinator
//! - The properties watcher starts at `init-service` and stops at `shutdown`
//! - Plugins are deactivated at `stop-plugin` with ordering `i32::MAX`.
//!   Handlers with a lower ordering still see them active; a service that
//!   also uses `i32::MAX` is registered later and runs after deactivation

use std::future::Future;
use std::io;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::config::{
    ConfigSource, EnvProperties, FileProperties, LayeredSource, PlatformConfig, PropertiesError,
    PropertiesWatcher, StaticProperties,
};
use crate::lifecycle::signals::HostSignal;
use crate::lifecycle::{
    ConfigurationError, HandlerDeclarations, LifecycleCoordinator, LifecycleLevel, LifecyclePhase,
    PhaseReport, PlatformService,
};
use crate::plugins::PluginHost;
use crate::routing::{
    DispatchContext, DispatchError, Dispatcher, IsolationContext, PluginHandler, PluginResponse,
    PluginRoute, RouteError, RouteTable,
};

/// Errors building a [`Platform`].
#[derive(Debug, Error)]
pub enum PlatformError {
    #[error(transparent)]
    Properties(#[from] PropertiesError),

    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
}

/// Starts and stops the properties file watcher.
struct PropertiesService {
    watcher: PropertiesWatcher,
}

impl PlatformService for PropertiesService {
    fn name(&self) -> Option<&str> {
        Some("platform-properties")
    }

    fn registration_ordering(&self) -> i32 {
        i32::MIN
    }

    fn declare_handlers(self: Arc<Self>, handlers: &mut HandlerDeclarations) {
        let start = self.clone();
        handlers
            .on(LifecycleLevel::InitService, move || {
                start.watcher.start().map_err(Into::into)
            })
            .on(LifecycleLevel::Shutdown, move || {
                self.watcher.stop();
                Ok(())
            });
    }
}

/// Deactivates every plugin at `stop-plugin`.
///
/// Runs last among handlers with ordering below `i32::MAX`; ties at
/// `i32::MAX` follow registration order.
struct PluginHostService {
    host: Arc<PluginHost>,
}

impl PlatformService for PluginHostService {
    fn name(&self) -> Option<&str> {
        Some("plugin-host")
    }

    fn registration_ordering(&self) -> i32 {
        i32::MAX
    }

    fn declare_handlers(self: Arc<Self>, handlers: &mut HandlerDeclarations) {
        handlers.on(LifecycleLevel::StopPlugin, move || {
            let routes = self.host.deactivate_all();
            tracing::info!(routes, "All plugins deactivated");
            Ok(())
        });
    }
}

/// Assembles a [`Platform`].
pub struct PlatformBuilder {
    config: PlatformConfig,
    table: Arc<RouteTable>,
    plugins: Arc<PluginHost>,
    services: Vec<Arc<dyn PlatformService>>,
    defaults: StaticProperties,
}

impl PlatformBuilder {
    pub fn new(config: PlatformConfig) -> Self {
        let table = Arc::new(RouteTable::new(config.routing.conflict_policy));
        let plugins = Arc::new(PluginHost::new(table.clone()));
        Self {
            config,
            table,
            plugins,
            services: Vec::new(),
            defaults: StaticProperties::new(),
        }
    }

    /// The plugin host the platform will use, for services that activate
    /// plugins from their lifecycle handlers.
    pub fn plugins(&self) -> Arc<PluginHost> {
        self.plugins.clone()
    }

    /// The route table the platform will use.
    pub fn routes(&self) -> Arc<RouteTable> {
        self.table.clone()
    }

    /// Add an application service. Registration follows call order.
    pub fn service(mut self, service: Arc<dyn PlatformService>) -> Self {
        self.services.push(service);
        self
    }

    /// Lowest-priority property value, used when no other source has `key`.
    pub fn default_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.defaults = self.defaults.with(key, value);
        self
    }

    pub fn build(self) -> Result<Platform, PlatformError> {
        let Self {
            config,
            table,
            plugins,
            services,
            defaults,
        } = self;

        let dispatcher = Dispatcher::new(table.clone());

        let mut properties = LayeredSource::new();
        if let Some(prefix) = &config.properties.env_prefix {
            properties = properties.push(Arc::new(EnvProperties::new(prefix.clone())));
        }
        let file = match &config.properties.path {
            Some(path) => Some(Arc::new(FileProperties::load(path)?)),
            None => None,
        };
        if let Some(file) = &file {
            properties = properties.push(file.clone());
        }
        properties = properties.push(Arc::new(defaults));
        let properties: Arc<dyn ConfigSource> = Arc::new(properties);
        tracing::info!(source = %properties.describe(), "Platform properties configured");

        let mut coordinator =
            LifecycleCoordinator::builder().failure_policy(config.lifecycle.failure_policy);
        if let (Some(file), true) = (&file, config.properties.watch) {
            let watcher = PropertiesWatcher::new(
                file.clone(),
                Duration::from_secs(config.properties.poll_interval_secs),
            );
            coordinator.register(Arc::new(PropertiesService { watcher }))?;
        }
        coordinator.register(Arc::new(PluginHostService {
            host: plugins.clone(),
        }))?;
        for service in services {
            coordinator.register(service)?;
        }

        Ok(Platform {
            coordinator: coordinator.build(),
            table,
            dispatcher,
            plugins,
            properties,
            file,
        })
    }
}

/// A running billing platform host.
pub struct Platform {
    coordinator: LifecycleCoordinator,
    table: Arc<RouteTable>,
    dispatcher: Dispatcher,
    plugins: Arc<PluginHost>,
    properties: Arc<dyn ConfigSource>,
    file: Option<Arc<FileProperties>>,
}

impl Platform {
    pub fn builder(config: PlatformConfig) -> PlatformBuilder {
        PlatformBuilder::new(config)
    }

    pub fn coordinator(&self) -> &LifecycleCoordinator {
        &self.coordinator
    }

    pub fn routes(&self) -> &Arc<RouteTable> {
        &self.table
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn plugins(&self) -> &Arc<PluginHost> {
        &self.plugins
    }

    pub fn properties(&self) -> &Arc<dyn ConfigSource> {
        &self.properties
    }

    pub fn property(&self, key: &str) -> Option<String> {
        self.properties.get(key)
    }

    /// Re-read the properties file, if one is configured.
    pub fn reload_properties(&self) -> Option<Result<usize, PropertiesError>> {
        let file = self.file.as_ref()?;
        let result = file.reload();
        match &result {
            Ok(keys) => tracing::info!(keys, "Properties reloaded"),
            Err(err) => tracing::error!(error = %err, "Properties reload failed, keeping current values"),
        }
        Some(result)
    }

    pub fn register_route(
        &self,
        prefix: &str,
        handler: Arc<dyn PluginHandler>,
        isolation: IsolationContext,
    ) -> Result<Arc<PluginRoute>, RouteError> {
        self.table.register(prefix, handler, isolation)
    }

    pub fn unregister_route(&self, prefix: &str) -> bool {
        self.table.unregister(prefix).is_some()
    }

    pub fn dispatch(
        &self,
        path: &str,
        payload: Vec<u8>,
        context: &DispatchContext,
    ) -> Result<PluginResponse, DispatchError> {
        self.dispatcher.dispatch(path, payload, context)
    }

    pub fn fire_startup_sequence_prior_event_registration(&self) {
        self.coordinator.fire_startup_sequence_prior_event_registration();
    }

    pub fn fire_startup_sequence_post_event_registration(&self) {
        self.coordinator.fire_startup_sequence_post_event_registration();
    }

    pub fn fire_shutdown_sequence_prior_event_unregistration(&self) {
        self.coordinator.fire_shutdown_sequence_prior_event_unregistration();
    }

    pub fn fire_shutdown_sequence_post_event_unregistration(&self) {
        self.coordinator.fire_shutdown_sequence_post_event_unregistration();
    }

    pub fn fire_phase(&self, phase: LifecyclePhase) -> PhaseReport {
        self.coordinator.fire_phase(phase)
    }

    /// Fire both startup phases.
    pub fn start(&self) -> Vec<PhaseReport> {
        vec![
            self.fire_phase(LifecyclePhase::StartupPreEventRegistration),
            self.fire_phase(LifecyclePhase::StartupPostEventRegistration),
        ]
    }

    /// Fire both shutdown phases.
    pub fn stop(&self) -> Vec<PhaseReport> {
        vec![
            self.fire_phase(LifecyclePhase::ShutdownPreEventUnregistration),
            self.fire_phase(LifecyclePhase::ShutdownPostEventUnregistration),
        ]
    }

    /// Serve host signals until shutdown is requested, then stop.
    ///
    /// The platform is stopped even when the signal source fails; the
    /// failure is returned afterwards.
    pub async fn run_until_shutdown<S, F>(&self, mut next_signal: S) -> io::Result<()>
    where
        S: FnMut() -> F,
        F: Future<Output = io::Result<HostSignal>>,
    {
        let mut failure = None;
        loop {
            match next_signal().await {
                Ok(HostSignal::Reload) => {
                    if self.reload_properties().is_none() {
                        tracing::info!("No properties file configured, nothing to reload");
                    }
                }
                Ok(HostSignal::Shutdown) => break,
                Err(e) => {
                    tracing::error!(error = %e, "Signal handling failed, shutting down");
                    failure = Some(e);
                    break;
                }
            }
        }

        tracing::info!("Shutting down");
        self.stop();
        tracing::info!("Shutdown complete");
        failure.map_or(Ok(()), Err)
    }
}
