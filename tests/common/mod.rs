//! Shared fixtures for the integration tests.
#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use billing_platform::lifecycle::{HandlerDeclarations, LifecycleLevel, PlatformService};
use billing_platform::routing::{
    ExecutionScope, IsolationProvider, PluginError, PluginHandler, PluginRequest, PluginResponse,
};

/// Ordered record of events, shared between fixtures.
#[derive(Clone, Default)]
pub struct Journal(Arc<Mutex<Vec<String>>>);

impl Journal {
    pub fn record(&self, entry: impl Into<String>) {
        self.0.lock().unwrap().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.0.lock().unwrap().clear();
    }
}

/// A service that records `name@level` whenever one of its handlers runs.
pub struct RecordingService {
    pub name: Option<String>,
    pub ordering: i32,
    pub levels: Vec<LifecycleLevel>,
    pub fail_at: Option<LifecycleLevel>,
    pub journal: Journal,
}

impl RecordingService {
    pub fn new(name: &str, levels: &[LifecycleLevel], journal: &Journal) -> Self {
        Self {
            name: Some(name.to_string()),
            ordering: 0,
            levels: levels.to_vec(),
            fail_at: None,
            journal: journal.clone(),
        }
    }

    pub fn ordering(mut self, ordering: i32) -> Self {
        self.ordering = ordering;
        self
    }

    pub fn failing_at(mut self, level: LifecycleLevel) -> Self {
        self.fail_at = Some(level);
        self
    }

    pub fn label(&self) -> String {
        self.name.clone().unwrap_or_else(|| "anonymous".to_string())
    }

    pub fn shared(self) -> Arc<dyn PlatformService> {
        Arc::new(self)
    }
}

impl PlatformService for RecordingService {
    fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    fn registration_ordering(&self) -> i32 {
        self.ordering
    }

    fn declare_handlers(self: Arc<Self>, handlers: &mut HandlerDeclarations) {
        for &level in &self.levels {
            let service = self.clone();
            handlers.on(level, move || {
                service.journal.record(format!("{}@{}", service.label(), level));
                if service.fail_at == Some(level) {
                    return Err(format!("{} failed", service.label()).into());
                }
                Ok(())
            });
        }
    }
}

/// Plugin handler that counts its calls and can be slowed down.
#[derive(Default)]
pub struct CountingHandler {
    pub inits: AtomicUsize,
    pub requests: AtomicUsize,
    pub destroys: AtomicUsize,
    pub init_delay: Duration,
    pub handle_delay: Duration,
    pub reply: &'static str,
}

impl CountingHandler {
    pub fn new(reply: &'static str) -> Self {
        Self {
            reply,
            ..Self::default()
        }
    }

    pub fn with_init_delay(mut self, delay: Duration) -> Self {
        self.init_delay = delay;
        self
    }

    pub fn with_handle_delay(mut self, delay: Duration) -> Self {
        self.handle_delay = delay;
        self
    }

    pub fn inits(&self) -> usize {
        self.inits.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    pub fn destroys(&self) -> usize {
        self.destroys.load(Ordering::SeqCst)
    }
}

impl PluginHandler for CountingHandler {
    fn init(&self, _scope: &ExecutionScope<'_>) -> Result<(), PluginError> {
        std::thread::sleep(self.init_delay);
        self.inits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn handle(
        &self,
        _scope: &ExecutionScope<'_>,
        _request: &PluginRequest,
    ) -> Result<PluginResponse, PluginError> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        std::thread::sleep(self.handle_delay);
        Ok(PluginResponse::ok(self.reply))
    }

    fn destroy(&self, _scope: &ExecutionScope<'_>) {
        self.destroys.fetch_add(1, Ordering::SeqCst);
    }
}

/// Isolation provider that journals `enter:<label>` / `exit:<label>`.
pub struct RecordingProvider {
    pub label: String,
    pub journal: Journal,
}

impl RecordingProvider {
    pub fn new(label: &str, journal: &Journal) -> Arc<Self> {
        Arc::new(Self {
            label: label.to_string(),
            journal: journal.clone(),
        })
    }
}

impl IsolationProvider for RecordingProvider {
    fn enter(&self) -> Result<(), PluginError> {
        self.journal.record(format!("enter:{}", self.label));
        Ok(())
    }

    fn exit(&self) {
        self.journal.record(format!("exit:{}", self.label));
    }
}

/// A path inside a fresh directory that is removed when the guard drops.
pub fn temp_path(file_name: &str) -> (tempfile::TempDir, std::path::PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(file_name);
    (dir, path)
}
