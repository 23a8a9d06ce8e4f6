//! Properties file watcher for hot reload.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};

use crate::config::properties::FileProperties;

/// Reloads a [`FileProperties`] whenever its file changes.
///
/// A failed reload is logged and the previous values stay active.
pub struct PropertiesWatcher {
    properties: Arc<FileProperties>,
    poll_interval: Duration,
    active: Mutex<Option<RecommendedWatcher>>,
}

impl PropertiesWatcher {
    pub fn new(properties: Arc<FileProperties>, poll_interval: Duration) -> Self {
        Self {
            properties,
            poll_interval,
            active: Mutex::new(None),
        }
    }

    /// Start watching in the background. Starting twice is a no-op.
    pub fn start(&self) -> Result<(), notify::Error> {
        let mut active = self.active.lock().unwrap_or_else(PoisonError::into_inner);
        if active.is_some() {
            return Ok(());
        }

        let properties = self.properties.clone();
        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) if event.kind.is_modify() || event.kind.is_create() => {
                    tracing::info!("Properties file change detected, reloading...");
                    match properties.refresh() {
                        Ok(Some(keys)) => tracing::info!(keys, "Properties reloaded"),
                        Ok(None) => tracing::debug!("Properties file is empty, waiting for content"),
                        Err(e) => tracing::error!(
                            error = %e,
                            "Failed to reload properties. Keeping current values."
                        ),
                    }
                }
                Ok(_) => {}
                Err(e) => tracing::error!("Watch error: {:?}", e),
            },
            Config::default().with_poll_interval(self.poll_interval),
        )?;

        watcher.watch(self.properties.path(), RecursiveMode::NonRecursive)?;
        tracing::info!(path = ?self.properties.path(), "Properties watcher started");
        *active = Some(watcher);
        Ok(())
    }

    /// Stop watching. Stopping an idle watcher is a no-op.
    pub fn stop(&self) {
        let stopped = self
            .active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if stopped.is_some() {
            tracing::info!(path = ?self.properties.path(), "Properties watcher stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::properties::ConfigSource;

    #[test]
    fn test_start_and_stop() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("watched.toml");
        std::fs::write(&path, "plan = \"basic\"\n").unwrap();
        let properties = Arc::new(FileProperties::load(&path).unwrap());
        let watcher = PropertiesWatcher::new(properties.clone(), Duration::from_millis(50));

        watcher.start().unwrap();
        watcher.start().unwrap();
        assert!(watcher.is_running());
        assert_eq!(properties.get("plan").as_deref(), Some("basic"));

        watcher.stop();
        assert!(!watcher.is_running());
        watcher.stop();
    }
}
