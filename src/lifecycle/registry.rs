//! Per-level handler collections.
//!
//! # Design Decisions
//! - Order key is (registration ordering, registration sequence), both ascending
//! - The sequence number is assigned at insertion, so equal orderings fire in
//!   registration call order
//! - Filled once while the coordinator is built, read-only afterwards

use std::collections::BTreeMap;

use crate::lifecycle::level::LifecycleLevel;
use crate::lifecycle::service::LifecycleHandler;

#[derive(Debug)]
struct Entry {
    ordering: i32,
    sequence: u64,
    handler: LifecycleHandler,
}

impl Entry {
    fn key(&self) -> (i32, u64) {
        (self.ordering, self.sequence)
    }
}

/// Ordered handlers of a single level.
#[derive(Debug, Default)]
pub struct HandlerSet {
    entries: Vec<Entry>,
}

impl HandlerSet {
    fn insert(&mut self, entry: Entry) {
        let key = entry.key();
        let at = self.entries.partition_point(|existing| existing.key() <= key);
        self.entries.insert(at, entry);
    }

    pub fn iter(&self) -> impl Iterator<Item = &LifecycleHandler> {
        self.entries.iter().map(|entry| &entry.handler)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// All handler sets, keyed by level.
#[derive(Debug, Default)]
pub struct LevelRegistry {
    levels: BTreeMap<LifecycleLevel, HandlerSet>,
    next_sequence: u64,
}

impl LevelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Place `handler` into its level, after every handler with a lower or equal key.
    pub fn insert(&mut self, handler: LifecycleHandler) {
        let sequence = self.next_sequence;
        self.next_sequence += 1;

        let entry = Entry {
            ordering: handler.service().registration_ordering,
            sequence,
            handler,
        };
        self.levels.entry(entry.handler.level()).or_default().insert(entry);
    }

    /// Handlers of `level` in firing order; `None` when nothing registered.
    pub fn handlers(&self, level: LifecycleLevel) -> Option<&HandlerSet> {
        self.levels.get(&level)
    }

    /// Total number of registered handlers.
    pub fn len(&self) -> usize {
        self.levels.values().map(HandlerSet::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::lifecycle::service::{describe, HandlerDeclarations, PlatformService};

    struct Ordered {
        name: String,
        ordering: i32,
        levels: Vec<LifecycleLevel>,
    }

    impl PlatformService for Ordered {
        fn name(&self) -> Option<&str> {
            Some(&self.name)
        }

        fn registration_ordering(&self) -> i32 {
            self.ordering
        }

        fn declare_handlers(self: Arc<Self>, handlers: &mut HandlerDeclarations) {
            for level in &self.levels {
                handlers.on(*level, || Ok(()));
            }
        }
    }

    fn register(registry: &mut LevelRegistry, name: &str, ordering: i32, levels: &[LifecycleLevel]) {
        let service = Arc::new(Ordered {
            name: name.to_string(),
            ordering,
            levels: levels.to_vec(),
        });
        for handler in describe(service).unwrap() {
            registry.insert(handler);
        }
    }

    fn names(registry: &LevelRegistry, level: LifecycleLevel) -> Vec<String> {
        registry
            .handlers(level)
            .map(|set| set.iter().map(|h| h.service().to_string()).collect())
            .unwrap_or_default()
    }

    #[test]
    fn test_orders_by_registration_ordering() {
        let mut registry = LevelRegistry::new();
        register(&mut registry, "late", 10, &[LifecycleLevel::InitService]);
        register(&mut registry, "early", -3, &[LifecycleLevel::InitService]);
        register(&mut registry, "middle", 2, &[LifecycleLevel::InitService]);

        assert_eq!(names(&registry, LifecycleLevel::InitService), vec!["early", "middle", "late"]);
    }

    #[test]
    fn test_ties_keep_registration_order() {
        let mut registry = LevelRegistry::new();
        for name in ["a", "b", "c", "d"] {
            register(&mut registry, name, 0, &[LifecycleLevel::StartService]);
        }
        register(&mut registry, "first", -1, &[LifecycleLevel::StartService]);

        assert_eq!(
            names(&registry, LifecycleLevel::StartService),
            vec!["first", "a", "b", "c", "d"]
        );
    }

    #[test]
    fn test_levels_are_kept_apart() {
        let mut registry = LevelRegistry::new();
        register(&mut registry, "bus", 0, &[LifecycleLevel::InitBus, LifecycleLevel::Shutdown]);

        assert_eq!(registry.len(), 2);
        assert_eq!(names(&registry, LifecycleLevel::InitBus), vec!["bus"]);
        assert!(registry.handlers(LifecycleLevel::StartPlugin).is_none());
    }
}
