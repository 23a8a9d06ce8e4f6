//! Lifecycle coordinator behaviour across many services.

use std::sync::Arc;

use billing_platform::lifecycle::{
    ConfigurationError, FailurePolicy, HandlerDeclarations, LifecycleCoordinator, LifecycleLevel,
    LifecyclePhase, PlatformService,
};

mod common;

use common::{Journal, RecordingService};

use LifecycleLevel::*;

#[test]
fn test_phase_handler_counts() {
    let journal = Journal::default();
    let services: Vec<Arc<dyn PlatformService>> = vec![
        RecordingService::new("service1", &[InitBus, StartService, Shutdown], &journal).shared(),
        RecordingService::new(
            "service2",
            &[LoadCatalog, InitService, StopService, StartService],
            &journal,
        )
        .shared(),
    ];
    let coordinator = LifecycleCoordinator::new(&services, FailurePolicy::Continue).unwrap();

    let expected = [
        (LifecyclePhase::StartupPreEventRegistration, 3),
        (LifecyclePhase::StartupPostEventRegistration, 2),
        (LifecyclePhase::ShutdownPreEventUnregistration, 1),
        (LifecyclePhase::ShutdownPostEventUnregistration, 1),
    ];
    for (phase, invoked) in expected {
        let report = coordinator.fire_phase(phase);
        assert_eq!(report.invoked, invoked, "phase {phase}");
        assert!(report.is_success());
    }

    assert_eq!(
        journal.entries(),
        vec![
            "service2@load-catalog",
            "service1@init-bus",
            "service2@init-service",
            "service1@start-service",
            "service2@start-service",
            "service2@stop-service",
            "service1@shutdown",
        ]
    );
}

#[test]
fn test_named_triggers_fire_their_phase() {
    let journal = Journal::default();
    let services: Vec<Arc<dyn PlatformService>> =
        vec![RecordingService::new("billing", &LifecycleLevel::ALL, &journal).shared()];
    let coordinator = LifecycleCoordinator::new(&services, FailurePolicy::Continue).unwrap();

    coordinator.fire_startup_sequence_prior_event_registration();
    assert_eq!(journal.entries().len(), 4);
    coordinator.fire_startup_sequence_post_event_registration();
    assert_eq!(journal.entries().len(), 6);
    coordinator.fire_shutdown_sequence_prior_event_unregistration();
    assert_eq!(journal.entries().len(), 8);
    coordinator.fire_shutdown_sequence_post_event_unregistration();
    assert_eq!(journal.entries().last().map(String::as_str), Some("billing@shutdown"));
}

#[test]
fn test_ordering_is_total_across_many_services() {
    let journal = Journal::default();
    // Orderings repeat so ties fall back to registration order.
    let services: Vec<Arc<dyn PlatformService>> = (0..120)
        .map(|i| {
            RecordingService::new(&format!("svc{i:03}"), &[StartService], &journal)
                .ordering((i * 7) % 5)
                .shared()
        })
        .collect();
    let coordinator = LifecycleCoordinator::new(&services, FailurePolicy::Continue).unwrap();

    coordinator.fire_phase(LifecyclePhase::StartupPostEventRegistration);
    let first = journal.entries();

    let mut expected: Vec<(i32, usize)> = (0..120).map(|i| (((i * 7) % 5) as i32, i)).collect();
    expected.sort();
    let expected: Vec<String> = expected
        .into_iter()
        .map(|(_, i)| format!("svc{i:03}@start-service"))
        .collect();
    assert_eq!(first, expected);

    // Refiring yields the same sequence.
    journal.clear();
    coordinator.fire_phase(LifecyclePhase::StartupPostEventRegistration);
    assert_eq!(journal.entries(), first);
}

#[test]
fn test_distinct_orderings_fire_in_ascending_order() {
    let journal = Journal::default();
    // 37 is coprime with 101, so every ordering in -50..=50 appears once,
    // registered out of order.
    let orderings: Vec<i32> = (0..101).map(|i| (i * 37) % 101 - 50).collect();
    let services: Vec<Arc<dyn PlatformService>> = orderings
        .iter()
        .map(|ordering| {
            RecordingService::new(&ordering.to_string(), &[StopService], &journal)
                .ordering(*ordering)
                .shared()
        })
        .collect();
    let coordinator = LifecycleCoordinator::new(&services, FailurePolicy::Continue).unwrap();

    coordinator.fire_shutdown_sequence_prior_event_unregistration();

    let fired: Vec<i32> = journal
        .entries()
        .iter()
        .map(|entry| entry.trim_end_matches("@stop-service").parse().unwrap())
        .collect();
    assert_eq!(fired.len(), 101);
    assert!(fired.windows(2).all(|w| w[0] < w[1]), "out of order: {fired:?}");
    assert_eq!(fired.first(), Some(&-50));
    assert_eq!(fired.last(), Some(&50));
}

#[test]
fn test_union_of_phases_invokes_every_handler_once() {
    let journal = Journal::default();
    let services: Vec<Arc<dyn PlatformService>> = (0..10)
        .map(|i| {
            let levels: Vec<_> = LifecycleLevel::ALL
                .iter()
                .copied()
                .filter(|level| (*level as usize + i) % 3 != 0)
                .collect();
            RecordingService::new(&format!("svc{i}"), &levels, &journal).shared()
        })
        .collect();
    let coordinator = LifecycleCoordinator::new(&services, FailurePolicy::Continue).unwrap();
    let registered: usize = LifecycleLevel::ALL
        .iter()
        .map(|level| coordinator.handler_count(*level))
        .sum();

    for phase in LifecyclePhase::SEQUENCE {
        coordinator.fire_phase(phase);
    }

    let mut entries = journal.entries();
    assert_eq!(entries.len(), registered);
    entries.sort();
    entries.dedup();
    assert_eq!(entries.len(), registered);
}

#[test]
fn test_failures_do_not_stop_the_phase() {
    let journal = Journal::default();
    let services: Vec<Arc<dyn PlatformService>> = vec![
        RecordingService::new("ledger", &[InitService], &journal)
            .failing_at(InitService)
            .shared(),
        RecordingService::new("invoicing", &[InitService], &journal).shared(),
    ];
    let coordinator = LifecycleCoordinator::new(&services, FailurePolicy::Continue).unwrap();

    // The trigger itself never reports the failure.
    coordinator.fire_startup_sequence_prior_event_registration();
    assert_eq!(journal.entries(), vec!["ledger@init-service", "invoicing@init-service"]);

    let report = coordinator.fire_phase(LifecyclePhase::StartupPreEventRegistration);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].service, "ledger");
    assert_eq!(report.failures[0].level, InitService);
    assert!(!report.aborted);
}

#[test]
fn test_abort_policy_skips_rest_of_phase() {
    let journal = Journal::default();
    let services: Vec<Arc<dyn PlatformService>> = vec![
        RecordingService::new("catalog", &[LoadCatalog, InitService], &journal)
            .failing_at(LoadCatalog)
            .shared(),
        RecordingService::new("bus", &[InitBus, StartService], &journal).shared(),
    ];
    let coordinator = LifecycleCoordinator::new(&services, FailurePolicy::Abort).unwrap();

    let report = coordinator.fire_phase(LifecyclePhase::StartupPreEventRegistration);
    assert!(report.aborted);
    assert_eq!(journal.entries(), vec!["catalog@load-catalog"]);

    // The next phase still runs when the host fires it.
    coordinator.fire_phase(LifecyclePhase::StartupPostEventRegistration);
    assert_eq!(journal.entries().last().map(String::as_str), Some("bus@start-service"));
}

struct Manifest {
    levels: Vec<&'static str>,
}

impl PlatformService for Manifest {
    fn name(&self) -> Option<&str> {
        Some("manifest-plugin")
    }

    fn declare_handlers(self: Arc<Self>, handlers: &mut HandlerDeclarations) {
        for level in &self.levels {
            handlers.on_named(level, || Ok(()));
        }
    }
}

#[test]
fn test_bad_declaration_only_affects_that_service() {
    let journal = Journal::default();
    let mut builder = LifecycleCoordinator::builder();

    builder
        .register(RecordingService::new("before", &[InitPlugin], &journal).shared())
        .unwrap();
    let err = builder
        .register(Arc::new(Manifest {
            levels: vec!["init-plugin", "warm-caches"],
        }))
        .unwrap_err();
    builder
        .register(RecordingService::new("after", &[InitPlugin], &journal).shared())
        .unwrap();

    assert!(matches!(err, ConfigurationError::InvalidDeclaration { ref service, .. } if service == "manifest-plugin"));
    let coordinator = builder.build();
    assert_eq!(coordinator.handler_count(InitPlugin), 2);

    coordinator.fire_phase(LifecyclePhase::StartupPreEventRegistration);
    assert_eq!(journal.entries(), vec!["before@init-plugin", "after@init-plugin"]);
}

#[test]
fn test_directory_construction_fails_on_bad_service() {
    let services: Vec<Arc<dyn PlatformService>> = vec![Arc::new(Manifest {
        levels: vec!["bootstrap"],
    })];
    let err = LifecycleCoordinator::new(&services, FailurePolicy::Continue).unwrap_err();
    assert!(err.to_string().contains("manifest-plugin"));
}
