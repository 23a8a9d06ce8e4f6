//! Startup/shutdown sequencing.
//!
//! # Responsibilities
//! - Capture every service's handlers once, at construction
//! - Fire the levels of a phase in priority order, handlers in registry order
//! - Report handler failures with service and level identity
//!
//! # Design Decisions
//! - Strictly sequential on the calling thread; no fan-out
//! - Best effort by default: a failing or panicking handler is logged and the
//!   phase continues. `FailurePolicy::Abort` stops the phase instead
//! - Re-firing a phase re-invokes its handlers; at-most-once is the host's call

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::lifecycle::error::{ConfigurationError, HandlerInvocationError};
use crate::lifecycle::level::{LifecycleLevel, LifecyclePhase};
use crate::lifecycle::registry::LevelRegistry;
use crate::lifecycle::service::{describe, LifecycleHandler, PlatformService, ServiceDirectory};
use crate::observability::metrics;

/// What a phase does after a handler fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Log the failure and run the remaining handlers.
    #[default]
    Continue,
    /// Skip every handler left in the phase.
    Abort,
}

/// Outcome of one phase firing.
#[derive(Debug, Clone)]
pub struct PhaseReport {
    pub phase: LifecyclePhase,
    /// Handlers that were called, failed ones included.
    pub invoked: usize,
    pub failures: Vec<HandlerInvocationError>,
    /// True when the abort policy cut the phase short.
    pub aborted: bool,
}

impl PhaseReport {
    fn new(phase: LifecyclePhase) -> Self {
        Self {
            phase,
            invoked: 0,
            failures: Vec::new(),
            aborted: false,
        }
    }

    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Accumulates services before the coordinator is frozen.
#[derive(Debug, Default)]
pub struct CoordinatorBuilder {
    registry: LevelRegistry,
    policy: FailurePolicy,
    services: usize,
}

impl CoordinatorBuilder {
    pub fn failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Register one service.
    ///
    /// On error the service contributes nothing; services registered before
    /// and after are unaffected.
    pub fn register(&mut self, service: Arc<dyn PlatformService>) -> Result<(), ConfigurationError> {
        let handlers = describe(service)?;
        if let Some(first) = handlers.first() {
            tracing::debug!(
                service = %first.service(),
                handlers = handlers.len(),
                "Registered lifecycle handlers"
            );
        }
        for handler in handlers {
            self.registry.insert(handler);
        }
        self.services += 1;
        Ok(())
    }

    pub fn build(self) -> LifecycleCoordinator {
        tracing::info!(
            services = self.services,
            handlers = self.registry.len(),
            policy = ?self.policy,
            "Lifecycle coordinator ready"
        );
        LifecycleCoordinator {
            registry: self.registry,
            policy: self.policy,
        }
    }
}

/// Fires lifecycle phases across all registered services.
#[derive(Debug)]
pub struct LifecycleCoordinator {
    registry: LevelRegistry,
    policy: FailurePolicy,
}

impl LifecycleCoordinator {
    pub fn builder() -> CoordinatorBuilder {
        CoordinatorBuilder::default()
    }

    /// Register every service of `directory`, failing on the first bad declaration.
    pub fn new(
        directory: &dyn ServiceDirectory,
        policy: FailurePolicy,
    ) -> Result<Self, ConfigurationError> {
        let mut builder = Self::builder().failure_policy(policy);
        for service in directory.services() {
            builder.register(service)?;
        }
        Ok(builder.build())
    }

    pub fn failure_policy(&self) -> FailurePolicy {
        self.policy
    }

    /// Number of handlers registered for `level`.
    pub fn handler_count(&self, level: LifecycleLevel) -> usize {
        self.registry.handlers(level).map_or(0, |set| set.len())
    }

    pub fn fire_startup_sequence_prior_event_registration(&self) {
        self.fire_phase(LifecyclePhase::StartupPreEventRegistration);
    }

    pub fn fire_startup_sequence_post_event_registration(&self) {
        self.fire_phase(LifecyclePhase::StartupPostEventRegistration);
    }

    pub fn fire_shutdown_sequence_prior_event_unregistration(&self) {
        self.fire_phase(LifecyclePhase::ShutdownPreEventUnregistration);
    }

    pub fn fire_shutdown_sequence_post_event_unregistration(&self) {
        self.fire_phase(LifecyclePhase::ShutdownPostEventUnregistration);
    }

    /// Fire every level of `phase` and report what happened.
    pub fn fire_phase(&self, phase: LifecyclePhase) -> PhaseReport {
        let span = tracing::info_span!("lifecycle_phase", phase = %phase);
        let _entered = span.enter();
        let started = Instant::now();
        let mut report = PhaseReport::new(phase);

        tracing::info!("Firing lifecycle phase");
        for level in phase.levels() {
            if !self.fire_level(level, &mut report) {
                report.aborted = true;
                tracing::error!(
                    level = %level,
                    failures = report.failures.len(),
                    "Lifecycle phase aborted"
                );
                break;
            }
        }

        tracing::info!(
            invoked = report.invoked,
            failures = report.failures.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Lifecycle phase complete"
        );
        report
    }

    /// Returns false when the phase must stop.
    fn fire_level(&self, level: LifecycleLevel, report: &mut PhaseReport) -> bool {
        let Some(handlers) = self.registry.handlers(level) else {
            tracing::trace!(level = %level, "No handlers for level");
            return true;
        };

        let started = Instant::now();
        tracing::debug!(level = %level, handlers = handlers.len(), "Firing lifecycle level");

        for handler in handlers.iter() {
            report.invoked += 1;
            metrics::record_lifecycle_handler(level.as_str());

            if let Err(failure) = invoke(handler) {
                tracing::warn!(
                    service = %failure.service,
                    level = %failure.level,
                    error = %failure.message,
                    "Lifecycle handler failed"
                );
                metrics::record_lifecycle_failure(level.as_str());
                report.failures.push(failure);

                if self.policy == FailurePolicy::Abort {
                    return false;
                }
            }
        }

        tracing::debug!(
            level = %level,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Lifecycle level done"
        );
        true
    }
}

fn invoke(handler: &LifecycleHandler) -> Result<(), HandlerInvocationError> {
    let message = match panic::catch_unwind(AssertUnwindSafe(|| handler.invoke())) {
        Ok(Ok(())) => return Ok(()),
        Ok(Err(err)) => err.to_string(),
        Err(payload) => format!("panicked: {}", panic_message(payload.as_ref())),
    };
    Err(HandlerInvocationError {
        service: handler.service().to_string(),
        level: handler.level(),
        message,
    })
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
