//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Registration (once, coordinator.rs):
//!     ServiceDirectory → service.rs (describe: (level, callback) pairs)
//!     → registry.rs (insert into per-level ordered sets) → frozen coordinator
//!
//! Firing (host-driven, repeatable):
//!     startup-pre-events → startup-post-events → (steady state)
//!     → shutdown-pre-events → shutdown-post-events
//!     each phase: levels in priority order, handlers in (ordering, sequence) order
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → host fires the shutdown phases
//!     SIGHUP → host reloads properties
//! ```
//!
//! # Design Decisions
//! - Handler sets are immutable after construction (no locks on the firing path)
//! - Failures are logged with service + level and do not reach the trigger caller
//! - Phases run on the caller's thread; bounding their duration is the host's job

pub mod coordinator;
pub mod error;
pub mod level;
pub mod registry;
pub mod service;
pub mod signals;

pub use coordinator::{CoordinatorBuilder, FailurePolicy, LifecycleCoordinator, PhaseReport};
pub use error::{ConfigurationError, HandlerError, HandlerInvocationError};
pub use level::{LifecycleLevel, LifecyclePhase};
pub use service::{
    HandlerDeclarations, LifecycleHandler, PlatformService, ServiceDirectory, ServiceIdentity,
    DEFAULT_REGISTRATION_ORDERING,
};
