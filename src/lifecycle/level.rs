//! Lifecycle levels and the phases that fire them.
//!
//! # Design Decisions
//! - Declaration order of `LifecycleLevel` is the global level priority;
//!   `Ord` is derived so sorted collections follow it
//! - Every level belongs to exactly one phase
//! - Names are kebab-case, matching config files and log output

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::lifecycle::error::ConfigurationError;

/// A named step in the platform's startup/shutdown order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LifecycleLevel {
    LoadCatalog,
    InitBus,
    InitPlugin,
    InitService,
    StartPlugin,
    StartService,
    StopPlugin,
    StopService,
    Shutdown,
}

impl LifecycleLevel {
    /// All levels in priority order.
    pub const ALL: [LifecycleLevel; 9] = [
        LifecycleLevel::LoadCatalog,
        LifecycleLevel::InitBus,
        LifecycleLevel::InitPlugin,
        LifecycleLevel::InitService,
        LifecycleLevel::StartPlugin,
        LifecycleLevel::StartService,
        LifecycleLevel::StopPlugin,
        LifecycleLevel::StopService,
        LifecycleLevel::Shutdown,
    ];

    /// The phase that fires this level.
    pub fn phase(self) -> LifecyclePhase {
        match self {
            LifecycleLevel::LoadCatalog
            | LifecycleLevel::InitBus
            | LifecycleLevel::InitPlugin
            | LifecycleLevel::InitService => LifecyclePhase::StartupPreEventRegistration,
            LifecycleLevel::StartPlugin | LifecycleLevel::StartService => {
                LifecyclePhase::StartupPostEventRegistration
            }
            LifecycleLevel::StopPlugin | LifecycleLevel::StopService => {
                LifecyclePhase::ShutdownPreEventUnregistration
            }
            LifecycleLevel::Shutdown => LifecyclePhase::ShutdownPostEventUnregistration,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LifecycleLevel::LoadCatalog => "load-catalog",
            LifecycleLevel::InitBus => "init-bus",
            LifecycleLevel::InitPlugin => "init-plugin",
            LifecycleLevel::InitService => "init-service",
            LifecycleLevel::StartPlugin => "start-plugin",
            LifecycleLevel::StartService => "start-service",
            LifecycleLevel::StopPlugin => "stop-plugin",
            LifecycleLevel::StopService => "stop-service",
            LifecycleLevel::Shutdown => "shutdown",
        }
    }
}

impl fmt::Display for LifecycleLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LifecycleLevel {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        LifecycleLevel::ALL
            .into_iter()
            .find(|level| level.as_str() == s)
            .ok_or_else(|| ConfigurationError::UnknownLevel(s.to_string()))
    }
}

/// One of the four externally fired trigger points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LifecyclePhase {
    StartupPreEventRegistration,
    StartupPostEventRegistration,
    ShutdownPreEventUnregistration,
    ShutdownPostEventUnregistration,
}

impl LifecyclePhase {
    /// Phases in the order a host fires them over the platform's life.
    pub const SEQUENCE: [LifecyclePhase; 4] = [
        LifecyclePhase::StartupPreEventRegistration,
        LifecyclePhase::StartupPostEventRegistration,
        LifecyclePhase::ShutdownPreEventUnregistration,
        LifecyclePhase::ShutdownPostEventUnregistration,
    ];

    /// Levels fired by this phase, in priority order.
    pub fn levels(self) -> impl Iterator<Item = LifecycleLevel> {
        LifecycleLevel::ALL
            .into_iter()
            .filter(move |level| level.phase() == self)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LifecyclePhase::StartupPreEventRegistration => "startup-pre-events",
            LifecyclePhase::StartupPostEventRegistration => "startup-post-events",
            LifecyclePhase::ShutdownPreEventUnregistration => "shutdown-pre-events",
            LifecyclePhase::ShutdownPostEventUnregistration => "shutdown-post-events",
        }
    }
}

impl fmt::Display for LifecyclePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
