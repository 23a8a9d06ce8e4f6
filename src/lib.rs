//! Billing platform infrastructure library.
//!
//! Two pieces of host plumbing shared by every billing service:
//! - `lifecycle`: fires ordered startup and shutdown phases across the
//!   registered services
//! - `routing`: serves plugin-contributed request handlers behind path
//!   prefixes, initialized lazily and run in their own isolation context

pub mod config;
pub mod lifecycle;
pub mod observability;
pub mod platform;
pub mod plugins;
pub mod routing;

pub use config::PlatformConfig;
pub use lifecycle::{LifecycleCoordinator, LifecycleLevel, LifecyclePhase, PlatformService};
pub use platform::{Platform, PlatformBuilder, PlatformError};
pub use plugins::{PluginBundle, PluginHost};
pub use routing::{Dispatcher, PluginHandler, RouteTable};
