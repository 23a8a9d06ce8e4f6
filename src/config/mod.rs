//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! platform config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → PlatformConfig (validated, immutable)
//!
//! platform properties:
//!     env vars → EnvProperties ┐
//!     properties file → FileProperties ├→ LayeredSource → services
//!
//! On properties file change (or SIGHUP):
//!     watcher.rs detects change
//!     → FileProperties re-reads and flattens the file
//!     → atomic swap of the snapshot
//!     → readers observe new values on their next lookup
//! ```
//!
//! # Design Decisions
//! - Host config is immutable once loaded; changes require a restart
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks
//! - A broken properties file never replaces a working snapshot

pub mod loader;
pub mod properties;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, parse_config, ConfigError};
pub use properties::{
    ConfigSource, EnvProperties, FileProperties, LayeredSource, PropertiesError, StaticProperties,
};
pub use schema::{LifecycleConfig, ObservabilityConfig, PlatformConfig, PropertiesConfig, RoutingConfig};
pub use validation::ValidationError;
pub use watcher::PropertiesWatcher;
