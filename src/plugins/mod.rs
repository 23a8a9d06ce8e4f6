//! Plugin hosting.
//!
//! # Data Flow
//! ```text
//! PluginBundle (name, isolation context, prefix → handler pairs)
//!     → host.rs activate → RouteTable::register per prefix
//!     → routes served lazily by the dispatcher
//!
//! deactivate(name) / stop-plugin level
//!     → RouteTable::unregister_route for routes the plugin still owns
//! ```
//!
//! # Design Decisions
//! - Activation is all-or-nothing
//! - The host never holds a route lock; retirement is the table's job

pub mod host;

pub use host::{ActivationError, PluginBundle, PluginHost};
