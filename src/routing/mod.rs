//! Plugin routing subsystem.
//!
//! # Data Flow
//! ```text
//! Plugin activation/deactivation (any thread, any time):
//!     register(prefix, handler, isolation) → matcher.rs (normalise)
//!     → table.rs (DashMap insert, conflict policy)
//!     unregister(prefix) → table.rs (remove) → route.rs (retire)
//!
//! Incoming request (worker threads):
//!     dispatcher.rs → table.rs (longest segment-prefix lookup)
//!     → route.rs (lazy init under the route lock)
//!     → isolation.rs (scoped enter/exit) → PluginHandler::handle
//!     → Return: PluginResponse or DispatchError
//! ```
//!
//! # Design Decisions
//! - No global lock: the table is sharded, each route has its own lock
//! - Deterministic: the longest matching prefix always wins
//! - Explicit RouteNotFound rather than a silent default

pub mod dispatcher;
pub mod error;
pub mod isolation;
pub mod matcher;
pub mod route;
pub mod table;

pub use dispatcher::Dispatcher;
pub use error::{DispatchError, PluginError, RouteError};
pub use isolation::{DispatchContext, ExecutionScope, IsolationContext, IsolationProvider};
pub use route::{PluginHandler, PluginRequest, PluginResponse, PluginRoute};
pub use table::{ConflictPolicy, RouteStats, RouteTable};
