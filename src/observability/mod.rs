//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! lifecycle + routing produce:
//!     → logging.rs (structured tracing events, spans per phase/dispatch)
//!     → metrics.rs (counters, gauges, histograms)
//!
//! Consumers:
//!     → stdout (fmt layer)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Request ID flows into every dispatch span
//! - Metrics are cheap (atomic increments behind the facade)

pub mod logging;
pub mod metrics;
