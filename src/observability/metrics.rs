//! Metrics collection and exposition.
//!
//! # Metrics
//! - `platform_lifecycle_handlers_total` (counter): handler invocations by level
//! - `platform_lifecycle_handler_failures_total` (counter): failed handlers by level
//! - `platform_route_initializations_total` (counter): lazy inits by prefix, result
//! - `platform_routes_registered` (gauge): current route count
//! - `platform_dispatch_total` (counter): dispatches by outcome
//! - `platform_dispatch_duration_seconds` (histogram): dispatch latency by outcome
//!
//! # Design Decisions
//! - Recording goes through the `metrics` facade; without an installed
//!   recorder every call is a no-op
//! - The Prometheus exporter is installed by the host binary only

use std::net::SocketAddr;
use std::time::Duration;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter listening on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_lifecycle_handler(level: &'static str) {
    ::metrics::counter!("platform_lifecycle_handlers_total", "level" => level).increment(1);
}

pub fn record_lifecycle_failure(level: &'static str) {
    ::metrics::counter!("platform_lifecycle_handler_failures_total", "level" => level).increment(1);
}

pub fn record_route_initialization(prefix: &str, success: bool) {
    let result = if success { "success" } else { "failure" };
    ::metrics::counter!(
        "platform_route_initializations_total",
        "prefix" => prefix.to_string(),
        "result" => result
    )
    .increment(1);
}

pub fn record_route_count(count: usize) {
    ::metrics::gauge!("platform_routes_registered").set(count as f64);
}

pub fn record_dispatch(outcome: &'static str, elapsed: Duration) {
    ::metrics::counter!("platform_dispatch_total", "outcome" => outcome).increment(1);
    ::metrics::histogram!("platform_dispatch_duration_seconds", "outcome" => outcome)
        .record(elapsed.as_secs_f64());
}
