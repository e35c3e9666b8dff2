//! Metrics collection and exposition.
//!
//! # Metrics
//! - `request_timeouts_total` (counter): expired requests by scope and emitted status
//! - `request_duration_seconds` (histogram): time spent under a timeout scope, by outcome
//!
//! # Design Decisions
//! - Recording is a no-op until a recorder is installed, so the middleware works
//!   without an exporter
//! - The Prometheus exporter is opt-in via configuration

use std::net::SocketAddr;
use std::time::Duration;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

use crate::resilience::timeouts::Scope;

pub const REQUEST_TIMEOUTS_TOTAL: &str = "request_timeouts_total";
pub const REQUEST_DURATION_SECONDS: &str = "request_duration_seconds";

/// Install the Prometheus recorder and its scrape endpoint.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

/// Record a request that finished before its deadline.
pub fn record_completed(scope: Scope, elapsed: Duration) {
    metrics::histogram!(
        REQUEST_DURATION_SECONDS,
        "scope" => scope.as_str(),
        "outcome" => "completed"
    )
    .record(elapsed.as_secs_f64());
}

/// Record a request whose deadline fired.
pub fn record_timeout(scope: Scope, status: u16, elapsed: Duration) {
    metrics::counter!(
        REQUEST_TIMEOUTS_TOTAL,
        "scope" => scope.as_str(),
        "status" => status.to_string()
    )
    .increment(1);
    metrics::histogram!(
        REQUEST_DURATION_SECONDS,
        "scope" => scope.as_str(),
        "outcome" => "expired"
    )
    .record(elapsed.as_secs_f64());
}
