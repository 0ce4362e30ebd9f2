//! Metrics collection and exposition.
//!
//! # Metrics
//! - `lifecycle_requests_total` (counter): requests by method, status
//! - `lifecycle_request_duration_seconds` (histogram): latency by method
//! - `lifecycle_in_flight_requests` (gauge): admitted, unfinished requests
//! - `lifecycle_ready` (gauge): 1 once warm-up completed
//! - `lifecycle_shutdown_total` (counter): shutdown runs by outcome
//! - `lifecycle_cleanup_steps_total` (counter): cleanup steps by step, result
//!
//! Without an installed recorder every call here is a no-op.

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder and its scrape endpoint.
///
/// Must be called from inside a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

pub fn record_request(method: &str, status: u16, start: Instant) {
    counter!(
        "lifecycle_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    histogram!("lifecycle_request_duration_seconds", "method" => method.to_string())
        .record(start.elapsed().as_secs_f64());
}

/// Moves the gauge by one alongside each successful counter update, so
/// concurrent updates cannot leave a stale absolute value behind.
pub fn in_flight_started() {
    gauge!("lifecycle_in_flight_requests").increment(1.0);
}

pub fn in_flight_finished() {
    gauge!("lifecycle_in_flight_requests").decrement(1.0);
}

pub fn set_ready(ready: bool) {
    gauge!("lifecycle_ready").set(if ready { 1.0 } else { 0.0 });
}

pub fn record_shutdown(outcome: &'static str) {
    counter!("lifecycle_shutdown_total", "outcome" => outcome).increment(1);
}

pub fn record_cleanup_step(step: &str, result: &'static str) {
    counter!(
        "lifecycle_cleanup_steps_total",
        "step" => step.to_string(),
        "result" => result
    )
    .increment(1);
}
