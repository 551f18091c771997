//! Metrics collection and exposition.
//!
//! # Metrics
//! - `runner_phase` (gauge): current phase as its numeric value
//! - `runner_alive` / `runner_ready` (gauge): 1=true, 0=false
//! - `runner_resource_init_seconds` (histogram): per-resource init latency
//! - `runner_job_exits_total` (counter): job exits by outcome
//! - `runner_shutdown_seconds` (histogram): teardown duration by outcome
//!
//! Without an installed recorder every call is a no-op.

use std::net::SocketAddr;
use std::time::Duration;

use metrics_exporter_prometheus::PrometheusBuilder;

use crate::lifecycle::state::Phase;

/// Install the Prometheus exporter listening on `addr`.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), metrics_exporter_prometheus::BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

pub fn record_phase(phase: Phase) {
    ::metrics::gauge!("runner_phase").set(phase as u8 as f64);
}

pub fn record_alive(alive: bool) {
    ::metrics::gauge!("runner_alive").set(if alive { 1.0 } else { 0.0 });
}

pub fn record_ready(ready: bool) {
    ::metrics::gauge!("runner_ready").set(if ready { 1.0 } else { 0.0 });
}

pub fn record_resource_init(resource: &str, elapsed: Duration) {
    ::metrics::histogram!("runner_resource_init_seconds", "resource" => resource.to_string())
        .record(elapsed.as_secs_f64());
}

pub fn record_job_exit(outcome: &'static str) {
    ::metrics::counter!("runner_job_exits_total", "outcome" => outcome).increment(1);
}

pub fn record_shutdown(elapsed: Duration, ok: bool) {
    let outcome = if ok { "ok" } else { "error" };
    ::metrics::histogram!("runner_shutdown_seconds", "outcome" => outcome)
        .record(elapsed.as_secs_f64());
}
