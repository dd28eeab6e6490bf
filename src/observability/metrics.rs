//! Metrics collection and exposition.
//!
//! # Metrics
//! - `governance_admissions_total` (counter): admission decisions by resource, outcome
//! - `governance_limiter_tokens` (gauge): bucket balance by resource
//! - `governance_context_aborts_total` (counter): contexts ending timed_out or cancelled

use std::net::SocketAddr;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder and its HTTP listener.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint started");
    Ok(())
}

/// Record one admission decision.
pub fn record_admission(resource: &str, admitted: bool) {
    let outcome = if admitted { "admitted" } else { "rejected" };
    metrics::counter!(
        "governance_admissions_total",
        "resource" => resource.to_string(),
        "outcome" => outcome
    )
    .increment(1);
}

/// Record the balance of a bucket after a change.
pub fn record_token_balance(resource: &str, tokens: f64) {
    metrics::gauge!("governance_limiter_tokens", "resource" => resource.to_string()).set(tokens);
}

/// Record a context ending in `timed_out` or `cancelled`.
pub fn record_context_outcome(outcome: &'static str) {
    metrics::counter!("governance_context_aborts_total", "outcome" => outcome).increment(1);
}
