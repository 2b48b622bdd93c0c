//! Metrics collection and exposition.
//!
//! # Metrics
//! - `admission_decisions_total` (counter): decisions by profile, outcome
//! - `admission_rate_limited_total` (counter): 429s by profile
//! - `admission_store_entries` (gauge): entries held by the rate-limit store
//! - `admission_sweep_removed_total` (counter): entries purged by the sweeper
//!
//! Recording is a no-op until `init_metrics` installs the exporter.

use metrics::{counter, gauge};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;

/// Install the Prometheus exporter with its own HTTP listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_decision(profile: &str, outcome: &'static str) {
    counter!(
        "admission_decisions_total",
        "profile" => profile.to_string(),
        "outcome" => outcome
    )
    .increment(1);
}

pub fn record_rate_limited(profile: &str) {
    counter!("admission_rate_limited_total", "profile" => profile.to_string()).increment(1);
}

pub fn record_sweep(removed: usize, remaining: Option<usize>) {
    counter!("admission_sweep_removed_total").increment(removed as u64);
    if let Some(remaining) = remaining {
        gauge!("admission_store_entries").set(remaining as f64);
    }
}
