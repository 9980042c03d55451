//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define gateway metrics (requests, latency, rejections, tracked clients)
//! - Expose a Prometheus-compatible metrics endpoint
//!
//! # Metrics
//! - `gateway_requests_total` (counter): responses sent, by method and status
//! - `gateway_request_duration_seconds` (histogram): latency distribution
//! - `gateway_rejections_total` (counter): admission rejections, by reason
//! - `gateway_tracked_clients` (gauge): identifiers currently in the limiter
//! - `gateway_evictions_total` (counter): records removed by the sweeper
//!
//! # Design Decisions
//! - Recording goes through the `metrics` facade; with no exporter
//!   installed every call is a no-op, so tests need no setup
//! - The exporter failing to bind degrades to no metrics, never to a
//!   refused start

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

pub const REQUESTS_TOTAL: &str = "gateway_requests_total";
pub const REQUEST_DURATION_SECONDS: &str = "gateway_request_duration_seconds";
pub const REJECTIONS_TOTAL: &str = "gateway_rejections_total";
pub const TRACKED_CLIENTS: &str = "gateway_tracked_clients";
pub const EVICTIONS_TOTAL: &str = "gateway_evictions_total";

/// Install the Prometheus exporter and register metric descriptions.
pub fn init_metrics(address: SocketAddr) {
    if let Err(e) = PrometheusBuilder::new()
        .with_http_listener(address)
        .install()
    {
        tracing::error!(error = %e, "Failed to install metrics exporter, continuing without metrics");
        return;
    }

    describe_counter!(REQUESTS_TOTAL, "Responses sent, by method and status");
    describe_histogram!(
        REQUEST_DURATION_SECONDS,
        "Time from admission check to response, in seconds"
    );
    describe_counter!(REJECTIONS_TOTAL, "Admission rejections, by reason");
    describe_gauge!(TRACKED_CLIENTS, "Identifiers currently tracked by the limiter");
    describe_counter!(EVICTIONS_TOTAL, "Stale records removed by the sweeper");

    tracing::info!(address = %address, "Metrics exporter listening");
}

/// Record a completed request.
pub fn record_request(method: &str, status: u16, started: Instant) {
    counter!(REQUESTS_TOTAL, "method" => method.to_string(), "status" => status.to_string())
        .increment(1);
    histogram!(REQUEST_DURATION_SECONDS, "method" => method.to_string())
        .record(started.elapsed().as_secs_f64());
}

/// Record an admission rejection.
pub fn record_rejection(reason: &'static str) {
    counter!(REJECTIONS_TOTAL, "reason" => reason).increment(1);
}

/// Record the outcome of one eviction sweep.
pub fn record_sweep(removed: usize, tracked: usize) {
    if removed > 0 {
        counter!(EVICTIONS_TOTAL).increment(removed as u64);
    }
    gauge!(TRACKED_CLIENTS).set(tracked as f64);
}
