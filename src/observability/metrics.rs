//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define gateway metrics (requests, latency, rejections, lookups)
//! - Expose Prometheus-compatible metrics endpoint
//!
//! # Metrics
//! - `gateway_requests_total` (counter): requests by route, status
//! - `gateway_request_duration_seconds` (histogram): end-to-end latency
//! - `gateway_rate_limited_total` (counter): requests rejected with 429
//! - `gateway_dispatch_total` (counter): lookups by outcome
//! - `gateway_dispatch_duration_seconds` (histogram): lookup tool runtime
//! - `gateway_rate_limit_buckets` (gauge): tracked clients after a sweep
//! - `gateway_rate_limit_evictions_total` (counter): idle buckets removed
//!
//! # Design Decisions
//! - Recording is a no-op until the exporter is installed
//! - Labels stay low-cardinality: no client addresses or names

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Start the Prometheus exporter on `addr`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

pub fn record_request(route: &'static str, status: u16, start: Instant) {
    let status = status.to_string();
    counter!("gateway_requests_total", "route" => route, "status" => status.clone()).increment(1);
    histogram!("gateway_request_duration_seconds", "route" => route, "status" => status)
        .record(start.elapsed().as_secs_f64());
}

pub fn record_rate_limited() {
    counter!("gateway_rate_limited_total").increment(1);
}

pub fn record_dispatch(outcome: &'static str, start: Instant) {
    counter!("gateway_dispatch_total", "outcome" => outcome).increment(1);
    histogram!("gateway_dispatch_duration_seconds", "outcome" => outcome)
        .record(start.elapsed().as_secs_f64());
}

pub fn record_bucket_count(count: usize) {
    gauge!("gateway_rate_limit_buckets").set(count as f64);
}

pub fn record_buckets_evicted(count: usize) {
    counter!("gateway_rate_limit_evictions_total").increment(count as u64);
}
