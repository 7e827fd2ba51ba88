//! Prometheus metrics for the bridge service
//!
//! Exposed on the `/metrics` endpoint for Prometheus scraping.

use lazy_static::lazy_static;
use prometheus::{
    register_counter_vec, register_gauge, register_histogram_vec, register_int_counter,
    register_int_counter_vec, CounterVec, Encoder, Gauge, HistogramVec, IntCounter,
    IntCounterVec, TextEncoder,
};

lazy_static! {
    pub static ref BRIDGE_REQUESTS: IntCounterVec = register_int_counter_vec!(
        "bridge_requests_total",
        "Total number of bridge requests by direction and outcome",
        &["direction", "outcome"]
    ).unwrap();

    pub static ref LEG_LATENCY: HistogramVec = register_histogram_vec!(
        "bridge_leg_latency_seconds",
        "Time from submission to confirmation of a single leg",
        &["ledger", "operation"],
        vec![0.5, 1.0, 2.0, 5.0, 10.0, 20.0, 30.0, 60.0, 120.0]
    ).unwrap();

    pub static ref ERRORS: IntCounterVec = register_int_counter_vec!(
        "bridge_errors_total",
        "Total number of failed bridge operations by error kind",
        &["kind"]
    ).unwrap();

    pub static ref PARTIAL_FAILURES: IntCounter = register_int_counter!(
        "bridge_partial_failures_total",
        "Bridge operations whose source leg confirmed but destination leg failed"
    ).unwrap();

    pub static ref VERSION_CONFLICT_RETRIES: IntCounter = register_int_counter!(
        "bridge_sui_version_conflict_retries_total",
        "Sui transactions rebuilt after an authority object version conflict"
    ).unwrap();

    pub static ref VOLUME_BRIDGED: CounterVec = register_counter_vec!(
        "bridge_volume_bridged_total",
        "Total volume bridged (in Ethereum base units)",
        &["direction"]
    ).unwrap();

    pub static ref UP: Gauge = register_gauge!(
        "bridge_up",
        "Whether the bridge service is up and running"
    ).unwrap();
}

/// Record the outcome of one bridge request
pub fn record_request(direction: &str, success: bool) {
    let outcome = if success { "success" } else { "failure" };
    BRIDGE_REQUESTS
        .with_label_values(&[direction, outcome])
        .inc();
}

/// Record how long a leg took to confirm
pub fn record_leg_latency(ledger: &str, operation: &str, seconds: f64) {
    LEG_LATENCY
        .with_label_values(&[ledger, operation])
        .observe(seconds);
}

/// Record a failed operation
pub fn record_error(kind: &str) {
    ERRORS.with_label_values(&[kind]).inc();
}

pub fn record_partial_failure() {
    PARTIAL_FAILURES.inc();
}

pub fn record_version_conflict_retry() {
    VERSION_CONFLICT_RETRIES.inc();
}

/// Record volume bridged
pub fn record_volume(direction: &str, amount: f64) {
    VOLUME_BRIDGED.with_label_values(&[direction]).inc_by(amount);
}

/// Encode all registered metrics in the Prometheus text format
pub fn encode() -> (String, Vec<u8>) {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::warn!(error = %e, "Failed to encode metrics");
    }
    (encoder.format_type().to_string(), buffer)
}
