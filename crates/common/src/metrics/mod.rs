//! Metrics and observability utilities
//!
//! Describes the Prometheus metrics TubeScribe emits and provides small
//! helpers so call sites record them with consistent names and labels.

use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};
use std::time::Instant;

/// Metrics prefix for all TubeScribe metrics
pub const METRICS_PREFIX: &str = "tubescribe";

/// Histogram buckets for HTTP request latency (in seconds).
/// Article generation waits on two upstream APIs, hence the long tail.
pub const LATENCY_BUCKETS: &[f64] = &[
    0.005,  // 5ms
    0.010,  // 10ms
    0.025,  // 25ms
    0.050,  // 50ms
    0.100,  // 100ms
    0.250,  // 250ms
    0.500,  // 500ms
    1.000,  // 1s
    2.500,  // 2.5s
    5.000,  // 5s
    10.00,  // 10s
    30.00,  // 30s
    60.00,  // 60s
];

/// Register all metric descriptions
pub fn register_metrics() {
    // Request metrics
    describe_counter!(
        format!("{}_requests_total", METRICS_PREFIX),
        Unit::Count,
        "Total number of HTTP requests"
    );

    describe_histogram!(
        format!("{}_request_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "HTTP request latency in seconds"
    );

    // Store metrics
    describe_counter!(
        format!("{}_store_operations_total", METRICS_PREFIX),
        Unit::Count,
        "Summary store operations by backend, operation and outcome"
    );

    describe_histogram!(
        format!("{}_store_operation_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Summary store operation latency in seconds"
    );

    describe_counter!(
        format!("{}_store_rows_skipped_total", METRICS_PREFIX),
        Unit::Count,
        "Stored rows skipped on read because a required field was missing or invalid"
    );

    // Upstream metrics
    describe_counter!(
        format!("{}_upstream_requests_total", METRICS_PREFIX),
        Unit::Count,
        "Requests to YouTube and Gemini by outcome"
    );

    describe_histogram!(
        format!("{}_upstream_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Upstream API latency in seconds"
    );

    tracing::info!("Metrics registered");
}

/// Outcome label for store and upstream operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    /// The operation ran but the backend reported a failure
    Error,
    /// The liveness probe failed, so the operation never ran
    Unavailable,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Success => "success",
            Outcome::Error => "error",
            Outcome::Unavailable => "unavailable",
        }
    }
}

/// Times a single store operation
pub struct StoreTimer {
    start: Instant,
    backend: &'static str,
    operation: &'static str,
}

impl StoreTimer {
    pub fn start(backend: &'static str, operation: &'static str) -> Self {
        Self {
            start: Instant::now(),
            backend,
            operation,
        }
    }

    pub fn finish(self, outcome: Outcome) {
        let duration = self.start.elapsed().as_secs_f64();

        counter!(
            format!("{}_store_operations_total", METRICS_PREFIX),
            "backend" => self.backend,
            "operation" => self.operation,
            "outcome" => outcome.as_str()
        )
        .increment(1);

        histogram!(
            format!("{}_store_operation_duration_seconds", METRICS_PREFIX),
            "backend" => self.backend,
            "operation" => self.operation
        )
        .record(duration);
    }
}

/// Count rows dropped from a read result
pub fn record_skipped_rows(backend: &'static str, count: usize) {
    if count == 0 {
        return;
    }

    counter!(
        format!("{}_store_rows_skipped_total", METRICS_PREFIX),
        "backend" => backend
    )
    .increment(count as u64);
}

/// Record one upstream (YouTube / Gemini) call
pub fn record_upstream(service: &'static str, duration_secs: f64, success: bool) {
    let outcome = if success { Outcome::Success } else { Outcome::Error };

    counter!(
        format!("{}_upstream_requests_total", METRICS_PREFIX),
        "service" => service,
        "outcome" => outcome.as_str()
    )
    .increment(1);

    histogram!(
        format!("{}_upstream_duration_seconds", METRICS_PREFIX),
        "service" => service
    )
    .record(duration_secs);
}

/// Helper to record request metrics
pub struct RequestMetrics {
    start: Instant,
    endpoint: String,
    method: String,
}

impl RequestMetrics {
    /// Start tracking a request
    pub fn start(method: &str, endpoint: &str) -> Self {
        Self {
            start: Instant::now(),
            endpoint: endpoint.to_string(),
            method: method.to_string(),
        }
    }

    /// Record request completion
    pub fn finish(self, status: u16) {
        let duration = self.start.elapsed().as_secs_f64();

        counter!(
            format!("{}_requests_total", METRICS_PREFIX),
            "method" => self.method.clone(),
            "endpoint" => self.endpoint.clone(),
            "status" => status.to_string()
        )
        .increment(1);

        histogram!(
            format!("{}_request_duration_seconds", METRICS_PREFIX),
            "method" => self.method,
            "endpoint" => self.endpoint
        )
        .record(duration);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latency_buckets_sorted() {
        let mut prev = 0.0;
        for &bucket in LATENCY_BUCKETS {
            assert!(bucket > prev);
            prev = bucket;
        }
    }

    #[test]
    fn test_recorders_without_exporter() {
        // No recorder installed: every call must be a no-op
        StoreTimer::start("memory", "save_summary").finish(Outcome::Unavailable);
        record_skipped_rows("supabase", 2);
        record_upstream("gemini", 0.5, false);
        RequestMetrics::start("GET", "/v1/summaries").finish(200);
    }

    #[test]
    fn test_outcome_labels() {
        assert_eq!(Outcome::Success.as_str(), "success");
        assert_eq!(Outcome::Unavailable.as_str(), "unavailable");
    }
}
