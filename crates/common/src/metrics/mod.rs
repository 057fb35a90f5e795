//! Metrics and observability utilities
//!
//! Prometheus metrics with latency-oriented histograms
//! and a single naming prefix.

use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};
use std::time::Instant;

/// Metrics prefix for all Commentarium metrics
pub const METRICS_PREFIX: &str = "commentarium";

/// Histogram buckets for request latency (in seconds)
pub const LATENCY_BUCKETS: &[f64] = &[
    0.001,  // 1ms
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
];

/// Buckets for upstream model calls, which are much slower
pub const UPSTREAM_BUCKETS: &[f64] = &[
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

    describe_counter!(
        format!("{}_generation_requests_total", METRICS_PREFIX),
        Unit::Count,
        "LLM completion and image requests by kind and status"
    );

    describe_histogram!(
        format!("{}_generation_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "LLM call latency in seconds"
    );

    describe_counter!(
        format!("{}_embedding_requests_total", METRICS_PREFIX),
        Unit::Count,
        "Total embedding API requests"
    );

    describe_histogram!(
        format!("{}_embedding_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Embedding generation latency in seconds"
    );

    describe_counter!(
        format!("{}_proxy_fetches_total", METRICS_PREFIX),
        Unit::Count,
        "Proxied resource fetches by upstream status"
    );

    describe_counter!(
        format!("{}_newsletter_subscriptions_total", METRICS_PREFIX),
        Unit::Count,
        "Newsletter subscription attempts by outcome"
    );

    tracing::info!("Metrics registered");
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

fn outcome(success: bool) -> &'static str {
    if success { "success" } else { "error" }
}

/// Record one LLM call; `kind` is "text" or "image"
pub fn record_generation(duration_secs: f64, kind: &str, success: bool) {
    counter!(
        format!("{}_generation_requests_total", METRICS_PREFIX),
        "kind" => kind.to_string(),
        "status" => outcome(success)
    )
    .increment(1);

    histogram!(
        format!("{}_generation_duration_seconds", METRICS_PREFIX),
        "kind" => kind.to_string()
    )
    .record(duration_secs);
}

/// Helper to record embedding metrics
pub fn record_embedding(duration_secs: f64, model: &str, success: bool) {
    counter!(
        format!("{}_embedding_requests_total", METRICS_PREFIX),
        "model" => model.to_string(),
        "status" => outcome(success)
    )
    .increment(1);

    if success {
        histogram!(
            format!("{}_embedding_duration_seconds", METRICS_PREFIX),
            "model" => model.to_string()
        )
        .record(duration_secs);
    }
}

/// Record a proxy fetch; transport failures are reported with status 0
pub fn record_proxy(status: u16) {
    counter!(
        format!("{}_proxy_fetches_total", METRICS_PREFIX),
        "status" => status.to_string()
    )
    .increment(1);
}

/// Record a newsletter attempt: "created", "duplicate" or "error"
pub fn record_subscription(result: &str) {
    counter!(
        format!("{}_newsletter_subscriptions_total", METRICS_PREFIX),
        "result" => result.to_string()
    )
    .increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buckets_are_sorted() {
        for buckets in [LATENCY_BUCKETS, UPSTREAM_BUCKETS] {
            assert!(buckets.windows(2).all(|w| w[0] < w[1]));
        }
    }

    #[test]
    fn test_recorders_without_exporter() {
        // no recorder installed: every call is a no-op and must not panic
        let metrics = RequestMetrics::start("GET", "/api/posts");
        metrics.finish(200);
        record_generation(0.4, "text", true);
        record_embedding(0.1, "mock-embedding", false);
        record_proxy(404);
        record_subscription("duplicate");
    }
}
