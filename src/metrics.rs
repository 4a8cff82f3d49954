/// Metrics and telemetry for the wallet name service
///
/// Provides Prometheus-compatible metrics for monitoring:
/// - HTTP request counts and latencies
/// - Name cache hit/miss rates
/// - Background resolutions and per-strategy lookups
/// - Waiter releases and published resolution events

use crate::error::{ResolverError, ResolverResult};
use lazy_static::lazy_static;
use prometheus::{
    register_histogram_vec, register_int_counter, register_int_counter_vec, register_int_gauge,
    Encoder, HistogramVec, IntCounter, IntCounterVec, IntGauge, TextEncoder,
};

lazy_static! {
    // ========== HTTP Metrics ==========

    /// Total HTTP requests by method, path, and status
    pub static ref HTTP_REQUESTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "http_requests_total",
        "Total number of HTTP requests",
        &["method", "path", "status"]
    )
    .unwrap();

    /// HTTP request duration in seconds
    pub static ref HTTP_REQUEST_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "http_request_duration_seconds",
        "HTTP request latencies in seconds",
        &["method", "path"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]
    )
    .unwrap();

    // ========== Name Cache Metrics ==========

    pub static ref NAME_CACHE_HITS_TOTAL: IntCounter = register_int_counter!(
        "name_cache_hits_total",
        "Lookups answered from the name cache"
    )
    .unwrap();

    pub static ref NAME_CACHE_MISSES_TOTAL: IntCounter = register_int_counter!(
        "name_cache_misses_total",
        "Lookups that found no completed resolution"
    )
    .unwrap();

    /// Background resolutions by outcome ("named", "unnamed", "panicked")
    pub static ref NAME_BACKGROUND_RESOLUTIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "name_background_resolutions_total",
        "Background resolutions completed",
        &["outcome"]
    )
    .unwrap();

    /// Background resolutions currently in flight
    pub static ref NAME_RESOLUTIONS_IN_FLIGHT: IntGauge = register_int_gauge!(
        "name_resolutions_in_flight",
        "Background resolutions currently running"
    )
    .unwrap();

    /// Strategy lookups by strategy and outcome ("found", "not_found", "error")
    pub static ref NAME_STRATEGY_LOOKUPS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "name_strategy_lookups_total",
        "Lookups issued to each resolution strategy",
        &["strategy", "outcome"]
    )
    .unwrap();

    pub static ref NAME_STRATEGY_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "name_strategy_duration_seconds",
        "Resolution strategy latencies in seconds",
        &["strategy"],
        vec![0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]
    )
    .unwrap();

    pub static ref NAME_WAITERS_RELEASED_TOTAL: IntCounter = register_int_counter!(
        "name_waiters_released_total",
        "Coalesced callers released by a completed resolution"
    )
    .unwrap();

    pub static ref NAME_EVENTS_PUBLISHED_TOTAL: IntCounter = register_int_counter!(
        "name_events_published_total",
        "Resolution events published to observers"
    )
    .unwrap();
}

/// Render metrics in Prometheus text format
pub fn render_metrics() -> ResolverResult<String> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| ResolverError::Internal(format!("Failed to encode metrics: {}", e)))?;
    String::from_utf8(buffer)
        .map_err(|e| ResolverError::Internal(format!("Metrics are not UTF-8: {}", e)))
}

/// Record an HTTP request
pub fn record_http_request(method: &str, path: &str, status: u16, duration: f64) {
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[method, path, &status.to_string()])
        .inc();
    HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&[method, path])
        .observe(duration);
}

/// Record a name cache access
pub fn record_cache_access(hit: bool) {
    if hit {
        NAME_CACHE_HITS_TOTAL.inc();
    } else {
        NAME_CACHE_MISSES_TOTAL.inc();
    }
}

pub fn record_background_started() {
    NAME_RESOLUTIONS_IN_FLIGHT.inc();
}

pub fn record_background_finished(outcome: &str, waiters: usize) {
    NAME_RESOLUTIONS_IN_FLIGHT.dec();
    NAME_BACKGROUND_RESOLUTIONS_TOTAL
        .with_label_values(&[outcome])
        .inc();
    NAME_WAITERS_RELEASED_TOTAL.inc_by(waiters as u64);
}

/// Record a single strategy lookup
pub fn record_strategy_lookup(strategy: &str, outcome: &str, duration: f64) {
    NAME_STRATEGY_LOOKUPS_TOTAL
        .with_label_values(&[strategy, outcome])
        .inc();
    NAME_STRATEGY_DURATION_SECONDS
        .with_label_values(&[strategy])
        .observe(duration);
}

pub fn record_event_published() {
    NAME_EVENTS_PUBLISHED_TOTAL.inc();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_http_request() {
        record_http_request("GET", "/v1/names/:address", 200, 0.05);
        let metrics = render_metrics().unwrap();
        assert!(metrics.contains("http_requests_total"));
        assert!(metrics.contains("http_request_duration_seconds"));
    }

    #[test]
    fn test_record_cache_access() {
        record_cache_access(true);
        record_cache_access(false);
        let metrics = render_metrics().unwrap();
        assert!(metrics.contains("name_cache_hits_total"));
        assert!(metrics.contains("name_cache_misses_total"));
    }

    #[test]
    fn test_record_strategy_lookup() {
        record_strategy_lookup("onchain", "found", 0.02);
        let metrics = render_metrics().unwrap();
        assert!(metrics.contains("name_strategy_lookups_total"));
        assert!(metrics.contains("name_strategy_duration_seconds"));
    }

    #[test]
    fn test_record_background_resolution() {
        record_background_started();
        record_background_finished("unnamed", 3);
        let metrics = render_metrics().unwrap();
        assert!(metrics.contains("name_background_resolutions_total"));
        assert!(metrics.contains("name_waiters_released_total"));
    }
}
