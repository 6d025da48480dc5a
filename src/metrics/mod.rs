//! Prometheus metrics for the govnews data pipeline
//!
//! This module provides metrics tracking for:
//! - Interceptor: requests per source and outcome, retries, request duration
//! - Cache store: hits and misses
//! - Sources: available/unavailable outcomes, dashboard load time
//!
//! # Usage
//!
//! Call `init_metrics()` at application startup to register all metrics.
//! If initialization fails, metrics operations become no-ops.

use prometheus::{
    register_counter_vec, register_histogram, register_histogram_vec, CounterVec, Encoder,
    Histogram, HistogramVec, TextEncoder,
};
use std::sync::OnceLock;

// ============================================================================
// Metrics Storage
// ============================================================================

/// Container for interceptor metrics
struct HttpMetrics {
    requests: CounterVec,
    retries: CounterVec,
    duration: HistogramVec,
}

/// Container for cache and source metrics
struct PipelineMetrics {
    cache_lookups: CounterVec,
    source_outcomes: CounterVec,
    dashboard_duration: Histogram,
}

/// Global storage for interceptor metrics
static HTTP_METRICS: OnceLock<HttpMetrics> = OnceLock::new();

/// Global storage for pipeline metrics
static PIPELINE_METRICS: OnceLock<PipelineMetrics> = OnceLock::new();

/// Flag to track if initialization was attempted
static METRICS_INIT_ATTEMPTED: OnceLock<bool> = OnceLock::new();

// ============================================================================
// Initialization
// ============================================================================

/// Initialize all Prometheus metrics
///
/// Safe to call more than once; only the first call registers.
///
/// # Example
///
/// ```ignore
/// if let Err(e) = govnews::metrics::init_metrics() {
///     tracing::warn!(error = %e, "Metrics initialization failed");
/// }
/// ```
pub fn init_metrics() -> Result<(), Box<dyn std::error::Error>> {
    if METRICS_INIT_ATTEMPTED.get().is_some() {
        return Ok(());
    }
    METRICS_INIT_ATTEMPTED.set(true).ok();

    let http = HttpMetrics {
        requests: register_counter_vec!(
            "govnews_http_requests_total",
            "Total outbound requests by source and outcome",
            &["source", "outcome"]
        )?,
        retries: register_counter_vec!(
            "govnews_http_retries_total",
            "Total retried attempts by source",
            &["source"]
        )?,
        duration: register_histogram_vec!(
            "govnews_http_request_duration_seconds",
            "Outbound request duration in seconds",
            &["source"],
            vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]
        )?,
    };

    let pipeline = PipelineMetrics {
        cache_lookups: register_counter_vec!(
            "govnews_cache_lookups_total",
            "Cache store lookups by result (hit, miss)",
            &["result"]
        )?,
        source_outcomes: register_counter_vec!(
            "govnews_source_outcomes_total",
            "Per-source fetch outcomes (available, unavailable)",
            &["source", "outcome"]
        )?,
        dashboard_duration: register_histogram!(
            "govnews_dashboard_load_seconds",
            "Time spent loading a full country dashboard",
            vec![0.1, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0]
        )?,
    };

    HTTP_METRICS
        .set(http)
        .map_err(|_| "HTTP metrics already initialized")?;
    PIPELINE_METRICS
        .set(pipeline)
        .map_err(|_| "Pipeline metrics already initialized")?;

    tracing::info!("Prometheus metrics initialized successfully");
    Ok(())
}

/// Check if metrics have been initialized
pub fn metrics_initialized() -> bool {
    HTTP_METRICS.get().is_some() && PIPELINE_METRICS.get().is_some()
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Encode all metrics to Prometheus text format
pub fn encode_metrics() -> Result<String, Box<dyn std::error::Error>> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8(buffer)?)
}

/// Record a finished outbound request
pub fn record_http_request(source: &str, outcome: &str, duration_secs: f64) {
    let Some(m) = HTTP_METRICS.get() else {
        return;
    };

    m.requests.with_label_values(&[source, outcome]).inc();
    m.duration.with_label_values(&[source]).observe(duration_secs);
}

/// Record a retried attempt
pub fn record_retry(source: &str) {
    if let Some(m) = HTTP_METRICS.get() {
        m.retries.with_label_values(&[source]).inc();
    }
}

/// Record a cache store lookup
pub fn record_cache_lookup(hit: bool) {
    if let Some(m) = PIPELINE_METRICS.get() {
        m.cache_lookups
            .with_label_values(&[if hit { "hit" } else { "miss" }])
            .inc();
    }
}

/// Record whether a source produced data
pub fn record_source_outcome(source: &str, available: bool) {
    if let Some(m) = PIPELINE_METRICS.get() {
        let outcome = if available { "available" } else { "unavailable" };
        m.source_outcomes
            .with_label_values(&[source, outcome])
            .inc();
    }
}

/// Histogram timer guard that records duration on drop
pub struct MetricsTimer {
    timer: Option<prometheus::HistogramTimer>,
}

impl MetricsTimer {
    fn new(timer: prometheus::HistogramTimer) -> Self {
        Self { timer: Some(timer) }
    }

    /// Create a no-op timer when metrics are not initialized
    fn noop() -> Self {
        Self { timer: None }
    }
}

impl Drop for MetricsTimer {
    fn drop(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.stop_and_record();
        }
    }
}

/// Start a dashboard load timer
pub fn start_dashboard_timer() -> MetricsTimer {
    match PIPELINE_METRICS.get() {
        Some(m) => MetricsTimer::new(m.dashboard_duration.start_timer()),
        None => MetricsTimer::noop(),
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn ensure_metrics_initialized() {
        let _ = init_metrics();
    }

    #[test]
    fn test_init_metrics() {
        assert!(init_metrics().is_ok());
        // Idempotent
        assert!(init_metrics().is_ok());
    }

    #[test]
    fn test_metrics_initialized() {
        ensure_metrics_initialized();
        assert!(metrics_initialized());
    }

    #[test]
    fn test_encode_metrics() {
        ensure_metrics_initialized();
        record_http_request("worldbank", "success", 0.2);
        let text = encode_metrics().unwrap();
        assert!(text.contains("govnews_http_requests_total"));
    }

    #[test]
    fn test_pipeline_metrics() {
        ensure_metrics_initialized();
        record_retry("gdelt");
        record_cache_lookup(true);
        record_cache_lookup(false);
        record_source_outcome("ucdp", false);
        let _timer = start_dashboard_timer();
    }
}
