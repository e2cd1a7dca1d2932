/// Metrics and telemetry for Kindred
///
/// Provides Prometheus-compatible metrics for monitoring:
/// - HTTP request counts and latencies
/// - Background job execution
/// - Reminder processing outcomes
/// - Dedup activity and digests

use lazy_static::lazy_static;
use prometheus::{
    register_histogram_vec, register_int_counter, register_int_counter_vec, Encoder, HistogramVec,
    IntCounter, IntCounterVec, TextEncoder,
};

lazy_static! {
    // ========== HTTP Metrics ==========

    /// Total HTTP requests by method, path, and status
    pub static ref HTTP_REQUESTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "kindred_http_requests_total",
        "Total number of HTTP requests",
        &["method", "path", "status"]
    )
    .unwrap();

    /// HTTP request duration in seconds
    pub static ref HTTP_REQUEST_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "kindred_http_request_duration_seconds",
        "HTTP request latencies in seconds",
        &["method", "path"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0]
    )
    .unwrap();

    // ========== Background Job Metrics ==========

    pub static ref BACKGROUND_JOBS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "kindred_background_jobs_total",
        "Total number of background job executions",
        &["job_type", "status"]
    )
    .unwrap();

    pub static ref BACKGROUND_JOB_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "kindred_background_job_duration_seconds",
        "Background job execution time in seconds",
        &["job_type"],
        vec![0.01, 0.1, 0.5, 1.0, 5.0, 10.0, 30.0, 60.0]
    )
    .unwrap();

    // ========== Reminder Metrics ==========

    /// Processed reminders by outcome (delivered, failed, skipped)
    pub static ref REMINDERS_PROCESSED_TOTAL: IntCounterVec = register_int_counter_vec!(
        "kindred_reminders_processed_total",
        "Total number of due reminders processed",
        &["outcome"]
    )
    .unwrap();

    // ========== Dedup Metrics ==========

    pub static ref MERGES_TOTAL: IntCounter = register_int_counter!(
        "kindred_merges_total",
        "Total number of committed person merges"
    )
    .unwrap();

    pub static ref DUPLICATE_SUGGESTIONS_TOTAL: IntCounter = register_int_counter!(
        "kindred_duplicate_suggestions_total",
        "Total number of duplicate suggestions emitted"
    )
    .unwrap();

    // ========== Digest Metrics ==========

    pub static ref DIGESTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "kindred_digests_total",
        "Total number of weekly digests by delivery status",
        &["status"]
    )
    .unwrap();
}

/// Render metrics in Prometheus text format
pub fn render_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!("Failed to encode metrics: {}", e);
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
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

/// Record a background job execution
pub fn record_background_job(job_type: &str, status: &str, duration: f64) {
    BACKGROUND_JOBS_TOTAL
        .with_label_values(&[job_type, status])
        .inc();
    BACKGROUND_JOB_DURATION_SECONDS
        .with_label_values(&[job_type])
        .observe(duration);
}

/// Record one processed reminder
pub fn record_reminder(outcome: &str) {
    REMINDERS_PROCESSED_TOTAL
        .with_label_values(&[outcome])
        .inc();
}

pub fn record_merge() {
    MERGES_TOTAL.inc();
}

pub fn record_duplicate_suggestions(count: usize) {
    DUPLICATE_SUGGESTIONS_TOTAL.inc_by(count as u64);
}

/// Record a digest delivery attempt
pub fn record_digest(delivered: bool) {
    DIGESTS_TOTAL
        .with_label_values(&[if delivered { "delivered" } else { "failed" }])
        .inc();
}
