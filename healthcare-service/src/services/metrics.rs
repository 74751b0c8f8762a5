//! Metrics for the healthcare analysis flow.
//!
//! Recorded through the `metrics` facade and exported by the Prometheus
//! recorder installed in `service_core::observability::init_metrics`.

use metrics::{counter, histogram};

/// Record the outcome of an `/analyze-health` request.
pub fn record_analysis(outcome: &'static str) {
    counter!("healthcare_analysis_requests_total", "outcome" => outcome).increment(1);
}

/// Record documents submitted to the provider.
pub fn record_documents(provider: &'static str, count: usize) {
    counter!("healthcare_documents_submitted_total", "provider" => provider)
        .increment(count as u64);
}

/// Record provider call latency.
pub fn record_provider_latency(provider: &'static str, duration_secs: f64) {
    histogram!("healthcare_provider_latency_seconds", "provider" => provider)
        .record(duration_secs);
}

/// Record a provider error.
pub fn record_provider_error(provider: &'static str, error_type: &'static str) {
    counter!(
        "healthcare_provider_errors_total",
        "provider" => provider,
        "error_type" => error_type
    )
    .increment(1);
}

/// Record entities returned to callers.
pub fn record_entities(count: usize) {
    counter!("healthcare_entities_extracted_total").increment(count as u64);
}
