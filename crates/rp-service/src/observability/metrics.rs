//! Metrics definitions for the relying-party gateway.
//!
//! All metrics follow Prometheus naming conventions:
//! - `rp_` prefix for the relying party
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! # Cardinality
//!
//! Labels are bounded:
//! - `method`: HTTP methods
//! - `endpoint`: the five routes plus `/other`
//! - `outcome`: `granted` or one of the six denial kinds
//! - `status`: trust fetch outcomes from `TrustError::status_label`
//! - `result`: `hit` or `miss`

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::time::Duration;

/// Initialize the Prometheus recorder and return the handle used by
/// the `/metrics` endpoint.
///
/// Must be called before any metrics are recorded.
///
/// # Errors
///
/// Returns error if the recorder fails to install (e.g., already installed).
pub fn init_metrics_recorder() -> Result<PrometheusHandle, String> {
    PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Prefix("rp_http_request".to_string()),
            &[
                0.005, 0.010, 0.025, 0.050, 0.100, 0.200, 0.500, 1.000, 2.000, 5.000,
            ],
        )
        .map_err(|e| format!("Failed to set HTTP request buckets: {e}"))?
        // Dominated by the issuer round trip when the cache is off
        .set_buckets_for_metric(
            Matcher::Prefix("rp_authorization".to_string()),
            &[
                0.001, 0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.000, 5.000,
            ],
        )
        .map_err(|e| format!("Failed to set authorization buckets: {e}"))?
        .set_buckets_for_metric(
            Matcher::Prefix("rp_trust_fetch".to_string()),
            &[
                0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.000, 2.500, 5.000, 10.000,
            ],
        )
        .map_err(|e| format!("Failed to set trust fetch buckets: {e}"))?
        .install_recorder()
        .map_err(|e| format!("Failed to install Prometheus recorder: {e}"))
}

// ============================================================================
// HTTP Request Metrics
// ============================================================================

/// Record HTTP request completion
///
/// Metric: `rp_http_requests_total`, `rp_http_request_duration_seconds`
/// Labels: `method`, `endpoint`, `status` / `status_code`
pub fn record_http_request(method: &str, endpoint: &str, status_code: u16, duration: Duration) {
    let normalized_endpoint = normalize_endpoint(endpoint);
    let status = categorize_status_code(status_code);

    histogram!("rp_http_request_duration_seconds",
        "method" => method.to_string(),
        "endpoint" => normalized_endpoint,
        "status" => status
    )
    .record(duration.as_secs_f64());

    counter!("rp_http_requests_total",
        "method" => method.to_string(),
        "endpoint" => normalized_endpoint,
        "status_code" => status_code.to_string()
    )
    .increment(1);
}

fn categorize_status_code(status_code: u16) -> &'static str {
    match status_code {
        200..=299 => "success",
        408 | 504 => "timeout",
        _ => "error",
    }
}

/// Map a request path to a bounded label value.
fn normalize_endpoint(path: &str) -> &'static str {
    match path {
        "/" => "/",
        "/secreto" => "/secreto",
        "/health" => "/health",
        "/ready" => "/ready",
        "/metrics" => "/metrics",
        _ => "/other",
    }
}

// ============================================================================
// Authorization Metrics
// ============================================================================

/// Record the outcome of one authorization attempt.
///
/// Metric: `rp_authorization_decisions_total`, `rp_authorization_duration_seconds`
/// Labels: `outcome`
pub fn record_authorization(outcome: &'static str, duration: Duration) {
    histogram!("rp_authorization_duration_seconds",
        "outcome" => outcome
    )
    .record(duration.as_secs_f64());

    counter!("rp_authorization_decisions_total",
        "outcome" => outcome
    )
    .increment(1);
}

// ============================================================================
// Trust Metrics
// ============================================================================

/// Record one request to the issuer's key endpoint.
///
/// Metric: `rp_trust_fetch_total`, `rp_trust_fetch_duration_seconds`
/// Labels: `status`
pub fn record_trust_fetch(status: &'static str, duration: Duration) {
    histogram!("rp_trust_fetch_duration_seconds",
        "status" => status
    )
    .record(duration.as_secs_f64());

    counter!("rp_trust_fetch_total",
        "status" => status
    )
    .increment(1);
}

/// Record a trust cache lookup.
///
/// Metric: `rp_trust_cache_total`
/// Labels: `result` (`hit` | `miss`)
pub fn record_trust_cache(result: &'static str) {
    counter!("rp_trust_cache_total",
        "result" => result
    )
    .increment(1);
}
