//! Prometheus metrics endpoint handler.
//!
//! Unauthenticated so Prometheus can scrape it. Labels are bounded and
//! carry no subjects or tokens.

use axum::{extract::State, response::IntoResponse};
use metrics_exporter_prometheus::PrometheusHandle;

/// Handler for GET /metrics
///
/// ```text
/// # TYPE rp_authorization_decisions_total counter
/// rp_authorization_decisions_total{outcome="granted"} 42
/// ```
#[tracing::instrument(skip_all, name = "rp.metrics.scrape")]
pub async fn metrics_handler(State(handle): State<PrometheusHandle>) -> impl IntoResponse {
    handle.render()
}
