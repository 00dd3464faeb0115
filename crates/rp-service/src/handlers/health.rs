//! Health check handlers.
//!
//! - `/health`: Liveness probe, returns OK if the process is running
//! - `/ready`: Readiness probe, checks that the issuer key can be resolved

use crate::models::ReadinessResponse;
use crate::routes::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use std::sync::Arc;

/// Liveness probe handler.
///
/// Does NOT check any dependencies.
pub async fn health_check() -> &'static str {
    "OK"
}

/// Readiness probe handler.
///
/// Returns 200 when trust material resolves, 503 otherwise. With the
/// trust cache enabled a warm cache counts as ready.
#[tracing::instrument(skip_all, name = "rp.health.readiness")]
pub async fn readiness_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.resolver.resolve_trust().await {
        Ok(_) => (
            StatusCode::OK,
            Json(ReadinessResponse {
                status: "ready",
                trust: "available",
                error: None,
            }),
        ),
        Err(e) => {
            tracing::warn!(target: "rp.health", error = %e, "Readiness check failed: issuer key unavailable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ReadinessResponse {
                    status: "not_ready",
                    trust: "unavailable",
                    error: Some("Service dependencies unavailable".to_string()),
                }),
            )
        }
    }
}
