//! Authorization middleware for protected routes.
//!
//! Hands the raw `Authorization` header to the [`Gateway`] and, on grant,
//! injects the verified claims into request extensions.

use crate::errors::Denial;
use crate::services::Gateway;
use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::IntoResponse,
};
use std::sync::Arc;
use tracing::instrument;

/// State for the authorization middleware.
#[derive(Clone)]
pub struct AuthState {
    pub gateway: Arc<Gateway>,
}

/// Gate a route behind bearer token verification.
///
/// # Response
///
/// - 401 with `WWW-Authenticate` for header and token faults
/// - 503 when the issuer's key cannot be obtained
/// - Otherwise the inner handler runs with
///   [`VerifiedClaims`](crate::auth::VerifiedClaims) in extensions
#[instrument(skip(state, req, next), name = "rp.middleware.auth")]
pub async fn require_auth(
    State(state): State<Arc<AuthState>>,
    mut req: Request,
    next: Next,
) -> Result<impl IntoResponse, Denial> {
    let raw_header = match req.headers().get(AUTHORIZATION) {
        None => None,
        Some(value) => Some(value.to_str().map_err(|_| {
            tracing::debug!(target: "rp.middleware.auth", "Authorization header is not visible ASCII");
            Denial::MalformedHeader
        })?),
    };

    let claims = state.gateway.authorize(raw_header).await.into_result()?;

    req.extensions_mut().insert(claims);

    Ok(next.run(req).await)
}
