//! Protected resource handler.
//!
//! Only reachable through the auth middleware, which has already placed
//! the verified claims in request extensions.

use crate::auth::VerifiedClaims;
use crate::models::{GrantResponse, GRANT_STATUS, SECRET_PAYLOAD};
use axum::{Extension, Json};
use tracing::instrument;

/// Handler for GET /secreto
///
/// ## Response
///
/// ```json
/// {
///   "status": "ACCESO CONCEDIDO",
///   "data_secreta": "El código nuclear es 1234",
///   "usuario_validado": "alice",
///   "rol_detectado": "admin"
/// }
/// ```
#[instrument(skip_all, name = "rp.handlers.secret")]
pub async fn get_secret(Extension(claims): Extension<VerifiedClaims>) -> Json<GrantResponse> {
    Json(GrantResponse {
        status: GRANT_STATUS,
        data_secreta: SECRET_PAYLOAD,
        usuario_validado: claims.sub,
        rol_detectado: claims.role,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_get_secret_echoes_claims() {
        let claims = VerifiedClaims {
            sub: Some("alice".to_string()),
            role: Some("admin".to_string()),
            exp: Some(1_900_000_000),
        };

        let Json(body) = get_secret(Extension(claims)).await;

        assert_eq!(body.status, "ACCESO CONCEDIDO");
        assert_eq!(body.data_secreta, "El código nuclear es 1234");
        assert_eq!(body.usuario_validado.as_deref(), Some("alice"));
        assert_eq!(body.rol_detectado.as_deref(), Some("admin"));
    }

    #[tokio::test]
    async fn test_get_secret_without_optional_claims() {
        let claims = VerifiedClaims {
            sub: None,
            role: None,
            exp: None,
        };

        let Json(body) = get_secret(Extension(claims)).await;

        assert!(body.usuario_validado.is_none());
        assert!(body.rol_detectado.is_none());
    }
}
