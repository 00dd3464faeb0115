//! Response bodies for the relying-party gateway.

use serde::Serialize;

/// Static body served by `GET /`.
pub const HOME_MESSAGE: &str = "Soy la App Tonta. Usa /secreto con un token.";

/// Status reported on a successful grant.
pub const GRANT_STATUS: &str = "ACCESO CONCEDIDO";

/// The protected payload behind `/secreto`.
pub const SECRET_PAYLOAD: &str = "El código nuclear es 1234";

/// Response for `GET /`.
#[derive(Debug, Clone, Serialize)]
pub struct HomeResponse {
    pub message: &'static str,
}

/// Response for a granted `GET /secreto`.
///
/// Absent `sub` or `role` claims serialize as `null`.
#[derive(Debug, Clone, Serialize)]
pub struct GrantResponse {
    pub status: &'static str,
    pub data_secreta: &'static str,
    pub usuario_validado: Option<String>,
    pub rol_detectado: Option<String>,
}

/// Readiness check response.
///
/// Returned by the `/ready` endpoint (readiness probe).
#[derive(Debug, Clone, Serialize)]
pub struct ReadinessResponse {
    /// "ready" or "not_ready".
    pub status: &'static str,

    /// Whether the issuer's key could be resolved.
    pub trust: &'static str,

    /// Generic error message, no infrastructure details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
