//! Relying-party denial types.
//!
//! Every failure on the verification path becomes a [`Denial`] before it
//! reaches the caller. Each denial maps to an HTTP status code and a JSON
//! body via the `IntoResponse` impl. Trust failures are logged server-side
//! and returned to the client with a generic message.

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Realm advertised in `WWW-Authenticate` challenges.
const AUTH_REALM: &str = "rp-service";

/// Typed rejection of a verification attempt.
///
/// Maps to HTTP status codes:
/// - MissingHeader, MalformedHeader, UnsupportedScheme: 401 (caller fault)
/// - Expired, InvalidToken: 401 (caller fault)
/// - TrustUnavailable: 503 (issuer fault, retry later)
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Denial {
    #[error("Missing Authorization header")]
    MissingHeader,

    #[error("Malformed Authorization header")]
    MalformedHeader,

    #[error("Unsupported authorization scheme")]
    UnsupportedScheme,

    #[error("Trust material unavailable: {0}")]
    TrustUnavailable(String),

    #[error("Token expired")]
    Expired,

    #[error("Invalid token: {0}")]
    InvalidToken(String),
}

/// Machine-readable denial kind, used as the response `code` and as a
/// bounded metrics label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DenialKind {
    MissingHeader,
    MalformedHeader,
    UnsupportedScheme,
    TrustUnavailable,
    Expired,
    InvalidToken,
}

impl DenialKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DenialKind::MissingHeader => "MissingHeader",
            DenialKind::MalformedHeader => "MalformedHeader",
            DenialKind::UnsupportedScheme => "UnsupportedScheme",
            DenialKind::TrustUnavailable => "TrustUnavailable",
            DenialKind::Expired => "Expired",
            DenialKind::InvalidToken => "InvalidToken",
        }
    }
}

impl fmt::Display for DenialKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Denial {
    pub fn kind(&self) -> DenialKind {
        match self {
            Denial::MissingHeader => DenialKind::MissingHeader,
            Denial::MalformedHeader => DenialKind::MalformedHeader,
            Denial::UnsupportedScheme => DenialKind::UnsupportedScheme,
            Denial::TrustUnavailable(_) => DenialKind::TrustUnavailable,
            Denial::Expired => DenialKind::Expired,
            Denial::InvalidToken(_) => DenialKind::InvalidToken,
        }
    }

    /// Returns the HTTP status code for this denial.
    pub fn status_code(&self) -> u16 {
        match self {
            Denial::TrustUnavailable(_) => 503,
            _ => 401,
        }
    }

    /// Human-readable message returned to the caller.
    fn client_message(&self) -> String {
        match self {
            Denial::MissingHeader => "Falta el header Authorization".to_string(),
            Denial::MalformedHeader => "Header mal formado".to_string(),
            Denial::UnsupportedScheme => "Formato inválido. Usa 'Bearer <token>'".to_string(),
            Denial::TrustUnavailable(_) => {
                "El STS no responde, no puedo validarte.".to_string()
            }
            Denial::Expired => "El token ha caducado".to_string(),
            Denial::InvalidToken(detail) => format!("Token inválido: {}", detail),
        }
    }

    /// RFC 6750 error code for the `WWW-Authenticate` challenge.
    fn challenge_error(&self) -> &'static str {
        match self {
            Denial::MissingHeader | Denial::MalformedHeader | Denial::UnsupportedScheme => {
                "invalid_request"
            }
            _ => "invalid_token",
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: &'static str,
    message: String,
}

impl IntoResponse for Denial {
    fn into_response(self) -> Response {
        let status = match &self {
            Denial::TrustUnavailable(reason) => {
                // Log actual reason server-side
                tracing::warn!(target: "rp.availability", reason = %reason, "Trust material unavailable");
                StatusCode::SERVICE_UNAVAILABLE
            }
            _ => StatusCode::UNAUTHORIZED,
        };

        let error_response = ErrorResponse {
            error: ErrorDetail {
                code: self.kind().as_str(),
                message: self.client_message(),
            },
        };

        let mut response = (status, Json(error_response)).into_response();

        // Add WWW-Authenticate header for 401 responses
        if status == StatusCode::UNAUTHORIZED {
            let challenge = format!(
                "Bearer realm=\"{}\", error=\"{}\"",
                AUTH_REALM,
                self.challenge_error()
            );
            if let Ok(header_value) = HeaderValue::from_str(&challenge) {
                response
                    .headers_mut()
                    .insert(header::WWW_AUTHENTICATE, header_value);
            }
        }

        response
    }
}
