//! JWT utilities shared by the relying-party gateway.
//!
//! This module provides the token checks that sit around signature
//! verification:
//! - Size limits for DoS prevention
//! - Structural pre-checks (three base64url segments, JSON header)
//! - Clock skew constants
//! - `exp`, `nbf` and `iat` validation with explicit tolerance
//!
//! # Security
//!
//! - Tokens are size-checked BEFORE parsing (DoS prevention)
//! - Time claims are validated against an explicit, bounded clock skew
//!   rather than a library default
//!
//! # Usage
//!
//! ```rust,ignore
//! use common::jwt::{check_token_structure, validate_exp_at, DEFAULT_CLOCK_SKEW};
//!
//! // Reject oversized or structurally broken tokens before any crypto
//! check_token_structure(token)?;
//!
//! // After signature verification, enforce expiry
//! validate_exp_at(claims.exp, DEFAULT_CLOCK_SKEW, now)?;
//! ```

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use std::time::Duration;
use thiserror::Error;

// =============================================================================
// Constants
// =============================================================================

/// Maximum allowed JWT size in bytes (8KB).
///
/// JWTs larger than this size are rejected BEFORE any base64 decoding or
/// RSA signature verification.
///
/// - An RS256 token with `sub`, `role`, `exp`, `iss` is ~600 bytes
/// - 8KB leaves room for larger issuer-defined claims
pub const MAX_JWT_SIZE_BYTES: usize = 8192; // 8KB

/// Default clock skew tolerance for time claims (5 seconds).
///
/// A token whose `exp` lies up to this many seconds in the past is still
/// accepted. The same tolerance applies to `nbf` and `iat` in the future.
pub const DEFAULT_CLOCK_SKEW: Duration = Duration::from_secs(5);

/// Maximum allowed clock skew tolerance (5 minutes).
///
/// Configuration above this bound is rejected at startup.
pub const MAX_CLOCK_SKEW: Duration = Duration::from_secs(300);

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur while checking a JWT outside of signature
/// verification.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum JwtValidationError {
    /// Token size exceeds maximum allowed.
    #[error("token exceeds maximum size of {} bytes", MAX_JWT_SIZE_BYTES)]
    TokenTooLarge,

    /// Token is not three dot-separated segments with a decodable header.
    #[error("token is not a well-formed JWT: {0}")]
    MalformedToken(String),

    /// Token `exp` claim is in the past beyond the clock skew.
    #[error("token has expired")]
    Expired,

    /// Token `nbf` claim is in the future beyond the clock skew.
    #[error("token is not yet valid")]
    NotYetValid,

    /// Token `iat` claim is too far in the future.
    #[error("token issued-at time is in the future")]
    IatTooFarInFuture,
}

// =============================================================================
// Functions
// =============================================================================

/// Check the size and outer structure of a JWT without verifying it.
///
/// Enforces [`MAX_JWT_SIZE_BYTES`], exactly three dot-separated segments,
/// and a header segment that is base64url-encoded JSON. Signature and
/// payload are checked by the verifier afterwards.
///
/// # Errors
///
/// - `TokenTooLarge` - Token exceeds size limit
/// - `MalformedToken` - Wrong segment count, bad base64url, or non-JSON header
pub fn check_token_structure(token: &str) -> Result<(), JwtValidationError> {
    // Check token size first (DoS prevention)
    if token.len() > MAX_JWT_SIZE_BYTES {
        tracing::debug!(
            target: "common.jwt",
            token_size = token.len(),
            max_size = MAX_JWT_SIZE_BYTES,
            "Token rejected: size exceeds maximum allowed"
        );
        return Err(JwtValidationError::TokenTooLarge);
    }

    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() != 3 {
        tracing::debug!(
            target: "common.jwt",
            parts = parts.len(),
            "Token rejected: invalid JWT format"
        );
        return Err(JwtValidationError::MalformedToken(format!(
            "expected 3 segments, got {}",
            parts.len()
        )));
    }

    let header_part = parts
        .first()
        .ok_or_else(|| JwtValidationError::MalformedToken("missing header".to_string()))?;
    let header_bytes = URL_SAFE_NO_PAD.decode(header_part).map_err(|e| {
        tracing::debug!(target: "common.jwt", error = %e, "Failed to decode JWT header base64");
        JwtValidationError::MalformedToken("header is not base64url".to_string())
    })?;

    let header: serde_json::Value = serde_json::from_slice(&header_bytes).map_err(|e| {
        tracing::debug!(target: "common.jwt", error = %e, "Failed to parse JWT header JSON");
        JwtValidationError::MalformedToken("header is not JSON".to_string())
    })?;

    if !header.is_object() {
        return Err(JwtValidationError::MalformedToken(
            "header is not a JSON object".to_string(),
        ));
    }

    Ok(())
}

/// Deterministic `exp` validation against an explicit `now` timestamp.
///
/// A token is live while `exp + clock_skew > now`. A token without `exp`
/// never expires.
///
/// # Errors
///
/// Returns `JwtValidationError::Expired` if `exp + clock_skew <= now`.
pub fn validate_exp_at(
    exp: Option<i64>,
    clock_skew: Duration,
    now: i64,
) -> Result<(), JwtValidationError> {
    let Some(exp) = exp else {
        return Ok(());
    };

    let clock_skew_secs = skew_secs(clock_skew);
    if exp.saturating_add(clock_skew_secs) <= now {
        tracing::debug!(
            target: "common.jwt",
            exp = exp,
            now = now,
            clock_skew_secs = clock_skew_secs,
            "Token rejected: expired"
        );
        return Err(JwtValidationError::Expired);
    }

    Ok(())
}

/// Deterministic `nbf` validation against an explicit `now` timestamp.
///
/// # Errors
///
/// Returns `JwtValidationError::NotYetValid` if `nbf > now + clock_skew`.
pub fn validate_nbf_at(
    nbf: Option<i64>,
    clock_skew: Duration,
    now: i64,
) -> Result<(), JwtValidationError> {
    let Some(nbf) = nbf else {
        return Ok(());
    };

    if nbf > now.saturating_add(skew_secs(clock_skew)) {
        tracing::debug!(target: "common.jwt", nbf = nbf, now = now, "Token rejected: not yet valid");
        return Err(JwtValidationError::NotYetValid);
    }

    Ok(())
}

/// Deterministic `iat` validation against an explicit `now` timestamp.
///
/// Rejects tokens that claim to be issued in the future, which indicates
/// pre-generated tokens or badly skewed issuer clocks.
///
/// # Errors
///
/// Returns `JwtValidationError::IatTooFarInFuture` if `iat > now + clock_skew`.
pub fn validate_iat_at(
    iat: Option<i64>,
    clock_skew: Duration,
    now: i64,
) -> Result<(), JwtValidationError> {
    let Some(iat) = iat else {
        return Ok(());
    };

    let clock_skew_secs = skew_secs(clock_skew);
    let max_iat = now.saturating_add(clock_skew_secs);

    if iat > max_iat {
        tracing::debug!(
            target: "common.jwt",
            iat = iat,
            now = now,
            max_allowed = max_iat,
            clock_skew_secs = clock_skew_secs,
            "Token rejected: iat too far in the future"
        );
        return Err(JwtValidationError::IatTooFarInFuture);
    }

    Ok(())
}

/// Clock skew in whole seconds, saturating on absurd inputs.
fn skew_secs(clock_skew: Duration) -> i64 {
    i64::try_from(clock_skew.as_secs()).unwrap_or(i64::MAX)
}
