//! Parsing of the `Authorization` header into a bearer credential.
//!
//! The header value is split on whitespace and must yield exactly two
//! tokens: the scheme and the credential. Leading and trailing whitespace
//! is ignored and any single run of whitespace separates the two tokens.
//! This is a literal split, not a general RFC 7235 parser: quoted strings,
//! auth-params and comma-separated challenges are not understood.

use crate::errors::Denial;
use std::fmt;

/// The only accepted scheme, compared case-insensitively.
const BEARER_SCHEME: &str = "bearer";

/// A credential presented as `Authorization: Bearer <token>`.
#[derive(Clone, PartialEq, Eq)]
pub struct BearerCredential {
    token: String,
}

impl BearerCredential {
    /// Parse a raw `Authorization` header value.
    ///
    /// Checks, in order:
    /// 1. Presence - `None` or empty → `MissingHeader`
    /// 2. Structure - not exactly two whitespace-separated tokens → `MalformedHeader`
    /// 3. Scheme - not `Bearer` (any case) → `UnsupportedScheme`
    pub fn parse(raw_header: Option<&str>) -> Result<Self, Denial> {
        let raw = match raw_header {
            Some(raw) if !raw.is_empty() => raw,
            _ => {
                tracing::debug!(target: "rp.auth.bearer", "Missing Authorization header");
                return Err(Denial::MissingHeader);
            }
        };

        let mut parts = raw.split_whitespace();
        let (scheme, token) = match (parts.next(), parts.next(), parts.next()) {
            (Some(scheme), Some(token), None) => (scheme, token),
            _ => {
                tracing::debug!(target: "rp.auth.bearer", "Malformed Authorization header");
                return Err(Denial::MalformedHeader);
            }
        };

        if !scheme.eq_ignore_ascii_case(BEARER_SCHEME) {
            tracing::debug!(target: "rp.auth.bearer", scheme = %scheme, "Unsupported authorization scheme");
            return Err(Denial::UnsupportedScheme);
        }

        Ok(Self {
            token: token.to_string(),
        })
    }

    /// The opaque credential string (the token itself).
    pub fn token(&self) -> &str {
        &self.token
    }
}

/// Debug never prints the token.
impl fmt::Debug for BearerCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BearerCredential")
            .field("token", &"[REDACTED]")
            .finish()
    }
}
