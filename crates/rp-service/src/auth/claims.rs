//! Claims extracted from a verified bearer credential.
//!
//! The subject is redacted in Debug output to prevent exposure in logs.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Claims of a credential that passed signature and expiry checks.
///
/// `sub` and `role` are issuer-defined and optional: a token without them
/// is still valid, the fields are simply unset.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifiedClaims {
    /// Subject identifier - redacted in Debug output.
    pub sub: Option<String>,

    /// Role label assigned by the issuer.
    pub role: Option<String>,

    /// Expiration timestamp (Unix epoch seconds), if the token carries one.
    pub exp: Option<i64>,
}

/// Custom Debug implementation that redacts the `sub` field.
impl fmt::Debug for VerifiedClaims {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VerifiedClaims")
            .field("sub", &self.sub.as_ref().map(|_| "[REDACTED]"))
            .field("role", &self.role)
            .field("exp", &self.exp)
            .finish()
    }
}

/// Payload fields the verifier reads from a decoded token.
///
/// Unknown claims are ignored. Type mismatches (e.g. a non-numeric `exp`)
/// fail deserialization and reject the token. Time claims accept any JSON
/// number, fractional seconds are truncated toward the past.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct TokenPayload {
    #[serde(default)]
    pub sub: Option<String>,

    #[serde(default)]
    pub role: Option<String>,

    #[serde(default, deserialize_with = "numeric_date")]
    pub exp: Option<i64>,

    #[serde(default, deserialize_with = "numeric_date")]
    pub nbf: Option<i64>,

    #[serde(default, deserialize_with = "numeric_date")]
    pub iat: Option<i64>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NumericDate {
    Seconds(i64),
    Fractional(f64),
}

/// Read an optional NumericDate as whole epoch seconds (floor).
fn numeric_date<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<NumericDate>::deserialize(deserializer)? {
        None => Ok(None),
        Some(NumericDate::Seconds(seconds)) => Ok(Some(seconds)),
        Some(NumericDate::Fractional(value)) => {
            let floored = value.floor();
            if !floored.is_finite() || floored < i64::MIN as f64 || floored >= i64::MAX as f64 {
                return Err(serde::de::Error::custom(format!(
                    "NumericDate out of range: {value}"
                )));
            }
            Ok(Some(floored as i64))
        }
    }
}

impl From<TokenPayload> for VerifiedClaims {
    fn from(payload: TokenPayload) -> Self {
        Self {
            sub: payload.sub,
            role: payload.role,
            exp: payload.exp,
        }
    }
}
