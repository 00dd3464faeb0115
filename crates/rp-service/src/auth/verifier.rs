//! Bearer token verification against resolved trust material.
//!
//! # Security
//!
//! - Tokens are size- and structure-checked BEFORE signature verification
//! - Only RS256 (RSA + SHA-256) is accepted; `none`, HMAC and other
//!   algorithms are rejected as invalid
//! - Expiry is enforced with an explicit clock skew, separately from the
//!   signature check, so `Expired` is distinguishable from `InvalidToken`
//! - `nbf` and `iat` are validated with the same tolerance

use crate::auth::bearer::BearerCredential;
use crate::auth::claims::{TokenPayload, VerifiedClaims};
use crate::auth::trust::TrustMaterial;
use crate::errors::Denial;
use common::jwt::{
    check_token_structure, validate_exp_at, validate_iat_at, validate_nbf_at, JwtValidationError,
};
use jsonwebtoken::{decode, Algorithm, Validation};
use std::time::Duration;
use tracing::instrument;

/// Validates bearer credentials and extracts their claims.
///
/// Stateless: the result depends only on the credential, the trust
/// material and the wall clock.
#[derive(Debug, Clone)]
pub struct TokenVerifier {
    /// Tolerance applied to `exp`, `nbf` and `iat`.
    clock_skew: Duration,

    /// Required `iss` claim, when configured.
    expected_issuer: Option<String>,

    /// Required `aud` claim, when configured.
    expected_audience: Option<String>,
}

impl TokenVerifier {
    /// Create a verifier with the given clock skew tolerance and no
    /// issuer or audience pinning.
    pub fn new(clock_skew: Duration) -> Self {
        Self {
            clock_skew,
            expected_issuer: None,
            expected_audience: None,
        }
    }

    /// Require tokens to carry this `iss` claim.
    pub fn with_expected_issuer(mut self, issuer: Option<String>) -> Self {
        self.expected_issuer = issuer;
        self
    }

    /// Require tokens to carry this `aud` claim.
    pub fn with_expected_audience(mut self, audience: Option<String>) -> Self {
        self.expected_audience = audience;
        self
    }

    /// Verify a raw `Authorization` header value against `trust`.
    ///
    /// Runs header presence, structure and scheme checks before any
    /// token work.
    pub fn verify(
        &self,
        raw_header: Option<&str>,
        trust: &TrustMaterial,
    ) -> Result<VerifiedClaims, Denial> {
        let credential = BearerCredential::parse(raw_header)?;
        self.verify_credential(&credential, trust)
    }

    /// Verify an already-parsed bearer credential against `trust`.
    #[instrument(skip_all, name = "rp.auth.verifier.verify")]
    pub fn verify_credential(
        &self,
        credential: &BearerCredential,
        trust: &TrustMaterial,
    ) -> Result<VerifiedClaims, Denial> {
        self.verify_token_at(credential.token(), trust, chrono::Utc::now().timestamp())
    }

    /// Verify a bare token at an explicit `now` (Unix epoch seconds).
    pub fn verify_token_at(
        &self,
        token: &str,
        trust: &TrustMaterial,
        now: i64,
    ) -> Result<VerifiedClaims, Denial> {
        // 1. Size and outer structure (no crypto yet)
        check_token_structure(token).map_err(|e| {
            tracing::debug!(target: "rp.auth.verifier", error = %e, "Token structure check failed");
            Denial::InvalidToken(e.to_string())
        })?;

        // 2. Signature over header+payload, then payload decoding
        let token_data =
            decode::<TokenPayload>(token, trust.decoding_key(), &self.validation()).map_err(
                |e| {
                    tracing::debug!(target: "rp.auth.verifier", error = %e, "Token verification failed");
                    Denial::InvalidToken(e.to_string())
                },
            )?;
        let payload = token_data.claims;

        // 3. Expiry, kept distinct from every other failure
        validate_exp_at(payload.exp, self.clock_skew, now).map_err(|_| {
            tracing::debug!(target: "rp.auth.verifier", "Token expired");
            Denial::Expired
        })?;

        // 4. Remaining time claims
        validate_nbf_at(payload.nbf, self.clock_skew, now)
            .and_then(|()| validate_iat_at(payload.iat, self.clock_skew, now))
            .map_err(|e: JwtValidationError| {
                tracing::debug!(target: "rp.auth.verifier", error = %e, "Token time claims invalid");
                Denial::InvalidToken(e.to_string())
            })?;

        tracing::debug!(target: "rp.auth.verifier", "Token validated successfully");
        Ok(VerifiedClaims::from(payload))
    }

    /// Library validation settings: RS256 only, time claims handled here.
    fn validation(&self) -> Validation {
        let mut validation = Validation::new(Algorithm::RS256);
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.required_spec_claims.clear();

        if let Some(issuer) = &self.expected_issuer {
            validation.set_issuer(&[issuer.as_str()]);
        }

        match &self.expected_audience {
            Some(audience) => validation.set_audience(&[audience.as_str()]),
            None => validation.validate_aud = false,
        }

        validation
    }
}
