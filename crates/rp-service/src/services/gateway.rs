//! Request authorization: resolve trust, then verify the bearer token.
//!
//! The order of checks is fixed:
//!
//! 1. The `Authorization` header is parsed. Header faults are returned
//!    without contacting the issuer.
//! 2. Trust material is resolved. Any failure is `TrustUnavailable`.
//! 3. The token is verified against that material.
//!
//! When the material came from the trust cache and the token fails with
//! `InvalidToken`, the cache entry is dropped and verification is retried
//! once against freshly fetched material. This covers issuer key rotation
//! within the cache TTL.

use crate::auth::{
    BearerCredential, TokenVerifier, TrustMaterial, TrustOrigin, TrustResolver, VerifiedClaims,
};
use crate::errors::Denial;
use crate::observability::metrics::record_authorization;
use std::sync::Arc;
use std::time::Instant;
use tracing::instrument;

/// Outcome of one authorization attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthorizationDecision {
    Granted(VerifiedClaims),
    Denied(Denial),
}

impl AuthorizationDecision {
    pub fn into_result(self) -> Result<VerifiedClaims, Denial> {
        match self {
            AuthorizationDecision::Granted(claims) => Ok(claims),
            AuthorizationDecision::Denied(denial) => Err(denial),
        }
    }

    /// Bounded label for logs and metrics.
    pub fn outcome(&self) -> &'static str {
        match self {
            AuthorizationDecision::Granted(_) => "granted",
            AuthorizationDecision::Denied(denial) => denial.kind().as_str(),
        }
    }
}

impl From<Result<VerifiedClaims, Denial>> for AuthorizationDecision {
    fn from(result: Result<VerifiedClaims, Denial>) -> Self {
        match result {
            Ok(claims) => AuthorizationDecision::Granted(claims),
            Err(denial) => AuthorizationDecision::Denied(denial),
        }
    }
}

/// Decides whether a request may reach a protected resource.
pub struct Gateway {
    resolver: Arc<dyn TrustResolver>,
    verifier: TokenVerifier,
}

impl Gateway {
    pub fn new(resolver: Arc<dyn TrustResolver>, verifier: TokenVerifier) -> Self {
        Self { resolver, verifier }
    }

    /// Authorize a request given its raw `Authorization` header value.
    #[instrument(skip_all, name = "rp.gateway.authorize", fields(outcome = tracing::field::Empty))]
    pub async fn authorize(&self, raw_header: Option<&str>) -> AuthorizationDecision {
        let start = Instant::now();

        let decision = AuthorizationDecision::from(self.decide(raw_header).await);

        tracing::Span::current().record("outcome", decision.outcome());
        record_authorization(decision.outcome(), start.elapsed());

        match &decision {
            AuthorizationDecision::Granted(claims) => {
                tracing::info!(
                    target: "rp.gateway",
                    role = claims.role.as_deref().unwrap_or("-"),
                    "Access granted"
                );
            }
            AuthorizationDecision::Denied(denial) => {
                tracing::info!(
                    target: "rp.gateway",
                    outcome = decision.outcome(),
                    status = denial.status_code(),
                    "Access denied"
                );
            }
        }

        decision
    }

    async fn decide(&self, raw_header: Option<&str>) -> Result<VerifiedClaims, Denial> {
        let credential = BearerCredential::parse(raw_header)?;

        let trust = self.resolve().await?;

        match self.verifier.verify_credential(&credential, &trust) {
            Err(Denial::InvalidToken(reason)) if trust.origin() == TrustOrigin::Cached => {
                tracing::info!(
                    target: "rp.gateway",
                    reason = %reason,
                    "Token rejected with cached key, refreshing trust and retrying"
                );
                self.resolver.invalidate().await;
                let fresh = self.resolve().await?;
                self.verifier.verify_credential(&credential, &fresh)
            }
            result => result,
        }
    }

    async fn resolve(&self) -> Result<TrustMaterial, Denial> {
        self.resolver.resolve_trust().await.map_err(|e| {
            tracing::warn!(
                target: "rp.gateway",
                issuer = %self.resolver.issuer(),
                error = %e,
                "Could not resolve trust material"
            );
            Denial::TrustUnavailable(e.to_string())
        })
    }
}
