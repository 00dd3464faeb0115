//! Authentication module for the relying-party gateway.
//!
//! Trust is established by asking the issuer (STS) for its current public
//! key, then bearer tokens are verified against that key.
//!
//! # Components
//!
//! - `trust` - Trust resolver trait and the HTTP issuer key client
//! - `cache` - Optional TTL cache in front of a trust resolver
//! - `bearer` - `Authorization` header parsing
//! - `verifier` - RS256 token verification and claim extraction
//! - `claims` - Verified claims structure

pub mod bearer;
pub mod cache;
pub mod claims;
pub mod trust;
pub mod verifier;

pub use bearer::BearerCredential;
pub use cache::CachedTrustResolver;
pub use claims::VerifiedClaims;
pub use trust::{IssuerKeyClient, TrustError, TrustMaterial, TrustOrigin, TrustResolver};
pub use verifier::TokenVerifier;

use crate::config::Config;
use std::sync::Arc;

/// Build the trust resolver chain described by `config`.
///
/// Without a cache TTL every call goes to the issuer. With one, the
/// issuer client is wrapped in a [`CachedTrustResolver`].
///
/// # Errors
///
/// Returns `TrustError::ClientBuild` if the HTTP client cannot be built.
pub fn build_trust_resolver(config: &Config) -> Result<Arc<dyn TrustResolver>, TrustError> {
    let client: Arc<dyn TrustResolver> = Arc::new(IssuerKeyClient::new(
        config.sts_url.clone(),
        config.sts_timeout,
    )?);

    match config.trust_cache_ttl {
        Some(ttl) => {
            tracing::info!(
                target: "rp.auth",
                ttl_seconds = ttl.as_secs(),
                "Trust cache enabled"
            );
            Ok(Arc::new(CachedTrustResolver::new(client, ttl)))
        }
        None => {
            tracing::info!(target: "rp.auth", "Trust cache disabled, fetching key per request");
            Ok(client)
        }
    }
}

/// Build the token verifier described by `config`.
pub fn build_token_verifier(config: &Config) -> TokenVerifier {
    TokenVerifier::new(config.jwt_clock_skew)
        .with_expected_issuer(config.expected_issuer.clone())
        .with_expected_audience(config.expected_audience.clone())
}
