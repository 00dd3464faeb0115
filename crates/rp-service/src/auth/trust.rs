//! Trust resolution: fetching the issuer's current public key.
//!
//! The issuer (STS) publishes its RSA verification key as PEM text at a
//! single endpoint:
//!
//! ```json
//! { "public_key": "-----BEGIN PUBLIC KEY-----\n...\n-----END PUBLIC KEY-----\n" }
//! ```
//!
//! [`IssuerKeyClient`] fetches that key on every call. It never caches;
//! caching is layered on top by [`crate::auth::cache::CachedTrustResolver`]
//! when configured.
//!
//! # Failure handling
//!
//! Network errors, timeouts, non-2xx statuses, unexpected bodies and
//! unparseable keys are all reported as [`TrustError`]. Nothing here
//! panics or leaks a raw transport error to the caller.

use crate::observability::metrics::record_trust_fetch;
use async_trait::async_trait;
use jsonwebtoken::DecodingKey;
use serde::Deserialize;
use std::fmt;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::instrument;

/// Where a piece of trust material came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrustOrigin {
    /// Fetched from the issuer for this request.
    Fresh,

    /// Served from the trust cache.
    Cached,
}

/// The issuer's current public verification key.
///
/// Only constructible through [`TrustMaterial::from_pem`], so holding one
/// means the PEM text parsed as an RSA public key.
#[derive(Clone)]
pub struct TrustMaterial {
    decoding_key: DecodingKey,
    origin: TrustOrigin,
}

impl TrustMaterial {
    /// Parse PEM text (SPKI `PUBLIC KEY` or PKCS#1 `RSA PUBLIC KEY`).
    ///
    /// # Errors
    ///
    /// Returns `TrustError::MissingKey` for empty text and
    /// `TrustError::InvalidKey` if the text is not an RSA public key.
    pub fn from_pem(pem: &str) -> Result<Self, TrustError> {
        if pem.trim().is_empty() {
            return Err(TrustError::MissingKey);
        }

        let decoding_key = DecodingKey::from_rsa_pem(pem.as_bytes())
            .map_err(|e| TrustError::InvalidKey(e.to_string()))?;

        Ok(Self {
            decoding_key,
            origin: TrustOrigin::Fresh,
        })
    }

    pub fn decoding_key(&self) -> &DecodingKey {
        &self.decoding_key
    }

    pub fn origin(&self) -> TrustOrigin {
        self.origin
    }

    /// Re-label this material as served from a cache.
    pub(crate) fn cached(mut self) -> Self {
        self.origin = TrustOrigin::Cached;
        self
    }
}

impl fmt::Debug for TrustMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrustMaterial")
            .field("origin", &self.origin)
            .finish()
    }
}

/// Reasons trust material could not be produced.
///
/// Every variant means "unavailable" to the caller; the distinction exists
/// for logs and metrics.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TrustError {
    #[error("failed to build HTTP client: {0}")]
    ClientBuild(String),

    #[error("issuer request timed out")]
    Timeout,

    #[error("failed to reach issuer: {0}")]
    Transport(String),

    #[error("issuer returned status {0}")]
    UpstreamStatus(u16),

    #[error("issuer returned an unexpected body: {0}")]
    MalformedResponse(String),

    #[error("issuer response has no public key")]
    MissingKey,

    #[error("issuer public key is not a valid RSA PEM: {0}")]
    InvalidKey(String),
}

impl TrustError {
    /// Bounded label for metrics.
    pub fn status_label(&self) -> &'static str {
        match self {
            TrustError::ClientBuild(_) => "client_error",
            TrustError::Timeout => "timeout",
            TrustError::Transport(_) => "transport_error",
            TrustError::UpstreamStatus(_) => "upstream_status",
            TrustError::MalformedResponse(_) => "malformed_response",
            TrustError::MissingKey => "missing_key",
            TrustError::InvalidKey(_) => "invalid_key",
        }
    }
}

/// Produces the issuer's current public verification key on demand.
#[async_trait]
pub trait TrustResolver: Send + Sync {
    /// Resolve the current trust material.
    async fn resolve_trust(&self) -> Result<TrustMaterial, TrustError>;

    /// Drop any cached material so the next resolve goes to the issuer.
    async fn invalidate(&self) {}

    /// Identifier of the issuer this resolver talks to.
    fn issuer(&self) -> &str;
}

/// Body published by the issuer's key endpoint.
#[derive(Debug, Clone, Deserialize)]
struct PublicKeyResponse {
    #[serde(default)]
    public_key: Option<String>,
}

/// Fetches the issuer's public key over HTTP on every call.
pub struct IssuerKeyClient {
    /// URL of the issuer's key-publication endpoint.
    key_url: String,

    /// HTTP client with bounded request and connect timeouts.
    http_client: reqwest::Client,
}

impl IssuerKeyClient {
    /// Create a new issuer key client.
    ///
    /// # Arguments
    ///
    /// * `key_url` - URL of the issuer's public key endpoint
    /// * `timeout` - Upper bound on connecting to and reading from the issuer
    ///
    /// # Errors
    ///
    /// Returns `TrustError::ClientBuild` if the HTTP client cannot be built.
    /// There is no fallback to an unbounded default client.
    pub fn new(key_url: String, timeout: Duration) -> Result<Self, TrustError> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()
            .map_err(|e| {
                tracing::error!(target: "rp.auth.trust", error = %e, "Failed to build HTTP client");
                TrustError::ClientBuild(e.to_string())
            })?;

        Ok(Self {
            key_url,
            http_client,
        })
    }

    async fn fetch(&self) -> Result<TrustMaterial, TrustError> {
        tracing::debug!(target: "rp.auth.trust", url = %self.key_url, "Fetching public key from issuer");

        let response = self
            .http_client
            .get(&self.key_url)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    tracing::error!(target: "rp.auth.trust", error = %e, "Issuer request timed out");
                    TrustError::Timeout
                } else {
                    tracing::error!(target: "rp.auth.trust", error = %e, "Failed to reach issuer");
                    TrustError::Transport(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            tracing::error!(
                target: "rp.auth.trust",
                status = %status,
                "Issuer key endpoint returned error"
            );
            return Err(TrustError::UpstreamStatus(status.as_u16()));
        }

        let body: PublicKeyResponse = response.json().await.map_err(|e| {
            if e.is_timeout() {
                tracing::error!(target: "rp.auth.trust", error = %e, "Issuer response timed out");
                return TrustError::Timeout;
            }
            tracing::error!(target: "rp.auth.trust", error = %e, "Failed to parse issuer response");
            TrustError::MalformedResponse(e.to_string())
        })?;

        let pem = body.public_key.ok_or_else(|| {
            tracing::error!(target: "rp.auth.trust", "Issuer response missing public_key field");
            TrustError::MissingKey
        })?;

        TrustMaterial::from_pem(&pem).map_err(|e| {
            tracing::error!(target: "rp.auth.trust", error = %e, "Issuer published an unusable key");
            e
        })
    }
}

#[async_trait]
impl TrustResolver for IssuerKeyClient {
    #[instrument(skip(self), name = "rp.auth.trust.resolve")]
    async fn resolve_trust(&self) -> Result<TrustMaterial, TrustError> {
        let start = Instant::now();
        let result = self.fetch().await;

        let status = match &result {
            Ok(_) => "success",
            Err(e) => e.status_label(),
        };
        record_trust_fetch(status, start.elapsed());

        if result.is_ok() {
            tracing::debug!(target: "rp.auth.trust", "Public key fetched from issuer");
        }

        result
    }

    fn issuer(&self) -> &str {
        &self.key_url
    }
}
