//! Optional TTL cache in front of a [`TrustResolver`].
//!
//! The baseline gateway fetches the issuer key on every request. When
//! `TRUST_CACHE_TTL_SECONDS` is set, the resolver is wrapped in a
//! [`CachedTrustResolver`] which keeps the last key per issuer for the TTL.
//!
//! # Staleness
//!
//! - A cached key is served for at most `ttl` after it was fetched
//! - An expired entry is never served, even if the refresh fails
//! - `invalidate()` drops the entry so the next resolve hits the issuer

use crate::auth::trust::{TrustError, TrustMaterial, TrustResolver};
use crate::observability::metrics::record_trust_cache;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::instrument;

/// Cached trust material with expiry time.
struct CachedTrust {
    material: TrustMaterial,

    /// When this cache entry expires.
    expires_at: Instant,
}

/// Trust resolver that caches the inner resolver's material per issuer.
pub struct CachedTrustResolver {
    inner: Arc<dyn TrustResolver>,

    /// Entries keyed by issuer identifier.
    cache: RwLock<HashMap<String, CachedTrust>>,

    ttl: Duration,
}

impl CachedTrustResolver {
    /// Wrap `inner` with a cache whose entries live for `ttl`.
    pub fn new(inner: Arc<dyn TrustResolver>, ttl: Duration) -> Self {
        Self {
            inner,
            cache: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    async fn lookup(&self) -> Option<TrustMaterial> {
        let cache = self.cache.read().await;
        cache
            .get(self.inner.issuer())
            .filter(|cached| cached.expires_at > Instant::now())
            .map(|cached| cached.material.clone())
    }
}

#[async_trait]
impl TrustResolver for CachedTrustResolver {
    #[instrument(skip(self), name = "rp.auth.trust_cache.resolve")]
    async fn resolve_trust(&self) -> Result<TrustMaterial, TrustError> {
        if let Some(material) = self.lookup().await {
            tracing::debug!(target: "rp.auth.trust_cache", "Trust cache hit");
            record_trust_cache("hit");
            return Ok(material.cached());
        }

        record_trust_cache("miss");

        // Drop any expired entry before going to the issuer so a failed
        // refresh cannot leave stale material behind.
        {
            let mut cache = self.cache.write().await;
            cache.remove(self.inner.issuer());
        }

        let material = self.inner.resolve_trust().await?;

        let mut cache = self.cache.write().await;
        cache.insert(
            self.inner.issuer().to_string(),
            CachedTrust {
                material: material.clone(),
                expires_at: Instant::now() + self.ttl,
            },
        );

        tracing::info!(
            target: "rp.auth.trust_cache",
            ttl_seconds = self.ttl.as_secs(),
            "Trust cache refreshed"
        );

        Ok(material)
    }

    async fn invalidate(&self) {
        let mut cache = self.cache.write().await;
        if cache.remove(self.inner.issuer()).is_some() {
            tracing::info!(target: "rp.auth.trust_cache", "Trust cache invalidated");
        }
    }

    fn issuer(&self) -> &str {
        self.inner.issuer()
    }
}
