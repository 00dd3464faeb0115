//! Builder patterns for test token construction
//!
//! Provides a fluent API for RS256 tokens shaped like the ones the STS
//! issues (`sub`, `role`, `exp`, optional `iss`).

use crate::crypto_fixtures::encoding_key;
use chrono::{Duration, Utc};
use jsonwebtoken::{encode, Algorithm, Header};
use serde_json::{json, Map, Value};

/// Builder for test JWT claims and signed tokens
///
/// # Example
/// ```rust,ignore
/// let token = TestTokenBuilder::new()
///     .for_user("alice")
///     .with_role("admin")
///     .expires_in(3600)
///     .sign(ISSUER_PRIVATE_KEY_PEM);
/// ```
pub struct TestTokenBuilder {
    sub: Option<String>,
    role: Option<String>,
    exp: Option<i64>,
    iat: Option<i64>,
    nbf: Option<i64>,
    iss: Option<String>,
    aud: Option<String>,
}

impl TestTokenBuilder {
    /// Create a new token builder valid for one hour
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            sub: Some("test-subject".to_string()),
            role: Some("user".to_string()),
            exp: Some((now + Duration::seconds(3600)).timestamp()),
            iat: Some(now.timestamp()),
            nbf: None,
            iss: None,
            aud: None,
        }
    }

    /// Set the subject
    pub fn for_user(mut self, subject: &str) -> Self {
        self.sub = Some(subject.to_string());
        self
    }

    /// Set the role claim
    pub fn with_role(mut self, role: &str) -> Self {
        self.role = Some(role.to_string());
        self
    }

    /// Set expiration in seconds from now (negative for already expired)
    pub fn expires_in(mut self, seconds: i64) -> Self {
        self.exp = Some((Utc::now() + Duration::seconds(seconds)).timestamp());
        self
    }

    /// Set an absolute expiration timestamp
    pub fn expires_at(mut self, timestamp: i64) -> Self {
        self.exp = Some(timestamp);
        self
    }

    /// Set issued-at timestamp
    pub fn issued_at(mut self, timestamp: i64) -> Self {
        self.iat = Some(timestamp);
        self
    }

    /// Set not-before timestamp
    pub fn not_before(mut self, timestamp: i64) -> Self {
        self.nbf = Some(timestamp);
        self
    }

    pub fn with_issuer(mut self, issuer: &str) -> Self {
        self.iss = Some(issuer.to_string());
        self
    }

    pub fn with_audience(mut self, audience: &str) -> Self {
        self.aud = Some(audience.to_string());
        self
    }

    pub fn without_subject(mut self) -> Self {
        self.sub = None;
        self
    }

    pub fn without_role(mut self) -> Self {
        self.role = None;
        self
    }

    pub fn without_expiry(mut self) -> Self {
        self.exp = None;
        self
    }

    /// Build the claims as a JSON object, omitting unset claims
    pub fn build(self) -> Value {
        let mut claims = Map::new();
        if let Some(sub) = self.sub {
            claims.insert("sub".to_string(), json!(sub));
        }
        if let Some(role) = self.role {
            claims.insert("role".to_string(), json!(role));
        }
        if let Some(exp) = self.exp {
            claims.insert("exp".to_string(), json!(exp));
        }
        if let Some(iat) = self.iat {
            claims.insert("iat".to_string(), json!(iat));
        }
        if let Some(nbf) = self.nbf {
            claims.insert("nbf".to_string(), json!(nbf));
        }
        if let Some(iss) = self.iss {
            claims.insert("iss".to_string(), json!(iss));
        }
        if let Some(aud) = self.aud {
            claims.insert("aud".to_string(), json!(aud));
        }
        Value::Object(claims)
    }

    /// Sign the claims with RS256 using the given PKCS#1 private key PEM
    ///
    /// # Panics
    /// Panics if the key is not a valid RSA private key.
    pub fn sign(self, private_key_pem: &str) -> String {
        let claims = self.build();
        encode(
            &Header::new(Algorithm::RS256),
            &claims,
            &encoding_key(private_key_pem),
        )
        .expect("signing test token should succeed")
    }
}

impl Default for TestTokenBuilder {
    fn default() -> Self {
        Self::new()
    }
}
