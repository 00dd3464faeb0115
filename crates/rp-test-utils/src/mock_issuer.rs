//! Mock STS for tests
//!
//! Wraps a wiremock server that publishes (or fails to publish) the
//! issuer's public key at `/public-key`, the way the real STS does.

use crate::crypto_fixtures::ISSUER_PUBLIC_KEY_PEM;
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Path the STS serves its key on.
pub const PUBLIC_KEY_PATH: &str = "/public-key";

/// A running mock issuer.
///
/// # Example
/// ```rust,ignore
/// let issuer = MockIssuer::publishing_issuer_key().await;
/// let server = TestRpServer::spawn(&issuer.key_url()).await?;
/// ```
pub struct MockIssuer {
    server: MockServer,
}

impl MockIssuer {
    /// Start an issuer with no routes mounted (every request is a 404).
    pub async fn start() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    /// Start an issuer publishing [`ISSUER_PUBLIC_KEY_PEM`].
    pub async fn publishing_issuer_key() -> Self {
        Self::publishing(ISSUER_PUBLIC_KEY_PEM).await
    }

    /// Start an issuer publishing `pem`.
    pub async fn publishing(pem: &str) -> Self {
        let issuer = Self::start().await;
        issuer.mount_key(pem).await;
        issuer
    }

    /// Start an issuer answering every key request with `status`.
    pub async fn failing(status: u16) -> Self {
        let issuer = Self::start().await;
        issuer.fail_with(status).await;
        issuer
    }

    /// Start an issuer whose 200 body lacks the `public_key` field.
    pub async fn without_key_field() -> Self {
        let issuer = Self::start().await;
        Mock::given(method("GET"))
            .and(path(PUBLIC_KEY_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": "ok" })))
            .mount(&issuer.server)
            .await;
        issuer
    }

    /// Start an issuer that publishes its key only after `delay`.
    pub async fn delayed(delay: Duration) -> Self {
        let issuer = Self::start().await;
        Mock::given(method("GET"))
            .and(path(PUBLIC_KEY_PATH))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "public_key": ISSUER_PUBLIC_KEY_PEM }))
                    .set_delay(delay),
            )
            .mount(&issuer.server)
            .await;
        issuer
    }

    /// Replace whatever is mounted with a route publishing `pem`.
    pub async fn rotate_to(&self, pem: &str) {
        self.server.reset().await;
        self.mount_key(pem).await;
    }

    /// Replace whatever is mounted with a route answering `status`.
    pub async fn fail_with(&self, status: u16) {
        self.server.reset().await;
        Mock::given(method("GET"))
            .and(path(PUBLIC_KEY_PATH))
            .respond_with(ResponseTemplate::new(status))
            .mount(&self.server)
            .await;
    }

    async fn mount_key(&self, pem: &str) {
        Mock::given(method("GET"))
            .and(path(PUBLIC_KEY_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "public_key": pem })))
            .mount(&self.server)
            .await;
    }

    /// Full URL of the key endpoint, suitable for `STS_URL`.
    pub fn key_url(&self) -> String {
        format!("{}{}", self.server.uri(), PUBLIC_KEY_PATH)
    }

    /// Number of key requests the issuer has received.
    pub async fn key_requests(&self) -> usize {
        self.server
            .received_requests()
            .await
            .map(|requests| {
                requests
                    .iter()
                    .filter(|r| r.url.path() == PUBLIC_KEY_PATH)
                    .count()
            })
            .unwrap_or(0)
    }
}
