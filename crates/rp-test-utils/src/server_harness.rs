//! Test server harness for E2E testing
//!
//! Provides `TestRpServer` for spawning real gateway instances in tests.

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use rp_service::config::Config;
use rp_service::routes::{self, AppState};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Test harness for spawning the relying-party gateway in E2E tests.
///
/// # Example
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_secret_flow_e2e() -> Result<()> {
///     let issuer = MockIssuer::publishing_issuer_key().await;
///     let server = TestRpServer::spawn(&issuer.key_url()).await?;
///
///     let response = reqwest::get(format!("{}/", server.url())).await?;
///
///     assert_eq!(response.status(), 200);
///     Ok(())
/// }
/// ```
pub struct TestRpServer {
    addr: SocketAddr,
    config: Config,
    _handle: JoinHandle<()>,
}

impl TestRpServer {
    /// Spawn a gateway trusting the key published at `sts_url`.
    pub async fn spawn(sts_url: &str) -> Result<Self, anyhow::Error> {
        Self::spawn_with(sts_url, &[]).await
    }

    /// Spawn a gateway with extra configuration variables.
    ///
    /// The server binds to a random port on 127.0.0.1 and uses a
    /// one-second issuer timeout unless `extra` overrides it.
    pub async fn spawn_with(sts_url: &str, extra: &[(&str, &str)]) -> Result<Self, anyhow::Error> {
        let mut vars = HashMap::from([
            ("STS_URL".to_string(), sts_url.to_string()),
            ("BIND_HOST".to_string(), "127.0.0.1".to_string()),
            ("PORT".to_string(), "0".to_string()),
            ("STS_TIMEOUT_SECONDS".to_string(), "1".to_string()),
            ("RP_DRAIN_SECONDS".to_string(), "0".to_string()),
        ]);
        for (key, value) in extra {
            vars.insert((*key).to_string(), (*value).to_string());
        }

        let config = Config::from_vars(&vars)
            .map_err(|e| anyhow::anyhow!("Failed to create config: {}", e))?;

        let state = Arc::new(
            AppState::from_config(config.clone())
                .map_err(|e| anyhow::anyhow!("Failed to build app state: {}", e))?,
        );

        let app = routes::build_routes(state, metrics_handle());

        let listener = routes::bind_listener(&config)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind test server: {}", e))?;

        let addr = listener
            .local_addr()
            .map_err(|e| anyhow::anyhow!("Failed to get local address: {}", e))?;

        let handle = tokio::spawn(async move {
            let make_service = app.into_make_service_with_connect_info::<SocketAddr>();
            if let Err(e) = axum::serve(listener, make_service).await {
                eprintln!("Test server error: {}", e);
            }
        });

        Ok(Self {
            addr,
            config,
            _handle: handle,
        })
    }

    /// Get the base URL of the test server.
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn config(&self) -> &Config {
        &self.config
    }
}

impl Drop for TestRpServer {
    fn drop(&mut self) {
        self._handle.abort();
    }
}

/// Handle from a recorder that is never installed globally, so any number
/// of servers can be spawned in one test binary.
fn metrics_handle() -> PrometheusHandle {
    PrometheusBuilder::new().build_recorder().handle()
}
