//! HTTP routes for the relying-party gateway.
//!
//! Defines the Axum router and application state.

use crate::auth::{build_token_verifier, build_trust_resolver, TrustError, TrustResolver};
use crate::config::Config;
use crate::handlers;
use crate::middleware::{http_metrics_middleware, require_auth, AuthState};
use crate::services::Gateway;
use axum::{middleware, routing::get, Router};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Service configuration.
    pub config: Config,

    /// Trust resolver, shared with the gateway and the readiness probe.
    pub resolver: Arc<dyn TrustResolver>,

    /// Authorization gateway for protected routes.
    pub gateway: Arc<Gateway>,
}

impl AppState {
    /// Build state with the resolver chain and verifier `config` describes.
    ///
    /// # Errors
    ///
    /// Returns `TrustError::ClientBuild` if the HTTP client cannot be built.
    pub fn from_config(config: Config) -> Result<Self, TrustError> {
        let resolver = build_trust_resolver(&config)?;
        Ok(Self::with_resolver(config, resolver))
    }

    /// Build state around an explicit trust resolver.
    pub fn with_resolver(config: Config, resolver: Arc<dyn TrustResolver>) -> Self {
        let verifier = build_token_verifier(&config);
        let gateway = Arc::new(Gateway::new(resolver.clone(), verifier));
        Self {
            config,
            resolver,
            gateway,
        }
    }
}

/// Build the application routes.
///
/// Creates an Axum router with:
/// - `/` - Static landing message - public
/// - `/secreto` - Protected resource - requires a valid bearer token
/// - `/health` - Liveness probe (simple "OK") - public
/// - `/ready` - Readiness probe (issuer key resolves) - public
/// - `/metrics` - Prometheus metrics endpoint - public
/// - TraceLayer for request logging
/// - HTTP metrics middleware
/// - Request timeout from [`Config::request_timeout`]
pub fn build_routes(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let request_timeout = state.config.request_timeout();
    let auth_state = Arc::new(AuthState {
        gateway: state.gateway.clone(),
    });

    let public_routes = Router::new()
        .route("/", get(handlers::home))
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .with_state(state);

    let metrics_routes = Router::new()
        .route("/metrics", get(handlers::metrics_handler))
        .with_state(metrics_handle);

    let protected_routes = Router::new()
        .route("/secreto", get(handlers::get_secret))
        .route_layer(middleware::from_fn_with_state(auth_state, require_auth));

    // Layer order (bottom-to-top execution):
    // 1. TimeoutLayer - Timeout the request (innermost)
    // 2. TraceLayer - Log request details
    // 3. http_metrics_middleware - Record ALL responses (outermost)
    public_routes
        .merge(metrics_routes)
        .merge(protected_routes)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(request_timeout))
        .layer(middleware::from_fn(http_metrics_middleware))
}

/// Bind the HTTP listener to the configured host and port.
///
/// The host may be an IPv4 or IPv6 literal or a hostname resolved by the
/// system resolver.
///
/// # Errors
///
/// Returns the I/O error if the host does not resolve or the bind fails.
pub async fn bind_listener(config: &Config) -> std::io::Result<TcpListener> {
    TcpListener::bind((config.bind_host.as_str(), config.port)).await
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::auth::TrustMaterial;
    use async_trait::async_trait;
    use axum::{
        body::Body,
        http::{header::AUTHORIZATION, Request, StatusCode},
    };
    use http_body_util::BodyExt;
    use metrics_exporter_prometheus::PrometheusBuilder;
    use rp_test_utils::crypto_fixtures::{ISSUER_PRIVATE_KEY_PEM, ISSUER_PUBLIC_KEY_PEM};
    use rp_test_utils::token_builders::TestTokenBuilder;
    use std::collections::HashMap;
    use std::time::Duration;
    use tower::ServiceExt;

    struct StaticResolver(Option<&'static str>);

    #[async_trait]
    impl TrustResolver for StaticResolver {
        async fn resolve_trust(&self) -> Result<TrustMaterial, TrustError> {
            match self.0 {
                Some(pem) => TrustMaterial::from_pem(pem),
                None => Err(TrustError::Timeout),
            }
        }

        fn issuer(&self) -> &str {
            "static"
        }
    }

    fn app(pem: Option<&'static str>) -> Router {
        let config = Config::from_vars(&HashMap::new()).unwrap();
        let state = Arc::new(AppState::with_resolver(
            config,
            Arc::new(StaticResolver(pem)),
        ));
        // A handle from an uninstalled recorder is enough to serve /metrics
        let handle = PrometheusBuilder::new().build_recorder().handle();
        build_routes(state, handle)
    }

    async fn send(router: Router, uri: &str, auth: Option<&str>) -> (StatusCode, Vec<u8>) {
        let mut builder = Request::builder().uri(uri);
        if let Some(auth) = auth {
            builder = builder.header(AUTHORIZATION, auth);
        }
        let response = router
            .oneshot(builder.body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        (status, body.to_vec())
    }

    /// Issuer that answers only after a delay, then reports a timeout.
    struct SlowResolver(Duration);

    #[async_trait]
    impl TrustResolver for SlowResolver {
        async fn resolve_trust(&self) -> Result<TrustMaterial, TrustError> {
            tokio::time::sleep(self.0).await;
            Err(TrustError::Timeout)
        }

        fn issuer(&self) -> &str {
            "slow"
        }
    }

    #[test]
    fn test_app_state_is_clone() {
        fn assert_clone<T: Clone>() {}
        assert_clone::<AppState>();
    }

    #[tokio::test]
    async fn test_home_is_public_even_without_issuer() {
        let (status, body) = send(app(None), "/", None).await;
        assert_eq!(status, StatusCode::OK);
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["message"], "Soy la App Tonta. Usa /secreto con un token.");
    }

    #[tokio::test]
    async fn test_secreto_grants_valid_token() {
        let token = TestTokenBuilder::new().for_user("alice")
            .with_role("admin")
            .sign(ISSUER_PRIVATE_KEY_PEM);
        let (status, body) = send(
            app(Some(ISSUER_PUBLIC_KEY_PEM)),
            "/secreto",
            Some(&format!("Bearer {token}")),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["status"], "ACCESO CONCEDIDO");
        assert_eq!(json["usuario_validado"], "alice");
        assert_eq!(json["rol_detectado"], "admin");
    }

    #[tokio::test]
    async fn test_secreto_without_header_is_401() {
        let (status, body) = send(app(Some(ISSUER_PUBLIC_KEY_PEM)), "/secreto", None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"]["code"], "MissingHeader");
    }

    #[tokio::test]
    async fn test_secreto_with_issuer_down_is_503() {
        let token = TestTokenBuilder::new().for_user("alice").sign(ISSUER_PRIVATE_KEY_PEM);
        let (status, _) = send(app(None), "/secreto", Some(&format!("Bearer {token}"))).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_issuer_beyond_thirty_seconds_is_503_not_408() {
        let config = Config::from_vars(&HashMap::from([(
            "STS_TIMEOUT_SECONDS".to_string(),
            "40".to_string(),
        )]))
        .unwrap();
        let state = Arc::new(AppState::with_resolver(
            config,
            Arc::new(SlowResolver(Duration::from_secs(40))),
        ));
        let handle = PrometheusBuilder::new().build_recorder().handle();
        let token = TestTokenBuilder::new().for_user("alice").sign(ISSUER_PRIVATE_KEY_PEM);

        let (status, body) = send(
            build_routes(state, handle),
            "/secreto",
            Some(&format!("Bearer {token}")),
        )
        .await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"]["code"], "TrustUnavailable");
    }

    #[tokio::test]
    async fn test_bind_listener_accepts_hostnames() {
        let config = Config::from_vars(&HashMap::from([
            ("BIND_HOST".to_string(), "localhost".to_string()),
            ("PORT".to_string(), "0".to_string()),
        ]))
        .unwrap();

        let listener = bind_listener(&config).await.unwrap();
        assert!(listener.local_addr().unwrap().ip().is_loopback());
    }

    #[tokio::test]
    async fn test_ready_tracks_issuer() {
        let (status, _) = send(app(Some(ISSUER_PUBLIC_KEY_PEM)), "/ready", None).await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = send(app(None), "/ready", None).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["status"], "not_ready");
    }

    #[tokio::test]
    async fn test_health_and_metrics_are_public() {
        let (status, body) = send(app(None), "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, b"OK");

        let (status, _) = send(app(None), "/metrics", None).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_unknown_route_is_404() {
        let (status, _) = send(app(None), "/admin", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
