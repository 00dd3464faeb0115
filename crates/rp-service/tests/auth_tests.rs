//! Authorization integration tests.
//!
//! Runs the real gateway against a mocked STS and drives `/secreto`
//! over HTTP with reqwest.

// Test code is allowed to use expect/unwrap for assertions
#![allow(clippy::unwrap_used, clippy::expect_used)]

use anyhow::Result;
use reqwest::StatusCode;
use rp_test_utils::{
    MockIssuer, TestRpServer, TestTokenBuilder, FOREIGN_PRIVATE_KEY_PEM, ISSUER_PRIVATE_KEY_PEM,
};
use std::time::Duration;

/// GET /secreto with an optional raw Authorization header value.
async fn get_secret(server: &TestRpServer, authorization: Option<&str>) -> Result<reqwest::Response> {
    let mut request = reqwest::Client::new().get(format!("{}/secreto", server.url()));
    if let Some(value) = authorization {
        request = request.header(reqwest::header::AUTHORIZATION, value);
    }
    Ok(request.send().await?)
}

async fn error_code(response: reqwest::Response) -> Result<String> {
    let body: serde_json::Value = response.json().await?;
    Ok(body["error"]["code"].as_str().unwrap_or_default().to_string())
}

fn alice_admin_token() -> String {
    TestTokenBuilder::new()
        .for_user("alice")
        .with_role("admin")
        .with_issuer("sts-service-debug")
        .expires_in(3600)
        .sign(ISSUER_PRIVATE_KEY_PEM)
}

// ============================================================================
// Grant
// ============================================================================

#[tokio::test]
async fn test_valid_token_grants_access() -> Result<()> {
    let issuer = MockIssuer::publishing_issuer_key().await;
    let server = TestRpServer::spawn(&issuer.key_url()).await?;

    let response = get_secret(&server, Some(&format!("Bearer {}", alice_admin_token()))).await?;

    assert_eq!(response.status(), StatusCode::OK);
    let body: serde_json::Value = response.json().await?;
    assert_eq!(body["status"], "ACCESO CONCEDIDO");
    assert_eq!(body["data_secreta"], "El código nuclear es 1234");
    assert_eq!(body["usuario_validado"], "alice");
    assert_eq!(body["rol_detectado"], "admin");

    Ok(())
}

#[tokio::test]
async fn test_scheme_is_case_insensitive() -> Result<()> {
    let issuer = MockIssuer::publishing_issuer_key().await;
    let server = TestRpServer::spawn(&issuer.key_url()).await?;
    let token = alice_admin_token();

    for scheme in ["bearer", "BEARER", "BeArEr"] {
        let response = get_secret(&server, Some(&format!("{scheme} {token}"))).await?;
        assert_eq!(response.status(), StatusCode::OK, "scheme {scheme}");
    }

    Ok(())
}

#[tokio::test]
async fn test_missing_role_and_subject_are_null() -> Result<()> {
    let issuer = MockIssuer::publishing_issuer_key().await;
    let server = TestRpServer::spawn(&issuer.key_url()).await?;
    let token = TestTokenBuilder::new()
        .without_subject()
        .without_role()
        .sign(ISSUER_PRIVATE_KEY_PEM);

    let response = get_secret(&server, Some(&format!("Bearer {token}"))).await?;

    assert_eq!(response.status(), StatusCode::OK);
    let body: serde_json::Value = response.json().await?;
    assert!(body["usuario_validado"].is_null());
    assert!(body["rol_detectado"].is_null());

    Ok(())
}

#[tokio::test]
async fn test_key_is_fetched_per_request_without_cache() -> Result<()> {
    let issuer = MockIssuer::publishing_issuer_key().await;
    let server = TestRpServer::spawn(&issuer.key_url()).await?;
    let header = format!("Bearer {}", alice_admin_token());

    for _ in 0..3 {
        let response = get_secret(&server, Some(&header)).await?;
        assert_eq!(response.status(), StatusCode::OK);
    }

    assert_eq!(issuer.key_requests().await, 3);
    Ok(())
}

// ============================================================================
// Header denials
// ============================================================================

#[tokio::test]
async fn test_missing_header_is_401_even_with_issuer_down() -> Result<()> {
    let issuer = MockIssuer::failing(500).await;
    let server = TestRpServer::spawn(&issuer.key_url()).await?;

    let response = get_secret(&server, None).await?;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let challenge = response
        .headers()
        .get(reqwest::header::WWW_AUTHENTICATE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    assert!(challenge.starts_with("Bearer realm=\"rp-service\""));
    assert!(challenge.contains("error=\"invalid_request\""));
    assert_eq!(error_code(response).await?, "MissingHeader");

    // Header faults never reach the issuer
    assert_eq!(issuer.key_requests().await, 0);
    Ok(())
}

#[tokio::test]
async fn test_malformed_header_is_401() -> Result<()> {
    let issuer = MockIssuer::publishing_issuer_key().await;
    let server = TestRpServer::spawn(&issuer.key_url()).await?;

    for raw in ["Bearer", "Bearer a b", "justatoken"] {
        let response = get_secret(&server, Some(raw)).await?;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "header {raw:?}");
        assert_eq!(error_code(response).await?, "MalformedHeader");
    }

    Ok(())
}

#[tokio::test]
async fn test_non_ascii_header_is_malformed() -> Result<()> {
    let issuer = MockIssuer::publishing_issuer_key().await;
    let server = TestRpServer::spawn(&issuer.key_url()).await?;

    // Valid "<scheme> <token>" shape, but the token carries a 0xFF byte
    let response = reqwest::Client::new()
        .get(format!("{}/secreto", server.url()))
        .header(
            reqwest::header::AUTHORIZATION,
            reqwest::header::HeaderValue::from_bytes(b"Bearer \xfftoken")?,
        )
        .send()
        .await?;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(response
        .headers()
        .contains_key(reqwest::header::WWW_AUTHENTICATE));
    assert_eq!(error_code(response).await?, "MalformedHeader");
    assert_eq!(issuer.key_requests().await, 0);

    Ok(())
}

#[tokio::test]
async fn test_basic_scheme_is_unsupported() -> Result<()> {
    let issuer = MockIssuer::publishing_issuer_key().await;
    let server = TestRpServer::spawn(&issuer.key_url()).await?;

    let response = get_secret(&server, Some("Basic dXNlcjpwYXNz")).await?;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body: serde_json::Value = response.json().await?;
    assert_eq!(body["error"]["code"], "UnsupportedScheme");
    assert_eq!(
        body["error"]["message"],
        "Formato inválido. Usa 'Bearer <token>'"
    );

    Ok(())
}

// ============================================================================
// Token denials
// ============================================================================

#[tokio::test]
async fn test_expired_token_is_401_expired() -> Result<()> {
    let issuer = MockIssuer::publishing_issuer_key().await;
    let server = TestRpServer::spawn(&issuer.key_url()).await?;
    let token = TestTokenBuilder::new()
        .for_user("alice")
        .expires_in(-3600)
        .sign(ISSUER_PRIVATE_KEY_PEM);

    let response = get_secret(&server, Some(&format!("Bearer {token}"))).await?;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let challenge = response
        .headers()
        .get(reqwest::header::WWW_AUTHENTICATE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    assert!(challenge.contains("error=\"invalid_token\""));
    let body: serde_json::Value = response.json().await?;
    assert_eq!(body["error"]["code"], "Expired");
    assert_eq!(body["error"]["message"], "El token ha caducado");

    Ok(())
}

#[tokio::test]
async fn test_foreign_signature_is_invalid_token() -> Result<()> {
    let issuer = MockIssuer::publishing_issuer_key().await;
    let server = TestRpServer::spawn(&issuer.key_url()).await?;
    let token = TestTokenBuilder::new()
        .for_user("mallory")
        .with_role("admin")
        .sign(FOREIGN_PRIVATE_KEY_PEM);

    let response = get_secret(&server, Some(&format!("Bearer {token}"))).await?;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body: serde_json::Value = response.json().await?;
    assert_eq!(body["error"]["code"], "InvalidToken");
    let message = body["error"]["message"].as_str().unwrap_or_default();
    assert!(message.starts_with("Token inválido: "), "got {message:?}");

    Ok(())
}

#[tokio::test]
async fn test_garbage_token_is_invalid_token() -> Result<()> {
    let issuer = MockIssuer::publishing_issuer_key().await;
    let server = TestRpServer::spawn(&issuer.key_url()).await?;

    let response = get_secret(&server, Some("Bearer not.a.jwt")).await?;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(error_code(response).await?, "InvalidToken");
    Ok(())
}

#[tokio::test]
async fn test_expected_issuer_rejects_other_issuers() -> Result<()> {
    let issuer = MockIssuer::publishing_issuer_key().await;
    let server = TestRpServer::spawn_with(
        &issuer.key_url(),
        &[("JWT_EXPECTED_ISSUER", "sts-service-debug")],
    )
    .await?;

    let good = get_secret(&server, Some(&format!("Bearer {}", alice_admin_token()))).await?;
    assert_eq!(good.status(), StatusCode::OK);

    let other = TestTokenBuilder::new()
        .for_user("alice")
        .with_issuer("someone-else")
        .sign(ISSUER_PRIVATE_KEY_PEM);
    let response = get_secret(&server, Some(&format!("Bearer {other}"))).await?;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(error_code(response).await?, "InvalidToken");

    Ok(())
}

// ============================================================================
// Trust denials
// ============================================================================

#[tokio::test]
async fn test_unreachable_issuer_is_503() -> Result<()> {
    // Nothing listens on the discard port
    let server = TestRpServer::spawn("http://127.0.0.1:9/public-key").await?;

    let response = get_secret(&server, Some(&format!("Bearer {}", alice_admin_token()))).await?;

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert!(response
        .headers()
        .get(reqwest::header::WWW_AUTHENTICATE)
        .is_none());
    let body: serde_json::Value = response.json().await?;
    assert_eq!(body["error"]["code"], "TrustUnavailable");
    assert_eq!(
        body["error"]["message"],
        "El STS no responde, no puedo validarte."
    );

    Ok(())
}

#[tokio::test]
async fn test_issuer_error_status_is_503() -> Result<()> {
    let issuer = MockIssuer::failing(500).await;
    let server = TestRpServer::spawn(&issuer.key_url()).await?;

    let response = get_secret(&server, Some(&format!("Bearer {}", alice_admin_token()))).await?;

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(error_code(response).await?, "TrustUnavailable");
    Ok(())
}

#[tokio::test]
async fn test_issuer_without_key_field_is_503() -> Result<()> {
    let issuer = MockIssuer::without_key_field().await;
    let server = TestRpServer::spawn(&issuer.key_url()).await?;

    let response = get_secret(&server, Some(&format!("Bearer {}", alice_admin_token()))).await?;

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    Ok(())
}

#[tokio::test]
async fn test_slow_issuer_times_out_as_503() -> Result<()> {
    let issuer = MockIssuer::delayed(Duration::from_secs(3)).await;
    let server = TestRpServer::spawn(&issuer.key_url()).await?;

    let started = std::time::Instant::now();
    let response = get_secret(&server, Some(&format!("Bearer {}", alice_admin_token()))).await?;

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    // Harness sets a one second issuer timeout
    assert!(started.elapsed() < Duration::from_secs(3));
    Ok(())
}

#[tokio::test]
async fn test_home_does_not_need_issuer() -> Result<()> {
    let issuer = MockIssuer::failing(500).await;
    let server = TestRpServer::spawn(&issuer.key_url()).await?;

    let response = reqwest::get(format!("{}/", server.url())).await?;

    assert_eq!(response.status(), StatusCode::OK);
    let body: serde_json::Value = response.json().await?;
    assert_eq!(body["message"], "Soy la App Tonta. Usa /secreto con un token.");
    assert_eq!(issuer.key_requests().await, 0);
    Ok(())
}
