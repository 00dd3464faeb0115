//! # RP Test Utilities
//!
//! Shared test utilities for the relying-party gateway.
//!
//! This crate provides:
//! - Fixed RSA keypairs (issuer and foreign)
//! - Test token builder (`TestTokenBuilder`)
//! - Mock STS publishing a public key (`MockIssuer`)
//! - Server test harness (`TestRpServer` for E2E tests)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use rp_test_utils::*;
//!
//! #[tokio::test]
//! async fn test_example() -> Result<()> {
//!     let issuer = MockIssuer::publishing_issuer_key().await;
//!     let server = TestRpServer::spawn(&issuer.key_url()).await?;
//!
//!     let token = TestTokenBuilder::new()
//!         .for_user("alice")
//!         .with_role("admin")
//!         .sign(ISSUER_PRIVATE_KEY_PEM);
//!
//!     let response = reqwest::Client::new()
//!         .get(format!("{}/secreto", server.url()))
//!         .bearer_auth(token)
//!         .send()
//!         .await?;
//!
//!     assert_eq!(response.status(), 200);
//!     Ok(())
//! }
//! ```

pub mod crypto_fixtures;
pub mod mock_issuer;
pub mod server_harness;
pub mod token_builders;

// Re-export commonly used items
pub use crypto_fixtures::*;
pub use mock_issuer::*;
pub use server_harness::*;
pub use token_builders::*;
