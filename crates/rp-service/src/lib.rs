//! Relying-party gateway library.
//!
//! A small HTTP service that protects one resource behind RS256 bearer
//! tokens. The issuer (STS) publishes its public key over HTTP; the
//! gateway fetches it, verifies each presented token against it and
//! either grants access or returns a typed denial.
//!
//! # Architecture
//!
//! ```text
//! routes/mod.rs -> middleware/auth.rs -> services/gateway.rs -> auth/*.rs
//! ```
//!
//! # Modules
//!
//! - `auth` - Trust resolution, bearer parsing and token verification
//! - `config` - Service configuration from environment
//! - `errors` - Denials with HTTP status code mapping
//! - `handlers` - HTTP request handlers
//! - `middleware` - Authorization gate and HTTP metrics
//! - `models` - Response bodies
//! - `observability` - Metrics definitions
//! - `routes` - Axum router setup
//! - `services` - Authorization decisions

pub mod auth;
pub mod config;
pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod observability;
pub mod routes;
pub mod services;
