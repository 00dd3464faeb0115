//! Relying-party gateway configuration.
//!
//! Configuration is loaded from environment variables once at startup and
//! injected into the application state. Nothing reads the environment
//! after boot.

use common::jwt::{DEFAULT_CLOCK_SKEW, MAX_CLOCK_SKEW};
use std::collections::HashMap;
use std::env;
use std::time::Duration;
use thiserror::Error;

/// Default issuer key endpoint (the STS service inside the cluster).
pub const DEFAULT_STS_URL: &str = "http://sts-service:80/public-key";

/// Default bind host.
pub const DEFAULT_BIND_HOST: &str = "0.0.0.0";

/// Default listening port.
pub const DEFAULT_PORT: u16 = 3000;

/// Default timeout for the issuer key request in seconds.
pub const DEFAULT_STS_TIMEOUT_SECONDS: u64 = 5;

/// Maximum issuer key request timeout in seconds.
pub const MAX_STS_TIMEOUT_SECONDS: u64 = 60;

/// Maximum trust cache TTL in seconds (1 hour).
pub const MAX_TRUST_CACHE_TTL_SECONDS: u64 = 3600;

/// Default graceful shutdown drain period in seconds.
pub const DEFAULT_DRAIN_SECONDS: u64 = 30;

/// Floor for the per-request timeout applied by the router.
pub const MIN_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Headroom above the worst-case issuer time for verification and I/O.
pub const REQUEST_TIMEOUT_MARGIN: Duration = Duration::from_secs(5);

/// Relying-party gateway configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// URL of the issuer's public key endpoint.
    pub sts_url: String,

    /// Host to bind the HTTP listener to (default: "0.0.0.0").
    pub bind_host: String,

    /// Port to listen on (default: 3000).
    pub port: u16,

    /// Upper bound on connecting to and reading from the issuer.
    pub sts_timeout: Duration,

    /// Trust cache TTL. `None` fetches the issuer key on every request.
    pub trust_cache_ttl: Option<Duration>,

    /// Clock skew tolerance for `exp`, `nbf` and `iat`.
    pub jwt_clock_skew: Duration,

    /// Required `iss` claim, if any.
    pub expected_issuer: Option<String>,

    /// Required `aud` claim, if any.
    pub expected_audience: Option<String>,

    /// Seconds to wait after a shutdown signal before exiting.
    pub drain_seconds: u64,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid STS URL: {0}")]
    InvalidStsUrl(String),

    #[error("Invalid port configuration: {0}")]
    InvalidPort(String),

    #[error("Invalid STS timeout configuration: {0}")]
    InvalidStsTimeout(String),

    #[error("Invalid trust cache TTL configuration: {0}")]
    InvalidTrustCacheTtl(String),

    #[error("Invalid JWT clock skew configuration: {0}")]
    InvalidJwtClockSkew(String),

    #[error("Invalid drain period configuration: {0}")]
    InvalidDrainSeconds(String),
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a HashMap (for testing).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let sts_url = vars
            .get("STS_URL")
            .cloned()
            .unwrap_or_else(|| DEFAULT_STS_URL.to_string());
        validate_sts_url(&sts_url)?;

        let bind_host = vars
            .get("BIND_HOST")
            .cloned()
            .unwrap_or_else(|| DEFAULT_BIND_HOST.to_string());

        let port = if let Some(value_str) = vars.get("PORT") {
            value_str.parse::<u16>().map_err(|e| {
                ConfigError::InvalidPort(format!(
                    "PORT must be an integer between 0 and 65535, got '{}': {}",
                    value_str, e
                ))
            })?
        } else {
            DEFAULT_PORT
        };

        // Parse issuer timeout with validation
        let sts_timeout_seconds = if let Some(value_str) = vars.get("STS_TIMEOUT_SECONDS") {
            let value: u64 = value_str.parse().map_err(|e| {
                ConfigError::InvalidStsTimeout(format!(
                    "STS_TIMEOUT_SECONDS must be a valid positive integer, got '{}': {}",
                    value_str, e
                ))
            })?;

            if value == 0 {
                return Err(ConfigError::InvalidStsTimeout(
                    "STS_TIMEOUT_SECONDS must be greater than 0".to_string(),
                ));
            }

            if value > MAX_STS_TIMEOUT_SECONDS {
                return Err(ConfigError::InvalidStsTimeout(format!(
                    "STS_TIMEOUT_SECONDS must not exceed {} seconds, got {}",
                    MAX_STS_TIMEOUT_SECONDS, value
                )));
            }

            value
        } else {
            DEFAULT_STS_TIMEOUT_SECONDS
        };

        // Parse trust cache TTL; zero keeps the always-fresh baseline
        let trust_cache_ttl = if let Some(value_str) = vars.get("TRUST_CACHE_TTL_SECONDS") {
            let value: u64 = value_str.parse().map_err(|e| {
                ConfigError::InvalidTrustCacheTtl(format!(
                    "TRUST_CACHE_TTL_SECONDS must be a valid non-negative integer, got '{}': {}",
                    value_str, e
                ))
            })?;

            if value > MAX_TRUST_CACHE_TTL_SECONDS {
                return Err(ConfigError::InvalidTrustCacheTtl(format!(
                    "TRUST_CACHE_TTL_SECONDS must not exceed {} seconds, got {}",
                    MAX_TRUST_CACHE_TTL_SECONDS, value
                )));
            }

            (value > 0).then(|| Duration::from_secs(value))
        } else {
            None
        };

        // Parse JWT clock skew tolerance with validation
        let jwt_clock_skew = if let Some(value_str) = vars.get("JWT_CLOCK_SKEW_SECONDS") {
            let value: i64 = value_str.parse().map_err(|e| {
                ConfigError::InvalidJwtClockSkew(format!(
                    "JWT_CLOCK_SKEW_SECONDS must be a valid integer, got '{}': {}",
                    value_str, e
                ))
            })?;

            if value < 0 {
                return Err(ConfigError::InvalidJwtClockSkew(format!(
                    "JWT_CLOCK_SKEW_SECONDS must not be negative, got {}",
                    value
                )));
            }

            let value = value.unsigned_abs();
            if value > MAX_CLOCK_SKEW.as_secs() {
                return Err(ConfigError::InvalidJwtClockSkew(format!(
                    "JWT_CLOCK_SKEW_SECONDS must not exceed {} seconds, got {}",
                    MAX_CLOCK_SKEW.as_secs(),
                    value
                )));
            }

            Duration::from_secs(value)
        } else {
            DEFAULT_CLOCK_SKEW
        };

        let expected_issuer = non_empty(vars.get("JWT_EXPECTED_ISSUER"));
        let expected_audience = non_empty(vars.get("JWT_EXPECTED_AUDIENCE"));

        let drain_seconds = if let Some(value_str) = vars.get("RP_DRAIN_SECONDS") {
            value_str.parse().map_err(|e| {
                ConfigError::InvalidDrainSeconds(format!(
                    "RP_DRAIN_SECONDS must be a valid non-negative integer, got '{}': {}",
                    value_str, e
                ))
            })?
        } else {
            DEFAULT_DRAIN_SECONDS
        };

        Ok(Config {
            sts_url,
            bind_host,
            port,
            sts_timeout: Duration::from_secs(sts_timeout_seconds),
            trust_cache_ttl,
            jwt_clock_skew,
            expected_issuer,
            expected_audience,
            drain_seconds,
        })
    }

    /// Listener address in `host:port` form.
    pub fn bind_address(&self) -> String {
        if self.bind_host.contains(':') {
            format!("[{}]:{}", self.bind_host, self.port)
        } else {
            format!("{}:{}", self.bind_host, self.port)
        }
    }

    /// Per-request timeout for the router.
    ///
    /// A request may fetch the issuer key twice (cached key rejected, then
    /// one refresh), so the bound is two issuer timeouts plus a margin and
    /// never below [`MIN_REQUEST_TIMEOUT`]. An issuer timeout therefore
    /// always surfaces as a 503 denial, not a 408 from the router.
    pub fn request_timeout(&self) -> Duration {
        (self.sts_timeout * 2 + REQUEST_TIMEOUT_MARGIN).max(MIN_REQUEST_TIMEOUT)
    }
}

/// Require an absolute http(s) URL with a host.
fn validate_sts_url(value: &str) -> Result<(), ConfigError> {
    let url = reqwest::Url::parse(value).map_err(|e| {
        ConfigError::InvalidStsUrl(format!("STS_URL must be a valid URL, got '{}': {}", value, e))
    })?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidStsUrl(format!(
            "STS_URL must use http or https, got '{}'",
            url.scheme()
        )));
    }

    if url.host_str().is_none() {
        return Err(ConfigError::InvalidStsUrl(format!(
            "STS_URL must include a host, got '{}'",
            value
        )));
    }

    Ok(())
}

fn non_empty(value: Option<&String>) -> Option<String> {
    value
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
}
