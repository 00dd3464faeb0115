//! HTTP request handlers for the relying-party gateway.

pub mod health;
pub mod home;
pub mod metrics;
pub mod secret;

pub use health::{health_check, readiness_check};
pub use home::home;
pub use metrics::metrics_handler;
pub use secret::get_secret;
