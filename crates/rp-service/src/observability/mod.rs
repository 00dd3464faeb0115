//! Observability for the relying-party gateway.
//!
//! Provides metric definitions and the Prometheus recorder setup.

pub mod metrics;
