//! Service layer for the relying-party gateway.
//!
//! Services sit between handlers and the auth components. Handlers stay
//! thin; the decision logic lives here.

pub mod gateway;

pub use gateway::{AuthorizationDecision, Gateway};
