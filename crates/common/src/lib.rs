//! Common utilities shared across the relying-party gateway crates.

#![warn(clippy::pedantic)]

/// Module for JWT utilities (structure checks, time claims, constants)
pub mod jwt;
