//! Shared domain types for the Lifedesk backend.
//!
//! This crate has no internal dependencies so it can be used by the
//! persistence layer, the API server, and any future worker binaries.

pub mod clock;
pub mod error;
pub mod roles;
pub mod types;
