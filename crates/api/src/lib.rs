//! Lifedesk API server library.
//!
//! Exposes the authentication building blocks (token codec, session
//! registry, authenticator, access guard) together with config, state, error
//! handling, and routes so integration tests and the binary entrypoint can
//! both access them.

pub mod auth;
pub mod background;
pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod response;
pub mod router;
pub mod routes;
pub mod state;
