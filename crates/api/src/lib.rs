//! Crewhub HTTP API library.
//!
//! Exposes config, state, error handling and the router so integration
//! tests and the binary entrypoint share one construction path.

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod response;
pub mod router;
pub mod routes;
pub mod state;
