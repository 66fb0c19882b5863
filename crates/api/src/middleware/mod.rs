//! Request extractors for identity and authorization.
//!
//! - [`auth::AuthUser`] -- the authenticated user from a Bearer token.
//! - [`rbac::RequireAdmin`] -- requires the `admin` role.
//! - [`actor::ReactionActor`] -- the user if authenticated, else the client IP.

pub mod actor;
pub mod auth;
pub mod rbac;
