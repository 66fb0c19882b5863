//! Identity of whoever reacts to a post or comment.

use std::net::SocketAddr;

use axum::extract::{ConnectInfo, FromRequestParts};
use axum::http::request::Parts;
use crewhub_core::likes::Actor;

use super::auth::AuthUser;
use crate::error::AppError;
use crate::state::AppState;

/// The authenticated user, or the client IP for anonymous callers.
///
/// The IP comes from the first `X-Forwarded-For` entry when the server is
/// configured to trust it, otherwise from the socket peer address.
#[derive(Debug, Clone)]
pub struct ReactionActor(pub Actor);

impl FromRequestParts<AppState> for ReactionActor {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        if let Some(user) = AuthUser::from_headers(parts, state)? {
            return Ok(ReactionActor(Actor::User(user.user_id)));
        }

        if state.config.trust_forwarded_for {
            let forwarded = parts
                .headers
                .get("x-forwarded-for")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.split(',').next())
                .map(str::trim)
                .filter(|v| !v.is_empty());
            if let Some(ip) = forwarded {
                return Ok(ReactionActor(Actor::ip(ip)?));
            }
        }

        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip())
            .ok_or_else(|| AppError::BadRequest("Unable to determine client address".into()))?;
        Ok(ReactionActor(Actor::Ip(peer.to_string())))
    }
}
