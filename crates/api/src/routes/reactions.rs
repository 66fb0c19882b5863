use axum::routing::get;
use axum::Router;

use crate::handlers::reactions;
use crate::state::AppState;

/// Routes mounted at `/posts`.
///
/// ```text
/// GET  /{id}/reactions -> post_reactions
/// POST /{id}/reactions -> toggle_post_reaction
/// ```
pub fn post_router() -> Router<AppState> {
    Router::new().route(
        "/{id}/reactions",
        get(reactions::post_reactions).post(reactions::toggle_post_reaction),
    )
}

/// Routes mounted at `/comments`.
///
/// ```text
/// GET  /{id}/reactions -> comment_reactions
/// POST /{id}/reactions -> toggle_comment_reaction
/// ```
pub fn comment_router() -> Router<AppState> {
    Router::new().route(
        "/{id}/reactions",
        get(reactions::comment_reactions).post(reactions::toggle_comment_reaction),
    )
}
