pub mod activities;
pub mod admin;
pub mod health;
pub mod reactions;
pub mod users;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// ```text
/// /activities                     record an activity for the caller
/// /users/{id}/level               rank and points
/// /users/{id}/badges              held badges
/// /users/me/purchase-points/spend spend purchase points
/// /posts/{id}/reactions           toggle / read reactions
/// /comments/{id}/reactions        toggle / read reactions
/// /admin/points/decay             run one decay sweep
/// /admin/users/{id}/purchase-points grant purchase points
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/activities", activities::router())
        .nest("/users", users::router())
        .nest("/posts", reactions::post_router())
        .nest("/comments", reactions::comment_router())
        .nest("/admin", admin::router())
}
