use axum::routing::{get, post};
use axum::Router;

use crate::handlers::levels;
use crate::state::AppState;

/// Routes mounted at `/users`.
///
/// ```text
/// GET  /{id}/level                 -> get_level
/// GET  /{id}/badges                -> list_badges
/// POST /me/purchase-points/spend   -> spend_purchase_points
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/{id}/level", get(levels::get_level))
        .route("/{id}/badges", get(levels::list_badges))
        .route("/me/purchase-points/spend", post(levels::spend_purchase_points))
}
