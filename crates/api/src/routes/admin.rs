use axum::routing::post;
use axum::Router;

use crate::handlers::admin;
use crate::state::AppState;

/// Routes mounted at `/admin`.
///
/// ```text
/// POST /points/decay                 -> run_decay
/// POST /users/{id}/purchase-points   -> grant_purchase_points
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/points/decay", post(admin::run_decay))
        .route("/users/{id}/purchase-points", post(admin::grant_purchase_points))
}
