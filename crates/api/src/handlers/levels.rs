//! Level, badge and purchase-point handlers.

use axum::extract::{Path, State};
use axum::Json;
use crewhub_core::types::DbId;
use crewhub_db::models::badge::UserBadgeDetail;
use crewhub_db::models::user_level::UserLevel;
use crewhub_points::PurchasePoints;
use serde::Deserialize;
use validator::Validate;

use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct PurchasePointsRequest {
    #[validate(range(min = 1, message = "amount must be positive"))]
    pub amount: i64,
}

/// GET /api/v1/users/{id}/level
///
/// Creates the level at the lowest rank on first access.
pub async fn get_level(
    State(state): State<AppState>,
    Path(user_id): Path<DbId>,
) -> AppResult<Json<DataResponse<UserLevel>>> {
    let level = state.ledger.get_level(user_id).await?;
    Ok(Json(DataResponse { data: level }))
}

/// GET /api/v1/users/{id}/badges
pub async fn list_badges(
    State(state): State<AppState>,
    Path(user_id): Path<DbId>,
) -> AppResult<Json<DataResponse<Vec<UserBadgeDetail>>>> {
    let badges = state.ledger.list_badges(user_id).await?;
    Ok(Json(DataResponse { data: badges }))
}

/// POST /api/v1/users/me/purchase-points/spend
pub async fn spend_purchase_points(
    user: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<PurchasePointsRequest>,
) -> AppResult<Json<DataResponse<UserLevel>>> {
    input.validate()?;
    let level = PurchasePoints::spend(&state.pool, user.user_id, input.amount).await?;

    tracing::info!(
        user_id = user.user_id,
        amount = input.amount,
        remaining = level.purchase_points,
        "Purchase points spent"
    );
    Ok(Json(DataResponse { data: level }))
}
