//! Administrative operations.

use axum::extract::{Path, State};
use axum::Json;
use crewhub_core::types::DbId;
use crewhub_db::models::user_level::UserLevel;
use crewhub_points::{DecaySweepReport, PurchasePoints};
use validator::Validate;

use crate::error::AppResult;
use crate::handlers::levels::PurchasePointsRequest;
use crate::middleware::rbac::RequireAdmin;
use crate::response::DataResponse;
use crate::state::AppState;

/// POST /api/v1/admin/points/decay
///
/// Runs one decay sweep now and returns its report.
pub async fn run_decay(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<DecaySweepReport>>> {
    tracing::info!(admin_id = admin.user_id, "Manual decay sweep requested");
    let report = state.decay.apply_inactivity_decay().await?;
    Ok(Json(DataResponse { data: report }))
}

/// POST /api/v1/admin/users/{id}/purchase-points
pub async fn grant_purchase_points(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(user_id): Path<DbId>,
    Json(input): Json<PurchasePointsRequest>,
) -> AppResult<Json<DataResponse<UserLevel>>> {
    input.validate()?;
    let level = PurchasePoints::grant(&state.pool, user_id, input.amount).await?;

    tracing::info!(
        admin_id = admin.user_id,
        user_id,
        amount = input.amount,
        balance = level.purchase_points,
        "Purchase points granted"
    );
    Ok(Json(DataResponse { data: level }))
}
