//! Activity recording for the authenticated caller.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use crewhub_core::activity::ActivityType;
use crewhub_core::rank::RankTransition;
use crewhub_core::types::DbId;
use crewhub_db::models::activity::ActivityRecord;
use crewhub_db::models::user_level::UserLevel;
use crewhub_points::AwardedBadge;
use serde::{Deserialize, Serialize};

use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordActivityRequest {
    /// One of the `SCREAMING_SNAKE_CASE` activity names.
    pub activity_type: String,
    pub reference_id: Option<DbId>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordActivityResponse {
    pub record: ActivityRecord,
    pub level: UserLevel,
    pub rank_change: Option<RankTransition>,
    pub awarded_badges: Vec<AwardedBadge>,
}

/// POST /api/v1/activities
pub async fn record_activity(
    user: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<RecordActivityRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<RecordActivityResponse>>)> {
    let activity: ActivityType = input.activity_type.parse()?;

    let outcome = state
        .ledger
        .record_activity(user.user_id, activity, input.reference_id)
        .await?;

    tracing::info!(
        user_id = user.user_id,
        activity = %activity,
        points = outcome.record.points,
        rank = %outcome.level.rank,
        "Activity recorded"
    );

    Ok((
        StatusCode::CREATED,
        Json(DataResponse {
            data: RecordActivityResponse {
                record: outcome.record,
                level: outcome.level,
                rank_change: outcome.transition,
                awarded_badges: outcome.awarded_badges,
            },
        }),
    ))
}
