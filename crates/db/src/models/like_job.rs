//! Durable like job queue rows.

use crewhub_core::likes::LikeJobPayload;
use crewhub_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::types::Json;
use sqlx::FromRow;

use super::status::StatusId;

/// A row from the `like_jobs` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct LikeJob {
    pub id: DbId,
    pub job_key: String,
    pub payload: Json<LikeJobPayload>,
    pub status_id: StatusId,
    pub attempt_count: i16,
    pub max_attempts: i16,
    pub next_retry_at: Option<Timestamp>,
    pub claimed_at: Option<Timestamp>,
    pub completed_at: Option<Timestamp>,
    pub last_error: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}
