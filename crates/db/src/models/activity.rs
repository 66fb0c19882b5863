//! Append-only activity records.

use crewhub_core::activity::ActivityType;
use crewhub_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `activity_records` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ActivityRecord {
    pub id: DbId,
    pub user_id: DbId,
    #[sqlx(try_from = "String")]
    pub activity_type: ActivityType,
    pub points: f64,
    pub reference_id: Option<DbId>,
    pub created_at: Timestamp,
}
