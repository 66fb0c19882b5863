//! Repository for the append-only `activity_records` table.

use crewhub_core::activity::ActivityType;
use crewhub_core::types::DbId;
use sqlx::{PgConnection, PgPool};

use crate::models::activity::ActivityRecord;

const COLUMNS: &str = "id, user_id, activity_type, points, reference_id, created_at";

pub struct ActivityRepo;

impl ActivityRepo {
    pub async fn insert(
        conn: &mut PgConnection,
        user_id: DbId,
        activity_type: ActivityType,
        points: f64,
        reference_id: Option<DbId>,
    ) -> Result<ActivityRecord, sqlx::Error> {
        let query = format!(
            "INSERT INTO activity_records (user_id, activity_type, points, reference_id) \
             VALUES ($1, $2, $3, $4) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ActivityRecord>(&query)
            .bind(user_id)
            .bind(activity_type.as_str())
            .bind(points)
            .bind(reference_id)
            .fetch_one(conn)
            .await
    }

    /// Number of recorded activities of one type for a user.
    pub async fn count_for_user(
        conn: &mut PgConnection,
        user_id: DbId,
        activity_type: ActivityType,
    ) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT COUNT(*) FROM activity_records WHERE user_id = $1 AND activity_type = $2",
        )
        .bind(user_id)
        .bind(activity_type.as_str())
        .fetch_one(conn)
        .await
    }

    /// Most recent activities for a user, newest first.
    pub async fn list_recent_for_user(
        pool: &PgPool,
        user_id: DbId,
        limit: i64,
    ) -> Result<Vec<ActivityRecord>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM activity_records WHERE user_id = $1 \
             ORDER BY created_at DESC, id DESC LIMIT $2"
        );
        sqlx::query_as::<_, ActivityRecord>(&query)
            .bind(user_id)
            .bind(limit)
            .fetch_all(pool)
            .await
    }
}
