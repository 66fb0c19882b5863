//! Repository for the `badges` catalog and `user_badges`.

use crewhub_core::activity::ActivityType;
use crewhub_core::badge::BadgeProgress;
use crewhub_core::types::DbId;
use sqlx::types::Json;
use sqlx::{PgConnection, PgPool};

use crate::models::badge::{Badge, CreateBadge, UserBadgeDetail};

const COLUMNS: &str = "\
    id, name, description, badge_type, category, requirements, is_hidden, \
    created_at, updated_at";

pub struct BadgeRepo;

impl BadgeRepo {
    /// Add a badge to the catalog.
    pub async fn create(pool: &PgPool, input: &CreateBadge) -> Result<Badge, sqlx::Error> {
        let query = format!(
            "INSERT INTO badges (name, description, badge_type, category, requirements, is_hidden) \
             VALUES ($1, COALESCE($2, ''), $3, COALESCE($4, 'general'), $5, COALESCE($6, false)) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Badge>(&query)
            .bind(&input.name)
            .bind(&input.description)
            .bind(input.badge_type.as_str())
            .bind(&input.category)
            .bind(Json(&input.requirements))
            .bind(input.is_hidden)
            .fetch_one(pool)
            .await
    }

    /// Catalog badges whose requirements name `activity_type`.
    pub async fn list_for_activity(
        conn: &mut PgConnection,
        activity_type: ActivityType,
    ) -> Result<Vec<Badge>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM badges \
             WHERE requirements->>'activityType' = $1 \
             ORDER BY id ASC"
        );
        sqlx::query_as::<_, Badge>(&query)
            .bind(activity_type.as_str())
            .fetch_all(conn)
            .await
    }

    /// Award a badge once. Returns `false` if the user already holds it.
    pub async fn award(
        conn: &mut PgConnection,
        user_id: DbId,
        badge_id: DbId,
        progress: BadgeProgress,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "INSERT INTO user_badges (user_id, badge_id, progress) VALUES ($1, $2, $3) \
             ON CONFLICT ON CONSTRAINT uq_user_badges_user_badge DO NOTHING",
        )
        .bind(user_id)
        .bind(badge_id)
        .bind(Json(progress))
        .execute(conn)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Badges a user has earned, newest first.
    pub async fn list_for_user(pool: &PgPool, user_id: DbId) -> Result<Vec<UserBadgeDetail>, sqlx::Error> {
        sqlx::query_as::<_, UserBadgeDetail>(
            "SELECT b.id AS badge_id, b.name, b.description, b.badge_type, b.category, \
                    b.is_hidden, ub.progress, ub.earned_at \
             FROM user_badges ub \
             JOIN badges b ON b.id = ub.badge_id \
             WHERE ub.user_id = $1 \
             ORDER BY ub.earned_at DESC, ub.id DESC",
        )
        .bind(user_id)
        .fetch_all(pool)
        .await
    }
}
