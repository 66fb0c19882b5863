//! Repository for the `user_levels` table.

use crewhub_core::rank::{Rank, RankCategory, RankHistoryEntry};
use crewhub_core::types::{DbId, Timestamp};
use sqlx::types::Json;
use sqlx::{PgConnection, PgPool};

use crate::models::user_level::UserLevel;

/// Column list for `user_levels` queries.
const COLUMNS: &str = "\
    id, user_id, rank, rank_category, activity_points, purchase_points, \
    last_activity_at, last_points_reduction_at, rank_history, unlocked_features, \
    created_at, updated_at";

/// Progress fields written after an activity is recorded.
#[derive(Debug, Clone)]
pub struct LevelProgress<'a> {
    pub activity_points: f64,
    pub rank: Rank,
    pub rank_category: RankCategory,
    pub rank_history: &'a [RankHistoryEntry],
}

/// Read/write access to per-user level state.
pub struct UserLevelRepo;

impl UserLevelRepo {
    /// Find a user's level without locking.
    pub async fn find_by_user(pool: &PgPool, user_id: DbId) -> Result<Option<UserLevel>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM user_levels WHERE user_id = $1");
        sqlx::query_as::<_, UserLevel>(&query)
            .bind(user_id)
            .fetch_optional(pool)
            .await
    }

    /// Create the row at the lowest rank if missing, then lock it for the
    /// rest of the caller's transaction.
    pub async fn lock_or_create(conn: &mut PgConnection, user_id: DbId) -> Result<UserLevel, sqlx::Error> {
        sqlx::query(
            "INSERT INTO user_levels (user_id, rank, rank_category) VALUES ($1, $2, $3) \
             ON CONFLICT ON CONSTRAINT uq_user_levels_user_id DO NOTHING",
        )
        .bind(user_id)
        .bind(Rank::LOWEST.as_str())
        .bind(Rank::LOWEST.category().as_str())
        .execute(&mut *conn)
        .await?;

        let query = format!("SELECT {COLUMNS} FROM user_levels WHERE user_id = $1 FOR UPDATE");
        sqlx::query_as::<_, UserLevel>(&query)
            .bind(user_id)
            .fetch_one(&mut *conn)
            .await
    }

    /// Lock an existing row for the rest of the caller's transaction.
    pub async fn lock_by_user(conn: &mut PgConnection, user_id: DbId) -> Result<Option<UserLevel>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM user_levels WHERE user_id = $1 FOR UPDATE");
        sqlx::query_as::<_, UserLevel>(&query)
            .bind(user_id)
            .fetch_optional(conn)
            .await
    }

    /// Persist new points and rank and stamp `last_activity_at = NOW()`.
    pub async fn save_activity_progress(
        conn: &mut PgConnection,
        id: DbId,
        progress: &LevelProgress<'_>,
    ) -> Result<UserLevel, sqlx::Error> {
        let query = format!(
            "UPDATE user_levels SET \
                 activity_points = $2, rank = $3, rank_category = $4, \
                 rank_history = $5, last_activity_at = NOW() \
             WHERE id = $1 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, UserLevel>(&query)
            .bind(id)
            .bind(progress.activity_points)
            .bind(progress.rank.as_str())
            .bind(progress.rank_category.as_str())
            .bind(Json(progress.rank_history))
            .fetch_one(conn)
            .await
    }

    /// Persist a decay result. `last_activity_at` is left untouched.
    pub async fn save_decay(
        conn: &mut PgConnection,
        id: DbId,
        progress: &LevelProgress<'_>,
        reduced_at: Timestamp,
    ) -> Result<UserLevel, sqlx::Error> {
        let query = format!(
            "UPDATE user_levels SET \
                 activity_points = $2, rank = $3, rank_category = $4, \
                 rank_history = $5, last_points_reduction_at = $6 \
             WHERE id = $1 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, UserLevel>(&query)
            .bind(id)
            .bind(progress.activity_points)
            .bind(progress.rank.as_str())
            .bind(progress.rank_category.as_str())
            .bind(Json(progress.rank_history))
            .bind(reduced_at)
            .fetch_one(conn)
            .await
    }

    /// Page through users whose last activity is before `cutoff`, ordered by
    /// `user_id` and starting after `after_user_id`.
    pub async fn list_stale_user_ids(
        pool: &PgPool,
        cutoff: Timestamp,
        after_user_id: DbId,
        limit: i64,
    ) -> Result<Vec<DbId>, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT user_id FROM user_levels \
             WHERE last_activity_at < $1 AND user_id > $2 \
             ORDER BY user_id ASC LIMIT $3",
        )
        .bind(cutoff)
        .bind(after_user_id)
        .bind(limit)
        .fetch_all(pool)
        .await
    }

    /// Credit purchase points, creating the level row if needed.
    pub async fn add_purchase_points(pool: &PgPool, user_id: DbId, amount: i64) -> Result<UserLevel, sqlx::Error> {
        let query = format!(
            "INSERT INTO user_levels (user_id, purchase_points) VALUES ($1, $2) \
             ON CONFLICT ON CONSTRAINT uq_user_levels_user_id \
             DO UPDATE SET purchase_points = user_levels.purchase_points + EXCLUDED.purchase_points \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, UserLevel>(&query)
            .bind(user_id)
            .bind(amount)
            .fetch_one(pool)
            .await
    }

    /// Debit purchase points.
    ///
    /// Returns `None` when the user has no row or an insufficient balance;
    /// the balance is left unchanged in that case.
    pub async fn spend_purchase_points(
        pool: &PgPool,
        user_id: DbId,
        amount: i64,
    ) -> Result<Option<UserLevel>, sqlx::Error> {
        let query = format!(
            "UPDATE user_levels SET purchase_points = purchase_points - $2 \
             WHERE user_id = $1 AND purchase_points >= $2 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, UserLevel>(&query)
            .bind(user_id)
            .bind(amount)
            .fetch_optional(pool)
            .await
    }
}
