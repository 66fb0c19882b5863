//! Per-user rank progression state.

use crewhub_core::rank::{Rank, RankCategory, RankHistoryEntry};
use crewhub_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::types::Json;
use sqlx::FromRow;

/// A row from the `user_levels` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct UserLevel {
    pub id: DbId,
    pub user_id: DbId,
    #[sqlx(try_from = "String")]
    pub rank: Rank,
    #[sqlx(try_from = "String")]
    pub rank_category: RankCategory,
    pub activity_points: f64,
    pub purchase_points: i64,
    pub last_activity_at: Timestamp,
    pub last_points_reduction_at: Option<Timestamp>,
    pub rank_history: Json<Vec<RankHistoryEntry>>,
    /// Derived elsewhere from rank; not authoritative.
    pub unlocked_features: Json<Vec<String>>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}
