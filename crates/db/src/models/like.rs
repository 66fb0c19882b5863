//! Like records and subject counters.

use crewhub_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from `post_likes` or `comment_likes`, with the subject column
/// aliased to `subject_id`.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct LikeRecord {
    pub id: DbId,
    pub subject_id: DbId,
    pub user_id: Option<DbId>,
    pub ip_address: Option<String>,
    pub is_dislike: bool,
    pub created_at: Timestamp,
}

/// Durable like/dislike counters of a post or comment.
///
/// `counter_version` increases with every committed counter change, so of
/// two snapshots of one subject the higher version is the newer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromRow, Serialize)]
pub struct SubjectCounters {
    pub id: DbId,
    pub like_count: i32,
    pub dislike_count: i32,
    pub counter_version: i64,
}

/// Net counter movement produced by applying one action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CounterDelta {
    pub likes: i32,
    pub dislikes: i32,
}

impl CounterDelta {
    pub fn is_zero(&self) -> bool {
        self.likes == 0 && self.dislikes == 0
    }
}

impl std::ops::AddAssign for CounterDelta {
    fn add_assign(&mut self, rhs: Self) {
        self.likes += rhs.likes;
        self.dislikes += rhs.dislikes;
    }
}
