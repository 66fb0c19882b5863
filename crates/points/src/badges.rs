//! Badge evaluation after an activity is recorded.

use crewhub_core::activity::ActivityType;
use crewhub_core::badge::{BadgeContext, BadgeProgress};
use crewhub_core::types::DbId;
use crewhub_db::models::user_level::UserLevel;
use crewhub_db::repositories::{ActivityRepo, BadgeRepo, UserLevelRepo};
use crewhub_db::DbPool;
use serde::Serialize;
use sqlx::PgConnection;

/// A badge newly awarded by one evaluation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AwardedBadge {
    pub badge_id: DbId,
    pub name: String,
    pub progress: BadgeProgress,
}

pub struct BadgeEvaluator;

impl BadgeEvaluator {
    /// Award every catalog badge for `activity` that the user now qualifies
    /// for and does not hold yet.
    ///
    /// Only badges whose requirements name `activity` are considered.
    /// Already-held badges are skipped by the unique constraint on
    /// `user_badges`, so repeating the check awards nothing new.
    pub async fn check_badges(
        conn: &mut PgConnection,
        level: &UserLevel,
        activity: ActivityType,
    ) -> Result<Vec<AwardedBadge>, sqlx::Error> {
        let candidates = BadgeRepo::list_for_activity(&mut *conn, activity).await?;
        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        let activity_count = ActivityRepo::count_for_user(&mut *conn, level.user_id, activity).await?;
        let ctx = BadgeContext {
            activity_count,
            rank: level.rank,
            activity_points: level.activity_points,
        };

        let mut awarded = Vec::new();
        for badge in candidates {
            let requirements = &badge.requirements.0;
            if !requirements.applies_to(activity) || !requirements.is_met(&ctx) {
                continue;
            }
            let progress = requirements.progress(activity_count);
            if BadgeRepo::award(&mut *conn, level.user_id, badge.id, progress).await? {
                tracing::info!(user_id = level.user_id, badge_id = badge.id, badge = %badge.name, "Badge awarded");
                awarded.push(AwardedBadge {
                    badge_id: badge.id,
                    name: badge.name,
                    progress,
                });
            }
        }
        Ok(awarded)
    }

    /// Standalone evaluation in its own transaction.
    pub async fn check_badges_for_user(
        pool: &DbPool,
        user_id: DbId,
        activity: ActivityType,
    ) -> Result<Vec<AwardedBadge>, sqlx::Error> {
        let mut tx = pool.begin().await?;
        let level = UserLevelRepo::lock_or_create(&mut tx, user_id).await?;
        let awarded = Self::check_badges(&mut tx, &level, activity).await?;
        tx.commit().await?;
        Ok(awarded)
    }
}
