//! Activity ledger: the single entry point for awarding activity points.
//!
//! Recording an activity is one unit of work: insert the activity record,
//! load-or-create and lock the user's level, add the points, move the rank
//! if a threshold was crossed, persist, then evaluate badges. Two call
//! shapes exist:
//!
//! - [`ActivityLedger::record_activity`] opens and commits its own
//!   transaction and publishes the resulting events.
//! - [`ActivityLedger::record_activity_in_tx`] joins the caller's
//!   transaction. Nothing is published; the caller hands the outcome to
//!   [`ActivityLedger::publish`] after its own commit. Any error aborts the
//!   caller's whole unit.

use std::sync::Arc;

use chrono::Utc;
use crewhub_core::activity::{points_for, ActivityType};
use crewhub_core::rank::{detect_transition, transition_reason, RankHistoryEntry, RankTransition};
use crewhub_core::types::DbId;
use crewhub_db::models::activity::ActivityRecord;
use crewhub_db::models::badge::UserBadgeDetail;
use crewhub_db::models::user_level::UserLevel;
use crewhub_db::repositories::user_level_repo::LevelProgress;
use crewhub_db::repositories::{ActivityRepo, BadgeRepo, UserLevelRepo};
use crewhub_db::DbPool;
use crewhub_events::{DomainEvent, EventBus};
use sqlx::PgConnection;

use crate::badges::{AwardedBadge, BadgeEvaluator};
use crate::error::PointsError;

/// Everything one recorded activity changed.
#[derive(Debug, Clone)]
pub struct ActivityOutcome {
    pub record: ActivityRecord,
    /// The level as persisted after the activity.
    pub level: UserLevel,
    pub transition: Option<RankTransition>,
    pub awarded_badges: Vec<AwardedBadge>,
}

impl ActivityOutcome {
    /// Domain events describing this outcome.
    pub fn events(&self) -> Vec<DomainEvent> {
        let user_id = self.level.user_id;
        let mut events = Vec::new();
        if let Some(transition) = &self.transition {
            events.push(DomainEvent::rank_changed(user_id, transition, self.level.activity_points));
        }
        for badge in &self.awarded_badges {
            events.push(DomainEvent::badge_awarded(user_id, badge.badge_id, &badge.name, badge.progress));
        }
        events
    }
}

pub struct ActivityLedger {
    pool: DbPool,
    events: Arc<EventBus>,
}

impl ActivityLedger {
    pub fn new(pool: DbPool, events: Arc<EventBus>) -> Self {
        Self { pool, events }
    }

    /// Record an activity in a transaction of its own.
    pub async fn record_activity(
        &self,
        user_id: DbId,
        activity: ActivityType,
        reference_id: Option<DbId>,
    ) -> Result<ActivityOutcome, PointsError> {
        let mut tx = self.pool.begin().await?;
        let outcome = Self::record_activity_in_tx(&mut tx, user_id, activity, reference_id).await?;
        tx.commit().await?;
        self.publish(&outcome);
        Ok(outcome)
    }

    /// Record an activity inside the caller's transaction.
    ///
    /// An activity without a configured point value is rejected before
    /// anything is written.
    pub async fn record_activity_in_tx(
        conn: &mut PgConnection,
        user_id: DbId,
        activity: ActivityType,
        reference_id: Option<DbId>,
    ) -> Result<ActivityOutcome, PointsError> {
        let points = points_for(activity)?;

        let record = ActivityRepo::insert(&mut *conn, user_id, activity, points, reference_id).await?;
        let level = UserLevelRepo::lock_or_create(&mut *conn, user_id).await?;

        let activity_points = level.activity_points + points;
        let transition = detect_transition(level.rank, activity_points);

        let mut history = level.rank_history.0.clone();
        let (rank, rank_category) = match &transition {
            Some(t) => {
                history.push(RankHistoryEntry::new(
                    t.to,
                    Utc::now(),
                    transition_reason(t, activity_points),
                ));
                (t.to, t.category)
            }
            None => (level.rank, level.rank_category),
        };

        let level = UserLevelRepo::save_activity_progress(
            &mut *conn,
            level.id,
            &LevelProgress {
                activity_points,
                rank,
                rank_category,
                rank_history: &history,
            },
        )
        .await?;

        if let Some(t) = &transition {
            tracing::info!(user_id, from = %t.from, to = %t.to, activity_points, "Rank changed");
        }

        let awarded_badges = BadgeEvaluator::check_badges(&mut *conn, &level, activity).await?;

        Ok(ActivityOutcome {
            record,
            level,
            transition,
            awarded_badges,
        })
    }

    /// Publish the events of a committed outcome.
    pub fn publish(&self, outcome: &ActivityOutcome) {
        for event in outcome.events() {
            self.events.publish(event);
        }
    }

    /// A user's level, created at the lowest rank on first access.
    pub async fn get_level(&self, user_id: DbId) -> Result<UserLevel, PointsError> {
        if let Some(level) = UserLevelRepo::find_by_user(&self.pool, user_id).await? {
            return Ok(level);
        }
        let mut tx = self.pool.begin().await?;
        let level = UserLevelRepo::lock_or_create(&mut tx, user_id).await?;
        tx.commit().await?;
        Ok(level)
    }

    /// Badges a user holds, newest first.
    pub async fn list_badges(&self, user_id: DbId) -> Result<Vec<UserBadgeDetail>, PointsError> {
        Ok(BadgeRepo::list_for_user(&self.pool, user_id).await?)
    }
}
