//! Inactivity decay sweep.
//!
//! The sweep pages through users whose last activity is older than one
//! inactivity period and decays each one in its own transaction, under a
//! row lock shared with [`ActivityLedger`](crate::ActivityLedger). A user
//! that fails or exceeds the per-user timeout is recorded in the report and
//! the sweep moves on.

use std::sync::Arc;

use chrono::Utc;
use crewhub_core::decay::DecayOutcome;
use crewhub_core::rank::{detect_transition, RankHistoryEntry, RankTransition};
use crewhub_core::types::{DbId, Timestamp};
use crewhub_db::repositories::user_level_repo::LevelProgress;
use crewhub_db::repositories::UserLevelRepo;
use crewhub_db::DbPool;
use crewhub_events::{DomainEvent, EventBus};
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::config::DecayConfig;
use crate::error::PointsError;

/// What happened to one user during a sweep.
#[derive(Debug, Clone, PartialEq)]
pub enum UserDecayResult {
    /// Points were reduced.
    Reduced {
        outcome: DecayOutcome,
        transition: Option<RankTransition>,
    },
    /// At least one period elapsed but points were already at the floor;
    /// only the reduction timestamp moved.
    AtFloor,
    /// Not stale, or no whole period elapsed, once the row was locked.
    Skipped,
}

#[derive(Debug, Clone, Serialize)]
pub struct DecayFailure {
    pub user_id: DbId,
    pub error: String,
}

/// Summary of one sweep.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DecaySweepReport {
    pub scanned: usize,
    pub reduced: usize,
    pub at_floor: usize,
    pub skipped: usize,
    pub failures: Vec<DecayFailure>,
}

pub struct DecaySweeper {
    pool: DbPool,
    events: Arc<EventBus>,
    config: DecayConfig,
}

impl DecaySweeper {
    pub fn new(pool: DbPool, events: Arc<EventBus>, config: DecayConfig) -> Self {
        Self { pool, events, config }
    }

    /// Run one sweep now.
    pub async fn apply_inactivity_decay(&self) -> Result<DecaySweepReport, sqlx::Error> {
        self.sweep_at(Utc::now()).await
    }

    /// Run one sweep as of `now`.
    ///
    /// Only listing stale users can fail the sweep as a whole; per-user
    /// errors end up in [`DecaySweepReport::failures`].
    pub async fn sweep_at(&self, now: Timestamp) -> Result<DecaySweepReport, sqlx::Error> {
        let cutoff = self.config.policy.stale_cutoff(now);
        let mut report = DecaySweepReport::default();
        let mut after_user_id: DbId = 0;

        loop {
            let user_ids =
                UserLevelRepo::list_stale_user_ids(&self.pool, cutoff, after_user_id, self.config.batch_size)
                    .await?;
            let Some(&last) = user_ids.last() else {
                break;
            };
            after_user_id = last;

            for user_id in user_ids {
                report.scanned += 1;
                match tokio::time::timeout(self.config.user_timeout, self.decay_user(user_id, now)).await {
                    Ok(Ok(UserDecayResult::Reduced { .. })) => report.reduced += 1,
                    Ok(Ok(UserDecayResult::AtFloor)) => report.at_floor += 1,
                    Ok(Ok(UserDecayResult::Skipped)) => report.skipped += 1,
                    Ok(Err(e)) => {
                        tracing::error!(user_id, error = %e, "Decay failed for user");
                        report.failures.push(DecayFailure {
                            user_id,
                            error: e.to_string(),
                        });
                    }
                    Err(_) => {
                        tracing::error!(
                            user_id,
                            timeout_secs = self.config.user_timeout.as_secs_f64(),
                            "Decay timed out for user"
                        );
                        report.failures.push(DecayFailure {
                            user_id,
                            error: format!(
                                "timed out after {:?}",
                                self.config.user_timeout
                            ),
                        });
                    }
                }
            }
        }

        tracing::info!(
            scanned = report.scanned,
            reduced = report.reduced,
            at_floor = report.at_floor,
            skipped = report.skipped,
            failed = report.failures.len(),
            "Decay sweep finished"
        );
        Ok(report)
    }

    /// Decay one user as of `now`.
    ///
    /// Staleness is re-evaluated under the row lock, so an activity that
    /// committed after the user was listed wins.
    pub async fn decay_user(&self, user_id: DbId, now: Timestamp) -> Result<UserDecayResult, PointsError> {
        let mut tx = self.pool.begin().await?;
        let Some(level) = UserLevelRepo::lock_by_user(&mut tx, user_id).await? else {
            return Ok(UserDecayResult::Skipped);
        };

        let Some(outcome) = self.config.policy.evaluate(
            level.activity_points,
            level.last_activity_at,
            level.last_points_reduction_at,
            now,
        ) else {
            return Ok(UserDecayResult::Skipped);
        };

        let transition = detect_transition(level.rank, outcome.points_after);
        let mut history = level.rank_history.0.clone();
        let reduced = outcome.reduced_by() > 0.0;
        let (rank, rank_category) = match &transition {
            Some(t) => (t.to, t.category),
            None => (level.rank, level.rank_category),
        };
        if reduced {
            history.push(RankHistoryEntry::new(rank, now, outcome.reason()));
        }

        UserLevelRepo::save_decay(
            &mut tx,
            level.id,
            &LevelProgress {
                activity_points: outcome.points_after,
                rank,
                rank_category,
                rank_history: &history,
            },
            now,
        )
        .await?;
        tx.commit().await?;

        if !reduced {
            return Ok(UserDecayResult::AtFloor);
        }

        tracing::info!(
            user_id,
            periods = outcome.periods,
            points_before = outcome.points_before,
            points_after = outcome.points_after,
            "Inactivity decay applied"
        );
        self.events.publish(DomainEvent::points_decayed(user_id, &outcome));
        if let Some(t) = &transition {
            self.events
                .publish(DomainEvent::rank_changed(user_id, t, outcome.points_after));
        }

        Ok(UserDecayResult::Reduced { outcome, transition })
    }

    /// Sweep on the configured interval until `cancel` fires.
    pub async fn run(&self, cancel: CancellationToken) {
        tracing::info!(
            interval_secs = self.config.sweep_interval.as_secs(),
            inactivity_days = self.config.policy.inactivity_period.num_days(),
            "Decay scheduler started"
        );

        let mut interval = tokio::time::interval(self.config.sweep_interval);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Decay scheduler stopping");
                    break;
                }
                _ = interval.tick() => {
                    match self.apply_inactivity_decay().await {
                        Ok(report) if report.scanned == 0 => {
                            tracing::debug!("Decay sweep: no stale users");
                        }
                        Ok(_) => {}
                        Err(e) => {
                            tracing::error!(error = %e, "Decay sweep failed");
                        }
                    }
                }
            }
        }
    }
}
