//! Direct, strongly consistent toggle path.

use crewhub_core::error::CoreError;
use crewhub_core::likes::{apply_action, Actor, LikeAction, LikeState, LikeSubject};
use crewhub_core::types::DbId;
use crewhub_db::models::like::{CounterDelta, SubjectCounters};
use crewhub_db::repositories::{LikeRepo, SubjectRepo};
use crewhub_db::DbPool;

use crate::cache::{LikeCache, ReactionCounts};
use crate::error::LikeError;
use crate::service::ToggleResult;

/// Applies toggles to the durable store before answering.
///
/// Read-check-write of one (subject, actor) pair is serialized with a
/// transaction-scoped advisory lock; the partial unique indexes on the like
/// tables back it up. Counters reach the cache as committed, versioned
/// snapshots.
#[derive(Clone)]
pub struct DirectLikes {
    pool: DbPool,
    cache: LikeCache,
}

impl DirectLikes {
    pub fn new(pool: DbPool, cache: LikeCache) -> Self {
        Self { pool, cache }
    }

    pub async fn toggle(
        &self,
        subject: LikeSubject,
        subject_id: DbId,
        actor: &Actor,
        action: LikeAction,
    ) -> Result<ToggleResult, LikeError> {
        let mut tx = self.pool.begin().await?;
        LikeRepo::lock_pair(&mut tx, subject, subject_id, actor).await?;

        if !SubjectRepo::exists(&mut *tx, subject, subject_id).await? {
            return Err(CoreError::not_found(subject.as_str(), subject_id).into());
        }

        let existing = LikeRepo::find(&mut *tx, subject, subject_id, actor).await?;
        let from = LikeState::from_record(existing.map(|r| r.is_dislike));
        let transition = apply_action(from, action);

        let mut delta = CounterDelta::default();
        for net in &transition.net_actions {
            delta += LikeRepo::apply(&mut tx, subject, subject_id, actor, *net).await?;
        }

        let counters = SubjectRepo::adjust_counters(&mut tx, subject, subject_id, delta)
            .await?
            .ok_or_else(|| CoreError::not_found(subject.as_str(), subject_id))?;
        tx.commit().await?;

        if let Err(e) = self.mirror(subject, actor, transition.to, &counters).await {
            // The durable write stands; the next committed write repairs the cache.
            tracing::error!(
                subject = %subject,
                subject_id,
                actor = %actor.key(),
                error = %e,
                "Failed to mirror like counters into cache"
            );
        }

        Ok(ToggleResult {
            subject,
            subject_id,
            state: transition.to,
            changed: !transition.is_noop(),
            counts: ReactionCounts::from(counters),
        })
    }

    async fn mirror(
        &self,
        subject: LikeSubject,
        actor: &Actor,
        state: LikeState,
        counters: &SubjectCounters,
    ) -> Result<(), crewhub_cache::CacheError> {
        self.cache.write_committed(subject, counters).await?;
        self.cache.write_state(subject, counters.id, actor, state).await
    }
}
