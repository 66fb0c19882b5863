//! Strategy facade over the direct and batched like paths.

use std::sync::Arc;

use crewhub_core::error::CoreError;
use crewhub_core::likes::{Actor, LikeAction, LikeState, LikeSubject};
use crewhub_core::types::DbId;
use crewhub_db::repositories::{LikeRepo, SubjectRepo};
use crewhub_db::DbPool;
use serde::Serialize;

use crate::batcher::LikeBatcher;
use crate::cache::{LikeCache, ReactionCounts};
use crate::config::{LikeStrategy, LikesConfig};
use crate::direct::DirectLikes;
use crate::error::LikeError;

/// Answer to a toggle.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToggleResult {
    pub subject: LikeSubject,
    pub subject_id: DbId,
    /// The actor's state after the toggle.
    pub state: LikeState,
    /// False when the toggle re-applied the current state.
    pub changed: bool,
    #[serde(flatten)]
    pub counts: ReactionCounts,
}

/// Counters of one subject plus, when asked for, one actor's state.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReactionSummary {
    pub subject: LikeSubject,
    pub subject_id: DbId,
    #[serde(flatten)]
    pub counts: ReactionCounts,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<LikeState>,
}

pub struct LikeService {
    strategy: LikeStrategy,
    pool: DbPool,
    cache: LikeCache,
    direct: DirectLikes,
    batcher: Arc<LikeBatcher>,
}

impl LikeService {
    pub fn new(pool: DbPool, cache: LikeCache, config: &LikesConfig) -> Self {
        let direct = DirectLikes::new(pool.clone(), cache.clone());
        let batcher = Arc::new(LikeBatcher::new(pool.clone(), cache.clone(), config.max_attempts));
        Self {
            strategy: config.strategy,
            pool,
            cache,
            direct,
            batcher,
        }
    }

    pub fn strategy(&self) -> LikeStrategy {
        self.strategy
    }

    /// The batcher; its flush timer must run when the strategy is batched.
    pub fn batcher(&self) -> &Arc<LikeBatcher> {
        &self.batcher
    }

    pub async fn toggle(
        &self,
        subject: LikeSubject,
        subject_id: DbId,
        actor: &Actor,
        action: LikeAction,
    ) -> Result<ToggleResult, LikeError> {
        match self.strategy {
            LikeStrategy::Direct => self.direct.toggle(subject, subject_id, actor, action).await,
            LikeStrategy::Batched => self.batcher.toggle(subject, subject_id, actor, action).await,
        }
    }

    /// Counters and optionally the actor's state, cache first.
    ///
    /// Cache misses fall back to the durable store and repopulate the cache.
    pub async fn reaction_summary(
        &self,
        subject: LikeSubject,
        subject_id: DbId,
        actor: Option<&Actor>,
    ) -> Result<ReactionSummary, LikeError> {
        let counts = match self.cache.counts(subject, subject_id).await? {
            Some(counts) => counts,
            None => {
                let counters = SubjectRepo::find_counters(&self.pool, subject, subject_id)
                    .await?
                    .ok_or_else(|| CoreError::not_found(subject.as_str(), subject_id))?;
                self.cache.write_committed(subject, &counters).await?;
                ReactionCounts::from(counters)
            }
        };

        let state = match actor {
            Some(actor) => Some(self.actor_state(subject, subject_id, actor).await?),
            None => None,
        };

        Ok(ReactionSummary {
            subject,
            subject_id,
            counts,
            state,
        })
    }

    async fn actor_state(
        &self,
        subject: LikeSubject,
        subject_id: DbId,
        actor: &Actor,
    ) -> Result<LikeState, LikeError> {
        match self.strategy {
            LikeStrategy::Batched => self.batcher.resolve_state(subject, subject_id, actor).await,
            LikeStrategy::Direct => {
                let record = LikeRepo::find(&self.pool, subject, subject_id, actor).await?;
                Ok(LikeState::from_record(record.map(|r| r.is_dislike)))
            }
        }
    }
}
