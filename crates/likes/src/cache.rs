//! Like counters and per-actor flags in the shared cache.
//!
//! Keys follow [`crewhub_core::likes::cache_keys`]. Optimistic updates use
//! the store's atomic increment and floored decrement. Committed durable
//! values are written together with their `counter_version`, and a write
//! carrying an older version than the cached one is dropped, so commits
//! that reach the cache out of order never roll the counters back.

use std::sync::Arc;
use std::time::Duration;

use crewhub_cache::{CacheError, CacheStore};
use crewhub_core::likes::{cache_keys, Actor, LikeState, LikeSubject, LikeTransition, Reaction};
use crewhub_core::types::DbId;
use crewhub_db::models::like::SubjectCounters;
use serde::Serialize;

/// Like and dislike totals of one subject.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReactionCounts {
    pub like_count: i64,
    pub dislike_count: i64,
}

impl From<SubjectCounters> for ReactionCounts {
    fn from(c: SubjectCounters) -> Self {
        Self {
            like_count: i64::from(c.like_count),
            dislike_count: i64::from(c.dislike_count),
        }
    }
}

#[derive(Clone)]
pub struct LikeCache {
    store: Arc<dyn CacheStore>,
    ttl: Duration,
}

impl LikeCache {
    pub fn new(store: Arc<dyn CacheStore>, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    /// Both counters, or `None` unless both are cached.
    pub async fn counts(&self, subject: LikeSubject, id: DbId) -> Result<Option<ReactionCounts>, CacheError> {
        let likes = self
            .store
            .get_i64(&cache_keys::counter(subject, id, Reaction::Like))
            .await?;
        let dislikes = self
            .store
            .get_i64(&cache_keys::counter(subject, id, Reaction::Dislike))
            .await?;
        Ok(match (likes, dislikes) {
            (Some(like_count), Some(dislike_count)) => Some(ReactionCounts {
                like_count,
                dislike_count,
            }),
            _ => None,
        })
    }

    /// Overwrite both counters with a committed snapshot, unless the cache
    /// already holds one at least as new. Returns whether it was written.
    pub async fn write_committed(
        &self,
        subject: LikeSubject,
        counters: &SubjectCounters,
    ) -> Result<bool, CacheError> {
        let id = counters.id;
        let counts = ReactionCounts::from(*counters);
        let like_key = cache_keys::counter(subject, id, Reaction::Like);
        let dislike_key = cache_keys::counter(subject, id, Reaction::Dislike);
        self.store
            .set_i64_if_newer(
                &[
                    (like_key.as_str(), counts.like_count),
                    (dislike_key.as_str(), counts.dislike_count),
                ],
                &cache_keys::counter_version(subject, id),
                counters.counter_version,
                self.ttl,
            )
            .await
    }

    /// The actor's state according to the flags, or `None` when neither
    /// flag is present (neutral, or expired).
    pub async fn flagged_state(
        &self,
        subject: LikeSubject,
        id: DbId,
        actor: &Actor,
    ) -> Result<Option<LikeState>, CacheError> {
        let liked = self
            .store
            .exists(&cache_keys::flag(subject, id, actor, Reaction::Like))
            .await?;
        let disliked = self
            .store
            .exists(&cache_keys::flag(subject, id, actor, Reaction::Dislike))
            .await?;
        Ok((liked || disliked).then(|| LikeState::from_flags(liked, disliked)))
    }

    /// Set the flags to exactly `state`.
    pub async fn write_state(
        &self,
        subject: LikeSubject,
        id: DbId,
        actor: &Actor,
        state: LikeState,
    ) -> Result<(), CacheError> {
        let like_key = cache_keys::flag(subject, id, actor, Reaction::Like);
        let dislike_key = cache_keys::flag(subject, id, actor, Reaction::Dislike);
        match state {
            LikeState::Liked => {
                self.store.set_flag(&like_key, self.ttl).await?;
                self.store.delete(&dislike_key).await
            }
            LikeState::Disliked => {
                self.store.delete(&like_key).await?;
                self.store.set_flag(&dislike_key, self.ttl).await
            }
            LikeState::Neutral => {
                self.store.delete(&like_key).await?;
                self.store.delete(&dislike_key).await
            }
        }
    }

    /// Apply a transition's deltas atomically and move the flags.
    ///
    /// Returns the counters after the update.
    pub async fn apply_optimistic(
        &self,
        subject: LikeSubject,
        id: DbId,
        actor: &Actor,
        transition: &LikeTransition,
    ) -> Result<ReactionCounts, CacheError> {
        let like_count = self
            .shift(&cache_keys::counter(subject, id, Reaction::Like), transition.like_delta)
            .await?;
        let dislike_count = self
            .shift(&cache_keys::counter(subject, id, Reaction::Dislike), transition.dislike_delta)
            .await?;
        self.write_state(subject, id, actor, transition.to).await?;
        Ok(ReactionCounts {
            like_count,
            dislike_count,
        })
    }

    async fn shift(&self, key: &str, delta: i64) -> Result<i64, CacheError> {
        match delta {
            d if d > 0 => self.store.incr_by(key, d, self.ttl).await,
            d if d < 0 => self.store.decr_floor(key, -d, self.ttl).await,
            _ => Ok(self.store.get_i64(key).await?.unwrap_or(0)),
        }
    }
}
