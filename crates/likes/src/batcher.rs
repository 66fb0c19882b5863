//! In-memory coalescing of like toggles.
//!
//! A toggle is answered from the cache: the current state comes from the
//! actor's flags, the counters move with atomic cache operations, and each
//! resulting net action is stored in the pending buffer under its
//! [`pending_key`]. A later action for the same key overwrites the earlier
//! one, so only the latest intention per key reaches the queue.
//!
//! [`LikeBatcher::flush`] swaps the buffer out in one step and enqueues one
//! `like_jobs` row per entry; the queue collapses duplicates of a key that
//! is still pending. Until its enqueue returns, a flushed key stays marked
//! in flight, so state resolution never falls through to a durable record
//! that the flushed action has not reached yet.

use std::collections::hash_map::DefaultHasher;
use std::collections::{HashMap, HashSet};
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::time::Duration;

use crewhub_core::error::CoreError;
use crewhub_core::likes::{
    apply_action, pending_key, Actor, LikeAction, LikeJobPayload, LikeState, LikeSubject,
};
use crewhub_core::types::DbId;
use crewhub_db::repositories::{LikeJobRepo, LikeRepo, SubjectRepo};
use crewhub_db::DbPool;
use serde::Serialize;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::cache::{LikeCache, ReactionCounts};
use crate::error::LikeError;
use crate::service::ToggleResult;

/// Number of stripes serializing toggles per (subject, actor).
const LOCK_STRIPES: usize = 64;

/// Result of one flush.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FlushReport {
    pub enqueued: usize,
    pub failed: usize,
    pub posts: usize,
    pub comments: usize,
}

#[derive(Default)]
struct Buffers {
    pending: HashMap<String, LikeJobPayload>,
    /// Keys taken by a flush whose enqueue has not returned.
    in_flight: HashSet<String>,
}

impl Buffers {
    fn holds(&self, key: &str) -> bool {
        self.pending.contains_key(key) || self.in_flight.contains(key)
    }

    /// Move every pending entry whose key is not already in flight into
    /// flight. Entries for keys in flight stay buffered so that one key is
    /// never enqueued by two flushes at once.
    fn take_ready(&mut self) -> Vec<(String, LikeJobPayload)> {
        let ready: Vec<String> = self
            .pending
            .keys()
            .filter(|key| !self.in_flight.contains(*key))
            .cloned()
            .collect();
        ready
            .into_iter()
            .filter_map(|key| {
                let payload = self.pending.remove(&key)?;
                self.in_flight.insert(key.clone());
                Some((key, payload))
            })
            .collect()
    }
}

pub struct LikeBatcher {
    pool: DbPool,
    cache: LikeCache,
    max_attempts: i16,
    buffers: Mutex<Buffers>,
    stripes: Vec<Mutex<()>>,
}

impl LikeBatcher {
    pub fn new(pool: DbPool, cache: LikeCache, max_attempts: i16) -> Self {
        Self {
            pool,
            cache,
            max_attempts,
            buffers: Mutex::new(Buffers::default()),
            stripes: (0..LOCK_STRIPES).map(|_| Mutex::new(())).collect(),
        }
    }

    fn stripe(&self, subject: LikeSubject, subject_id: DbId, actor: &Actor) -> &Mutex<()> {
        let mut hasher = DefaultHasher::new();
        (subject, subject_id, actor).hash(&mut hasher);
        &self.stripes[(hasher.finish() as usize) % self.stripes.len()]
    }

    /// Apply a toggle optimistically and buffer its net actions.
    pub async fn toggle(
        &self,
        subject: LikeSubject,
        subject_id: DbId,
        actor: &Actor,
        action: LikeAction,
    ) -> Result<ToggleResult, LikeError> {
        let _guard = self.stripe(subject, subject_id, actor).lock().await;

        let current = self.ensure_counts(subject, subject_id).await?;
        let from = self.resolve_state(subject, subject_id, actor).await?;
        let transition = apply_action(from, action);

        if transition.is_noop() {
            return Ok(ToggleResult {
                subject,
                subject_id,
                state: from,
                changed: false,
                counts: current,
            });
        }

        let counts = self
            .cache
            .apply_optimistic(subject, subject_id, actor, &transition)
            .await?;

        {
            let mut buffers = self.buffers.lock().await;
            for net in &transition.net_actions {
                buffers.pending.insert(
                    pending_key(subject, subject_id, actor, *net),
                    LikeJobPayload::new(subject, subject_id, actor.clone(), *net),
                );
            }
        }

        Ok(ToggleResult {
            subject,
            subject_id,
            state: transition.to,
            changed: true,
            counts,
        })
    }

    /// Counters from the cache, seeded from the durable store on a miss.
    /// A missing subject is `NotFound`.
    ///
    /// The seed is a versioned write: when concurrent toggles on one
    /// subject all miss, only the first seed lands and the others keep the
    /// increments made on top of it.
    async fn ensure_counts(&self, subject: LikeSubject, subject_id: DbId) -> Result<ReactionCounts, LikeError> {
        if let Some(counts) = self.cache.counts(subject, subject_id).await? {
            return Ok(counts);
        }
        let counters = SubjectRepo::find_counters(&self.pool, subject, subject_id)
            .await?
            .ok_or_else(|| CoreError::not_found(subject.as_str(), subject_id))?;
        self.cache.write_committed(subject, &counters).await?;
        Ok(self
            .cache
            .counts(subject, subject_id)
            .await?
            .unwrap_or_else(|| ReactionCounts::from(counters)))
    }

    /// The actor's optimistic state.
    ///
    /// Flags win. Without flags the actor is neutral if an action is still
    /// buffered, being flushed or queued (the last toggle cleared them and
    /// the durable record has not caught up); otherwise the durable record
    /// decides and its state is written back to the flags.
    pub async fn resolve_state(
        &self,
        subject: LikeSubject,
        subject_id: DbId,
        actor: &Actor,
    ) -> Result<LikeState, LikeError> {
        if let Some(state) = self.cache.flagged_state(subject, subject_id, actor).await? {
            return Ok(state);
        }
        if self.has_pending(subject, subject_id, actor).await {
            return Ok(LikeState::Neutral);
        }
        let job_keys = [LikeAction::Like, LikeAction::Dislike]
            .map(|a| pending_key(subject, subject_id, actor, a));
        if LikeJobRepo::has_active(&self.pool, &job_keys).await? {
            return Ok(LikeState::Neutral);
        }
        let record = LikeRepo::find(&self.pool, subject, subject_id, actor).await?;
        let state = LikeState::from_record(record.map(|r| r.is_dislike));
        if state != LikeState::Neutral {
            self.cache.write_state(subject, subject_id, actor, state).await?;
        }
        Ok(state)
    }

    /// Whether any action for (subject, actor) is waiting for a flush or
    /// being flushed.
    pub async fn has_pending(&self, subject: LikeSubject, subject_id: DbId, actor: &Actor) -> bool {
        let buffers = self.buffers.lock().await;
        [LikeAction::Like, LikeAction::Dislike]
            .into_iter()
            .any(|a| buffers.holds(&pending_key(subject, subject_id, actor, a)))
    }

    /// Number of buffered net actions.
    pub async fn pending_len(&self) -> usize {
        self.buffers.lock().await.pending.len()
    }

    /// Snapshot-and-clear the buffer and enqueue one job per entry.
    ///
    /// Each key stays in flight until its enqueue returns; a key already in
    /// flight from an overlapping flush waits for the next one. A failed enqueue
    /// is logged and its action goes back into the buffer for the next
    /// flush, unless a newer action for the key was buffered meanwhile.
    pub async fn flush(&self) -> FlushReport {
        let batch = self.buffers.lock().await.take_ready();
        let mut report = FlushReport::default();
        if batch.is_empty() {
            return report;
        }

        for (key, payload) in batch {
            let result = LikeJobRepo::enqueue(&self.pool, &payload, self.max_attempts).await;
            let mut buffers = self.buffers.lock().await;
            buffers.in_flight.remove(&key);
            match result {
                Ok(_) => {
                    report.enqueued += 1;
                    match payload.subject {
                        LikeSubject::Post => report.posts += 1,
                        LikeSubject::Comment => report.comments += 1,
                    }
                }
                Err(e) => {
                    report.failed += 1;
                    tracing::error!(job_key = %key, error = %e, "Failed to enqueue like job, keeping it buffered");
                    buffers.pending.entry(key).or_insert(payload);
                }
            }
        }

        tracing::info!(
            enqueued = report.enqueued,
            failed = report.failed,
            posts = report.posts,
            comments = report.comments,
            "Flushed like actions"
        );
        report
    }

    /// Flush every `interval` until `cancel` fires, then flush once more.
    pub async fn run_flush_timer(self: Arc<Self>, interval: Duration, cancel: CancellationToken) {
        tracing::info!(interval_ms = interval.as_millis() as u64, "Like flush timer started");
        let mut ticker = tokio::time::interval(interval);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    self.flush().await;
                    tracing::info!("Like flush timer stopping");
                    break;
                }
                _ = ticker.tick() => {
                    self.flush().await;
                }
            }
        }
    }
}
