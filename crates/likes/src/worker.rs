//! Like job consumer.
//!
//! Each job applies one net action in a single database transaction (like
//! record, then subject counters), then writes the committed counters to
//! the cache as a versioned snapshot. Every step is safe to repeat: the
//! record mutation is idempotent, the counters move only by what the
//! mutation actually changed, and the cache is overwritten rather than
//! incremented. A job that fails anywhere is retried through the queue;
//! one that runs out of attempts has its subject recounted from the like
//! records.
//!
//! The actor's flags are left alone: they already hold the latest
//! optimistic state, which may be newer than the job being applied.

use std::sync::Arc;
use std::time::Duration;

use crewhub_core::error::CoreError;
use crewhub_core::likes::LikeJobPayload;
use crewhub_db::models::like::SubjectCounters;
use crewhub_db::models::like_job::LikeJob;
use crewhub_db::models::status::LikeJobStatus;
use crewhub_db::repositories::{LikeJobRepo, LikeRepo, SubjectRepo};
use crewhub_db::DbPool;
use crewhub_events::{DomainEvent, EventBus};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::cache::LikeCache;
use crate::config::LikesConfig;
use crate::error::LikeError;

pub struct LikeWorker {
    pool: DbPool,
    cache: LikeCache,
    events: Arc<EventBus>,
    config: LikesConfig,
}

impl LikeWorker {
    pub fn new(pool: DbPool, cache: LikeCache, events: Arc<EventBus>, config: LikesConfig) -> Self {
        Self {
            pool,
            cache,
            events,
            config,
        }
    }

    /// Apply one job payload.
    ///
    /// A missing subject is `NotFound` and fails the attempt like any other
    /// error.
    pub async fn process(&self, payload: &LikeJobPayload) -> Result<SubjectCounters, LikeError> {
        let subject = payload.subject;
        let subject_id = payload.target_id;
        let actor = &payload.actor;

        let mut tx = self.pool.begin().await?;
        LikeRepo::lock_pair(&mut tx, subject, subject_id, actor).await?;

        if !SubjectRepo::exists(&mut *tx, subject, subject_id).await? {
            return Err(CoreError::not_found(subject.as_str(), subject_id).into());
        }

        let delta = LikeRepo::apply(&mut tx, subject, subject_id, actor, payload.like_action()).await?;
        let counters = SubjectRepo::adjust_counters(&mut tx, subject, subject_id, delta)
            .await?
            .ok_or_else(|| CoreError::not_found(subject.as_str(), subject_id))?;
        tx.commit().await?;

        self.cache.write_committed(subject, &counters).await?;

        tracing::debug!(
            job_key = %payload.job_key(),
            like_delta = delta.likes,
            dislike_delta = delta.dislikes,
            "Like job applied"
        );
        Ok(counters)
    }

    /// Claim and process at most one job. Returns `true` if a job was
    /// claimed.
    pub async fn run_once(&self) -> Result<bool, sqlx::Error> {
        let Some(job) = LikeJobRepo::claim_next(&self.pool).await? else {
            return Ok(false);
        };

        match self.process(&job.payload.0).await {
            Ok(_) => LikeJobRepo::complete(&self.pool, job.id).await?,
            Err(e) => self.handle_failure(&job, &e.to_string()).await?,
        }
        Ok(true)
    }

    async fn handle_failure(&self, job: &LikeJob, error: &str) -> Result<(), sqlx::Error> {
        let delay = self.config.retry_delay_secs(job.attempt_count);
        match LikeJobRepo::fail(&self.pool, job.id, error, delay).await? {
            Some(LikeJobStatus::Failed) => {
                tracing::error!(
                    job_id = job.id,
                    job_key = %job.job_key,
                    attempts = job.attempt_count,
                    error,
                    "Like job exhausted its retries; durable state requires reconciliation"
                );
                self.events
                    .publish(DomainEvent::like_job_exhausted(job.id, &job.payload.0, error));
                self.recount_subject(&job.payload.0).await;
            }
            Some(LikeJobStatus::Superseded) => {
                tracing::warn!(job_id = job.id, job_key = %job.job_key, error, "Like job failed and was superseded");
            }
            Some(_) => {
                tracing::warn!(
                    job_id = job.id,
                    job_key = %job.job_key,
                    attempt = job.attempt_count,
                    retry_in_secs = delay,
                    error,
                    "Like job failed, retry scheduled"
                );
            }
            None => {
                tracing::warn!(job_id = job.id, "Like job was no longer running when its failure was recorded");
            }
        }
        Ok(())
    }

    /// Rebuild the counters of an exhausted job's subject from its like
    /// records and publish them to the cache.
    async fn recount_subject(&self, payload: &LikeJobPayload) {
        let subject = payload.subject;
        let subject_id = payload.target_id;
        match SubjectRepo::recount(&self.pool, subject, subject_id).await {
            Ok(Some(counters)) => {
                if let Err(e) = self.cache.write_committed(subject, &counters).await {
                    tracing::error!(subject = %subject, subject_id, error = %e, "Failed to cache recounted like counters");
                }
                tracing::info!(
                    subject = %subject,
                    subject_id,
                    like_count = counters.like_count,
                    dislike_count = counters.dislike_count,
                    "Recounted like counters"
                );
            }
            Ok(None) => {
                tracing::debug!(subject = %subject, subject_id, "Nothing to recount, subject is gone");
            }
            Err(e) => {
                tracing::error!(subject = %subject, subject_id, error = %e, "Failed to recount like counters");
            }
        }
    }

    /// Poll the queue until `cancel` fires, sleeping when it is empty.
    async fn poll_loop(&self, worker_index: usize, cancel: CancellationToken) {
        tracing::debug!(worker_index, "Like worker started");
        loop {
            if cancel.is_cancelled() {
                break;
            }
            let idle = match self.run_once().await {
                Ok(claimed) => !claimed,
                Err(e) => {
                    tracing::error!(worker_index, error = %e, "Like worker cycle failed");
                    true
                }
            };
            if idle {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(self.config.poll_interval) => {}
                }
            }
        }
        tracing::debug!(worker_index, "Like worker stopped");
    }

    /// Run `worker_concurrency` pollers plus stale-claim recovery until
    /// `cancel` fires. Returns once every task has stopped.
    pub async fn run(self: Arc<Self>, cancel: CancellationToken) {
        tracing::info!(
            concurrency = self.config.worker_concurrency,
            poll_interval_ms = self.config.poll_interval.as_millis() as u64,
            "Like worker pool started"
        );

        let tracker = TaskTracker::new();
        for worker_index in 0..self.config.worker_concurrency {
            let worker = Arc::clone(&self);
            let cancel = cancel.clone();
            tracker.spawn(async move { worker.poll_loop(worker_index, cancel).await });
        }
        {
            let worker = Arc::clone(&self);
            let cancel = cancel.clone();
            tracker.spawn(async move { worker.run_stale_recovery(cancel).await });
        }
        tracker.close();
        tracker.wait().await;

        tracing::info!("Like worker pool stopped");
    }

    /// Return expired claims to the queue periodically.
    pub async fn run_stale_recovery(&self, cancel: CancellationToken) {
        let period = (self.config.stale_after / 2).max(Duration::from_secs(1));
        let mut interval = tokio::time::interval(period);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = interval.tick() => {
                    match LikeJobRepo::requeue_stale(&self.pool, self.config.stale_after.as_secs_f64()).await {
                        Ok(0) => tracing::debug!("Like queue: no stale claims"),
                        Ok(released) => tracing::warn!(released, "Like queue: released stale claims"),
                        Err(e) => tracing::error!(error = %e, "Like queue: stale claim recovery failed"),
                    }
                }
            }
        }
    }
}
