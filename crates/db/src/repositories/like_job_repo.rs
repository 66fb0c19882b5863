//! Repository for the `like_jobs` queue.
//!
//! At most one pending job exists per `job_key`; enqueueing a key that is
//! already pending replaces its payload. A key is never claimed while
//! another job with the same key is running, so actions for one
//! (subject, actor, reaction) are applied in order.

use crewhub_core::likes::LikeJobPayload;
use crewhub_core::types::DbId;
use sqlx::types::Json;
use sqlx::PgPool;

use crate::models::like_job::LikeJob;
use crate::models::status::{LikeJobStatus, StatusId};

/// Column list for `like_jobs` queries.
const COLUMNS: &str = "\
    id, job_key, payload, status_id, attempt_count, max_attempts, \
    next_retry_at, claimed_at, completed_at, last_error, created_at, updated_at";

/// Provides queue operations for like jobs.
pub struct LikeJobRepo;

impl LikeJobRepo {
    /// Enqueue a job, or replace the payload of the pending job with the
    /// same key. Returns the job ID.
    pub async fn enqueue(
        pool: &PgPool,
        payload: &LikeJobPayload,
        max_attempts: i16,
    ) -> Result<DbId, sqlx::Error> {
        let query = format!(
            "INSERT INTO like_jobs (job_key, payload, status_id, max_attempts) \
             VALUES ($1, $2, $3, $4) \
             ON CONFLICT (job_key) WHERE status_id = {pending} \
             DO UPDATE SET payload = EXCLUDED.payload, attempt_count = 0, \
                 next_retry_at = NULL, last_error = NULL \
             RETURNING id",
            pending = LikeJobStatus::Pending.id()
        );
        sqlx::query_scalar(&query)
            .bind(payload.job_key())
            .bind(Json(payload))
            .bind(LikeJobStatus::Pending.id())
            .bind(max_attempts)
            .fetch_one(pool)
            .await
    }

    /// Claim the oldest due pending job whose key has nothing running.
    ///
    /// Uses `FOR UPDATE SKIP LOCKED` so concurrent workers never claim the
    /// same job. Claiming consumes one attempt.
    pub async fn claim_next(pool: &PgPool) -> Result<Option<LikeJob>, sqlx::Error> {
        let query = format!(
            "UPDATE like_jobs \
             SET status_id = $1, claimed_at = NOW(), attempt_count = attempt_count + 1 \
             WHERE id = ( \
                 SELECT j.id FROM like_jobs j \
                 WHERE j.status_id = $2 \
                   AND (j.next_retry_at IS NULL OR j.next_retry_at <= NOW()) \
                   AND NOT EXISTS ( \
                       SELECT 1 FROM like_jobs r \
                       WHERE r.job_key = j.job_key AND r.status_id = $1 \
                   ) \
                 ORDER BY j.created_at ASC, j.id ASC \
                 LIMIT 1 \
                 FOR UPDATE SKIP LOCKED \
             ) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, LikeJob>(&query)
            .bind(LikeJobStatus::Running.id())
            .bind(LikeJobStatus::Pending.id())
            .fetch_optional(pool)
            .await
    }

    /// Mark a running job as completed.
    pub async fn complete(pool: &PgPool, job_id: DbId) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE like_jobs SET status_id = $2, completed_at = NOW(), last_error = NULL \
             WHERE id = $1 AND status_id = $3",
        )
        .bind(job_id)
        .bind(LikeJobStatus::Completed.id())
        .bind(LikeJobStatus::Running.id())
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Record a failed attempt.
    ///
    /// The job becomes `failed` once attempts are exhausted, `superseded` if
    /// a newer pending job holds its key, and otherwise `pending` again with
    /// `next_retry_at = NOW() + delay_secs`. Returns the resulting status, or
    /// `None` if the job was not running.
    pub async fn fail(
        pool: &PgPool,
        job_id: DbId,
        error: &str,
        delay_secs: f64,
    ) -> Result<Option<LikeJobStatus>, sqlx::Error> {
        let status: Option<StatusId> = sqlx::query_scalar(
            "UPDATE like_jobs SET \
                 status_id = CASE \
                     WHEN attempt_count >= max_attempts THEN $4 \
                     WHEN EXISTS ( \
                         SELECT 1 FROM like_jobs p \
                         WHERE p.job_key = like_jobs.job_key AND p.status_id = $5 \
                     ) THEN $6 \
                     ELSE $5 END, \
                 last_error = $2, \
                 claimed_at = NULL, \
                 next_retry_at = NOW() + make_interval(secs => $3), \
                 completed_at = CASE WHEN attempt_count >= max_attempts THEN NOW() ELSE NULL END \
             WHERE id = $1 AND status_id = $7 \
             RETURNING status_id",
        )
        .bind(job_id)
        .bind(error)
        .bind(delay_secs)
        .bind(LikeJobStatus::Failed.id())
        .bind(LikeJobStatus::Pending.id())
        .bind(LikeJobStatus::Superseded.id())
        .bind(LikeJobStatus::Running.id())
        .fetch_optional(pool)
        .await?;
        Ok(status.and_then(LikeJobStatus::from_id))
    }

    /// Return running jobs claimed longer than `stale_after_secs` ago to the
    /// queue. Returns the number of jobs released.
    ///
    /// A released job whose key already has a pending job is superseded; a
    /// released job with no attempts left is failed.
    pub async fn requeue_stale(pool: &PgPool, stale_after_secs: f64) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE like_jobs SET \
                 status_id = CASE \
                     WHEN attempt_count >= max_attempts THEN $2 \
                     WHEN EXISTS ( \
                         SELECT 1 FROM like_jobs p \
                         WHERE p.job_key = like_jobs.job_key AND p.status_id = $3 \
                     ) THEN $4 \
                     ELSE $3 END, \
                 claimed_at = NULL, \
                 last_error = 'claim expired' \
             WHERE status_id = $5 \
               AND claimed_at < NOW() - make_interval(secs => $1)",
        )
        .bind(stale_after_secs)
        .bind(LikeJobStatus::Failed.id())
        .bind(LikeJobStatus::Pending.id())
        .bind(LikeJobStatus::Superseded.id())
        .bind(LikeJobStatus::Running.id())
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<LikeJob>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM like_jobs WHERE id = $1");
        sqlx::query_as::<_, LikeJob>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Jobs for one key, oldest first.
    pub async fn list_by_key(pool: &PgPool, job_key: &str) -> Result<Vec<LikeJob>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM like_jobs WHERE job_key = $1 ORDER BY created_at ASC, id ASC"
        );
        sqlx::query_as::<_, LikeJob>(&query)
            .bind(job_key)
            .fetch_all(pool)
            .await
    }

    /// Whether any of `job_keys` has a job that is pending or running.
    pub async fn has_active(pool: &PgPool, job_keys: &[String]) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM like_jobs WHERE job_key = ANY($1) AND status_id IN ($2, $3))",
        )
        .bind(job_keys)
        .bind(LikeJobStatus::Pending.id())
        .bind(LikeJobStatus::Running.id())
        .fetch_one(pool)
        .await
    }

    /// Number of jobs in each status.
    pub async fn count_by_status(pool: &PgPool) -> Result<Vec<(StatusId, i64)>, sqlx::Error> {
        sqlx::query_as("SELECT status_id, COUNT(*) FROM like_jobs GROUP BY status_id ORDER BY status_id")
            .fetch_all(pool)
            .await
    }
}
