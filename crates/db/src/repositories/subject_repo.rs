//! Durable like/dislike counters on `posts` and `comments`.

use crewhub_core::likes::LikeSubject;
use crewhub_core::types::DbId;
use sqlx::{PgConnection, PgExecutor, PgPool};

use crate::models::like::{CounterDelta, SubjectCounters};

fn subject_table(subject: LikeSubject) -> &'static str {
    match subject {
        LikeSubject::Post => "posts",
        LikeSubject::Comment => "comments",
    }
}

const COUNTER_COLUMNS: &str = "id, like_count, dislike_count, counter_version";

pub struct SubjectRepo;

impl SubjectRepo {
    pub async fn exists<'e>(
        executor: impl PgExecutor<'e>,
        subject: LikeSubject,
        id: DbId,
    ) -> Result<bool, sqlx::Error> {
        let table = subject_table(subject);
        sqlx::query_scalar(&format!("SELECT EXISTS(SELECT 1 FROM {table} WHERE id = $1)"))
            .bind(id)
            .fetch_one(executor)
            .await
    }

    pub async fn find_counters(
        pool: &PgPool,
        subject: LikeSubject,
        id: DbId,
    ) -> Result<Option<SubjectCounters>, sqlx::Error> {
        let table = subject_table(subject);
        let query = format!("SELECT {COUNTER_COLUMNS} FROM {table} WHERE id = $1");
        sqlx::query_as::<_, SubjectCounters>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Move the counters by `delta`, clamping each at zero.
    ///
    /// Returns the counters after the update, or `None` if the subject no
    /// longer exists.
    pub async fn adjust_counters(
        conn: &mut PgConnection,
        subject: LikeSubject,
        id: DbId,
        delta: CounterDelta,
    ) -> Result<Option<SubjectCounters>, sqlx::Error> {
        let table = subject_table(subject);
        let query = format!(
            "UPDATE {table} SET \
                 like_count = GREATEST(like_count + $2, 0), \
                 dislike_count = GREATEST(dislike_count + $3, 0), \
                 counter_version = counter_version + 1 \
             WHERE id = $1 \
             RETURNING {COUNTER_COLUMNS}"
        );
        sqlx::query_as::<_, SubjectCounters>(&query)
            .bind(id)
            .bind(delta.likes)
            .bind(delta.dislikes)
            .fetch_optional(conn)
            .await
    }

    /// Recount a subject's counters from its like records.
    pub async fn recount(
        pool: &PgPool,
        subject: LikeSubject,
        id: DbId,
    ) -> Result<Option<SubjectCounters>, sqlx::Error> {
        let table = subject_table(subject);
        let (likes_table, subject_col) = crate::repositories::like_repo::like_table(subject);
        let query = format!(
            "UPDATE {table} s SET \
                 like_count = c.likes, dislike_count = c.dislikes, \
                 counter_version = s.counter_version + 1 \
             FROM ( \
                 SELECT COUNT(*) FILTER (WHERE NOT is_dislike)::INTEGER AS likes, \
                        COUNT(*) FILTER (WHERE is_dislike)::INTEGER AS dislikes \
                 FROM {likes_table} WHERE {subject_col} = $1 \
             ) c \
             WHERE s.id = $1 \
             RETURNING s.id, s.like_count, s.dislike_count, s.counter_version"
        );
        sqlx::query_as::<_, SubjectCounters>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }
}
