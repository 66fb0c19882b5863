//! Repository for `post_likes` and `comment_likes`.
//!
//! Both tables share one shape; the subject column differs. Each
//! (subject, actor) pair holds at most one record, enforced by partial
//! unique indexes on the user and IP columns.

use crewhub_core::likes::{Actor, LikeAction, LikeSubject, Reaction};
use crewhub_core::types::DbId;
use sqlx::postgres::PgArguments;
use sqlx::{PgConnection, PgExecutor, Postgres};

use crate::models::like::{CounterDelta, LikeRecord};

/// Table and subject column for a subject kind.
pub(crate) fn like_table(subject: LikeSubject) -> (&'static str, &'static str) {
    match subject {
        LikeSubject::Post => ("post_likes", "post_id"),
        LikeSubject::Comment => ("comment_likes", "comment_id"),
    }
}

fn actor_column(actor: &Actor) -> &'static str {
    match actor {
        Actor::User(_) => "user_id",
        Actor::Ip(_) => "ip_address",
    }
}

fn bind_actor<'q, O>(
    query: sqlx::query::QueryAs<'q, Postgres, O, PgArguments>,
    actor: &'q Actor,
) -> sqlx::query::QueryAs<'q, Postgres, O, PgArguments> {
    match actor {
        Actor::User(id) => query.bind(*id),
        Actor::Ip(ip) => query.bind(ip.as_str()),
    }
}

pub struct LikeRepo;

impl LikeRepo {
    /// Current record for (subject, actor), if any.
    pub async fn find<'e>(
        executor: impl PgExecutor<'e>,
        subject: LikeSubject,
        subject_id: DbId,
        actor: &Actor,
    ) -> Result<Option<LikeRecord>, sqlx::Error> {
        let (table, subject_col) = like_table(subject);
        let actor_col = actor_column(actor);
        let query = format!(
            "SELECT id, {subject_col} AS subject_id, user_id, ip_address, is_dislike, created_at \
             FROM {table} WHERE {subject_col} = $1 AND {actor_col} = $2"
        );
        let q = sqlx::query_as::<_, LikeRecord>(&query).bind(subject_id);
        bind_actor(q, actor).fetch_optional(executor).await
    }

    /// Serialize writers of one (subject, actor) pair for the rest of the
    /// caller's transaction.
    pub async fn lock_pair(
        conn: &mut PgConnection,
        subject: LikeSubject,
        subject_id: DbId,
        actor: &Actor,
    ) -> Result<(), sqlx::Error> {
        let key = format!("{}:{subject_id}:{}", subject.as_str(), actor.key());
        sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
            .bind(key)
            .execute(conn)
            .await?;
        Ok(())
    }

    /// Apply one net action to the durable record and report the counter
    /// movement it implies.
    ///
    /// Idempotent: applying an action whose effect is already present moves
    /// nothing. A positive action against the opposite reaction flips the
    /// record in place.
    pub async fn apply(
        conn: &mut PgConnection,
        subject: LikeSubject,
        subject_id: DbId,
        actor: &Actor,
        action: LikeAction,
    ) -> Result<CounterDelta, sqlx::Error> {
        let (table, subject_col) = like_table(subject);
        let actor_col = actor_column(actor);
        let is_dislike = action.base() == Reaction::Dislike;

        if action.is_removal() {
            let query = format!(
                "DELETE FROM {table} \
                 WHERE {subject_col} = $1 AND {actor_col} = $2 AND is_dislike = $3 \
                 RETURNING id"
            );
            let q = sqlx::query_as::<_, (DbId,)>(&query).bind(subject_id);
            let removed = bind_actor(q, actor)
                .bind(is_dislike)
                .fetch_optional(conn)
                .await?;
            return Ok(match removed {
                None => CounterDelta::default(),
                Some(_) if is_dislike => CounterDelta { likes: 0, dislikes: -1 },
                Some(_) => CounterDelta { likes: -1, dislikes: 0 },
            });
        }

        let query = format!(
            "INSERT INTO {table} ({subject_col}, {actor_col}, is_dislike) VALUES ($1, $2, $3) \
             ON CONFLICT ({subject_col}, {actor_col}) WHERE {actor_col} IS NOT NULL \
             DO UPDATE SET is_dislike = EXCLUDED.is_dislike \
             WHERE {table}.is_dislike <> EXCLUDED.is_dislike \
             RETURNING (xmax = 0) AS inserted"
        );
        let q = sqlx::query_as::<_, (bool,)>(&query).bind(subject_id);
        let written = bind_actor(q, actor)
            .bind(is_dislike)
            .fetch_optional(conn)
            .await?;

        let added = if is_dislike {
            CounterDelta { likes: 0, dislikes: 1 }
        } else {
            CounterDelta { likes: 1, dislikes: 0 }
        };
        Ok(match written {
            None => CounterDelta::default(),
            Some((true,)) => added,
            Some((false,)) if is_dislike => CounterDelta { likes: -1, dislikes: 1 },
            Some((false,)) => CounterDelta { likes: 1, dislikes: -1 },
        })
    }
}
