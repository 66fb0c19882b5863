mod common;

use std::sync::Arc;

use assert_matches::assert_matches;
use crewhub_core::error::CoreError;
use crewhub_core::likes::{Actor, LikeAction, LikeJobPayload, LikeSubject};
use crewhub_db::models::status::LikeJobStatus;
use crewhub_db::repositories::{LikeJobRepo, SubjectRepo};
use crewhub_events::{event_types, EventBus};
use crewhub_likes::{LikeError, LikeWorker, LikesConfig, ReactionCounts};
use sqlx::PgPool;
use tokio_util::sync::CancellationToken;

use common::{create_post, memory_cache, FlakyStore};

fn config(max_attempts: i16) -> LikesConfig {
    LikesConfig {
        max_attempts,
        worker_concurrency: 2,
        poll_interval: std::time::Duration::from_millis(20),
        ..LikesConfig::default()
    }
}

// -- process ------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn process_is_idempotent(pool: PgPool) {
    let post = create_post(&pool).await;
    let (cache, _store) = memory_cache();
    let worker = LikeWorker::new(pool.clone(), cache.clone(), Arc::new(EventBus::default()), config(5));
    let payload = LikeJobPayload::new(LikeSubject::Post, post, Actor::User(6), LikeAction::Like);

    worker.process(&payload).await.unwrap();
    let counters = worker.process(&payload).await.unwrap();
    assert_eq!(counters.like_count, 1);

    // The cache is overwritten with the durable values, not incremented.
    assert_eq!(
        cache.counts(LikeSubject::Post, post).await.unwrap(),
        Some(ReactionCounts { like_count: 1, dislike_count: 0 })
    );
    // Flags belong to the optimistic path.
    assert_eq!(cache.flagged_state(LikeSubject::Post, post, &Actor::User(6)).await.unwrap(), None);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn process_rejects_missing_subject(pool: PgPool) {
    let (cache, _store) = memory_cache();
    let worker = LikeWorker::new(pool.clone(), cache, Arc::new(EventBus::default()), config(5));
    let payload = LikeJobPayload::new(LikeSubject::Post, 31337, Actor::User(6), LikeAction::Like);

    assert_matches!(
        worker.process(&payload).await,
        Err(LikeError::Core(CoreError::NotFound { .. }))
    );
}

// -- failure handling ---------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn failed_job_is_scheduled_for_retry(pool: PgPool) {
    let (cache, _store) = memory_cache();
    let worker = LikeWorker::new(pool.clone(), cache, Arc::new(EventBus::default()), config(3));
    let payload = LikeJobPayload::new(LikeSubject::Post, 31337, Actor::User(6), LikeAction::Like);
    let job_id = LikeJobRepo::enqueue(&pool, &payload, 3).await.unwrap();

    assert!(worker.run_once().await.unwrap());

    let job = LikeJobRepo::find_by_id(&pool, job_id).await.unwrap().unwrap();
    assert_eq!(LikeJobStatus::from_id(job.status_id), Some(LikeJobStatus::Pending));
    assert_eq!(job.attempt_count, 1);
    assert!(job.next_retry_at.is_some());
    assert!(job.last_error.unwrap().contains("not found"));

    // Not due yet.
    assert!(!worker.run_once().await.unwrap());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn exhausted_job_fails_and_emits_event(pool: PgPool) {
    let (cache, _store) = memory_cache();
    let bus = Arc::new(EventBus::default());
    let mut rx = bus.subscribe();
    let worker = LikeWorker::new(pool.clone(), cache, Arc::clone(&bus), config(1));
    let payload = LikeJobPayload::new(LikeSubject::Comment, 4040, Actor::Ip("10.1.1.1".into()), LikeAction::Dislike);
    let job_id = LikeJobRepo::enqueue(&pool, &payload, 1).await.unwrap();

    assert!(worker.run_once().await.unwrap());

    let job = LikeJobRepo::find_by_id(&pool, job_id).await.unwrap().unwrap();
    assert_eq!(LikeJobStatus::from_id(job.status_id), Some(LikeJobStatus::Failed));

    let event = rx.try_recv().unwrap();
    assert_eq!(event.event_type, event_types::LIKE_JOB_EXHAUSTED);
    assert_eq!(event.source_entity_id, Some(job_id));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn exhausted_job_recounts_its_subject(pool: PgPool) {
    let post = create_post(&pool).await;
    sqlx::query("UPDATE posts SET like_count = 9 WHERE id = $1")
        .bind(post)
        .execute(&pool)
        .await
        .unwrap();
    // The job's own cache write fails; the recount's write goes through.
    let cache = FlakyStore::failing_writes(1).into_cache();
    let worker = LikeWorker::new(pool.clone(), cache.clone(), Arc::new(EventBus::default()), config(1));
    let payload = LikeJobPayload::new(LikeSubject::Post, post, Actor::User(6), LikeAction::Like);
    let job_id = LikeJobRepo::enqueue(&pool, &payload, 1).await.unwrap();

    assert!(worker.run_once().await.unwrap());

    let job = LikeJobRepo::find_by_id(&pool, job_id).await.unwrap().unwrap();
    assert_eq!(LikeJobStatus::from_id(job.status_id), Some(LikeJobStatus::Failed));

    let counters = SubjectRepo::find_counters(&pool, LikeSubject::Post, post).await.unwrap().unwrap();
    assert_eq!((counters.like_count, counters.dislike_count), (1, 0));
    assert_eq!(
        cache.counts(LikeSubject::Post, post).await.unwrap(),
        Some(ReactionCounts { like_count: 1, dislike_count: 0 })
    );
}

// -- run ----------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn pool_drains_queue_and_stops_on_cancel(pool: PgPool) {
    let post = create_post(&pool).await;
    let (cache, _store) = memory_cache();
    let worker = Arc::new(LikeWorker::new(
        pool.clone(),
        cache,
        Arc::new(EventBus::default()),
        config(5),
    ));
    for user in 1..=4 {
        let payload = LikeJobPayload::new(LikeSubject::Post, post, Actor::User(user), LikeAction::Like);
        LikeJobRepo::enqueue(&pool, &payload, 5).await.unwrap();
    }

    let cancel = CancellationToken::new();
    let handle = tokio::spawn(Arc::clone(&worker).run(cancel.clone()));

    let mut like_count = 0;
    for _ in 0..100 {
        like_count = SubjectRepo::find_counters(&pool, LikeSubject::Post, post)
            .await
            .unwrap()
            .unwrap()
            .like_count;
        if like_count == 4 {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    }
    cancel.cancel();
    handle.await.unwrap();

    assert_eq!(like_count, 4);
}
