mod common;

use std::time::Duration;

use assert_matches::assert_matches;
use crewhub_core::error::CoreError;
use crewhub_core::likes::{Actor, LikeAction, LikeState, LikeSubject};
use crewhub_db::repositories::SubjectRepo;
use crewhub_likes::{DirectLikes, LikeError, ReactionCounts};
use sqlx::PgPool;

use common::{create_comment, create_post, like_rows, memory_cache, FlakyStore};

// -- toggle -------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn like_is_durable_and_mirrored(pool: PgPool) {
    let post = create_post(&pool).await;
    let (cache, _store) = memory_cache();
    let likes = DirectLikes::new(pool.clone(), cache.clone());
    let actor = Actor::User(3);

    let result = likes.toggle(LikeSubject::Post, post, &actor, LikeAction::Like).await.unwrap();
    assert!(result.changed);
    assert_eq!(result.state, LikeState::Liked);
    assert_eq!(result.counts, ReactionCounts { like_count: 1, dislike_count: 0 });

    let counters = SubjectRepo::find_counters(&pool, LikeSubject::Post, post).await.unwrap().unwrap();
    assert_eq!((counters.like_count, counters.dislike_count), (1, 0));
    assert_eq!(cache.counts(LikeSubject::Post, post).await.unwrap(), Some(result.counts));
    assert_eq!(
        cache.flagged_state(LikeSubject::Post, post, &actor).await.unwrap(),
        Some(LikeState::Liked)
    );
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn repeated_like_changes_nothing(pool: PgPool) {
    let post = create_post(&pool).await;
    let (cache, _store) = memory_cache();
    let likes = DirectLikes::new(pool.clone(), cache);
    let actor = Actor::User(3);

    likes.toggle(LikeSubject::Post, post, &actor, LikeAction::Like).await.unwrap();
    let again = likes.toggle(LikeSubject::Post, post, &actor, LikeAction::Like).await.unwrap();

    assert!(!again.changed);
    assert_eq!(again.counts.like_count, 1);
    assert_eq!(like_rows(&pool, post).await, 1);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn dislike_then_like_flips(pool: PgPool) {
    let post = create_post(&pool).await;
    let comment = create_comment(&pool, post).await;
    let (cache, _store) = memory_cache();
    let likes = DirectLikes::new(pool.clone(), cache);
    let actor = Actor::Ip("192.168.1.20".into());

    let disliked = likes
        .toggle(LikeSubject::Comment, comment, &actor, LikeAction::Dislike)
        .await
        .unwrap();
    assert_eq!(disliked.counts, ReactionCounts { like_count: 0, dislike_count: 1 });

    let liked = likes
        .toggle(LikeSubject::Comment, comment, &actor, LikeAction::Like)
        .await
        .unwrap();
    assert_eq!(liked.state, LikeState::Liked);
    assert_eq!(liked.counts, ReactionCounts { like_count: 1, dislike_count: 0 });
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn unlike_without_like_stays_at_zero(pool: PgPool) {
    let post = create_post(&pool).await;
    let (cache, _store) = memory_cache();
    let likes = DirectLikes::new(pool.clone(), cache);

    let result = likes
        .toggle(LikeSubject::Post, post, &Actor::User(1), LikeAction::Unlike)
        .await
        .unwrap();
    assert!(!result.changed);
    assert_eq!(result.counts, ReactionCounts::default());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn missing_subject_is_not_found(pool: PgPool) {
    let (cache, _store) = memory_cache();
    let likes = DirectLikes::new(pool.clone(), cache);

    let err = likes
        .toggle(LikeSubject::Post, 424242, &Actor::User(1), LikeAction::Like)
        .await
        .unwrap_err();
    assert_matches!(err, LikeError::Core(CoreError::NotFound { .. }));
}

// -- concurrency --------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn concurrent_anonymous_likes_all_count(pool: PgPool) {
    let post = create_post(&pool).await;
    let (cache, _store) = memory_cache();
    let likes = DirectLikes::new(pool.clone(), cache.clone());

    let actors: Vec<Actor> = ["10.0.0.1", "10.0.0.2", "10.0.0.3"]
        .into_iter()
        .map(|ip| Actor::Ip(ip.into()))
        .collect();
    let results = futures::future::join_all(
        actors
            .iter()
            .map(|actor| likes.toggle(LikeSubject::Post, post, actor, LikeAction::Like)),
    )
    .await;
    for result in results {
        assert!(result.unwrap().changed);
    }

    let counters = SubjectRepo::find_counters(&pool, LikeSubject::Post, post).await.unwrap().unwrap();
    assert_eq!(counters.like_count, 3);
    assert_eq!(like_rows(&pool, post).await, 3);
    assert_eq!(
        cache.counts(LikeSubject::Post, post).await.unwrap(),
        Some(ReactionCounts { like_count: 3, dislike_count: 0 })
    );
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn concurrent_mixed_reactions_keep_cache_equal_to_durable(pool: PgPool) {
    let post = create_post(&pool).await;
    let (cache, _store) = memory_cache();
    let likes = DirectLikes::new(pool.clone(), cache.clone());

    let actors: Vec<(Actor, LikeAction)> = (1..=10)
        .map(|user| {
            let action = if user % 3 == 0 { LikeAction::Dislike } else { LikeAction::Like };
            (Actor::User(user), action)
        })
        .collect();
    let results = futures::future::join_all(
        actors
            .iter()
            .map(|(actor, action)| likes.toggle(LikeSubject::Post, post, actor, *action)),
    )
    .await;
    assert!(results.iter().all(|r| r.as_ref().unwrap().changed));

    let counters = SubjectRepo::find_counters(&pool, LikeSubject::Post, post).await.unwrap().unwrap();
    assert_eq!((counters.like_count, counters.dislike_count), (7, 3));
    assert_eq!(
        cache.counts(LikeSubject::Post, post).await.unwrap(),
        Some(ReactionCounts::from(counters))
    );
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn late_cache_write_does_not_roll_back_counts(pool: PgPool) {
    let post = create_post(&pool).await;
    let cache = FlakyStore::delaying_first_write(Duration::from_millis(400)).into_cache();
    let likes = DirectLikes::new(pool.clone(), cache.clone());

    let first = {
        let likes = likes.clone();
        tokio::spawn(async move {
            likes
                .toggle(LikeSubject::Post, post, &Actor::User(1), LikeAction::Like)
                .await
        })
    };
    tokio::time::sleep(Duration::from_millis(100)).await;
    let second = likes
        .toggle(LikeSubject::Post, post, &Actor::User(2), LikeAction::Like)
        .await
        .unwrap();
    let first = first.await.unwrap().unwrap();

    let mut answered = [first.counts.like_count, second.counts.like_count];
    answered.sort_unstable();
    assert_eq!(answered, [1, 2]);

    let counters = SubjectRepo::find_counters(&pool, LikeSubject::Post, post).await.unwrap().unwrap();
    assert_eq!(counters.like_count, 2);
    assert_eq!(
        cache.counts(LikeSubject::Post, post).await.unwrap(),
        Some(ReactionCounts::from(counters))
    );
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn concurrent_toggles_from_one_actor_apply_once(pool: PgPool) {
    let post = create_post(&pool).await;
    let (cache, _store) = memory_cache();
    let likes = DirectLikes::new(pool.clone(), cache);
    let actor = Actor::User(77);

    let results = futures::future::join_all(
        (0..3).map(|_| likes.toggle(LikeSubject::Post, post, &actor, LikeAction::Like)),
    )
    .await;
    let changed = results.into_iter().filter(|r| r.as_ref().unwrap().changed).count();
    assert_eq!(changed, 1);

    let counters = SubjectRepo::find_counters(&pool, LikeSubject::Post, post).await.unwrap().unwrap();
    assert_eq!(counters.like_count, 1);
    assert_eq!(like_rows(&pool, post).await, 1);
}
