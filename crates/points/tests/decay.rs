use std::sync::Arc;
use std::time::Duration;

use assert_matches::assert_matches;
use chrono::Utc;
use crewhub_core::rank::Rank;
use crewhub_db::repositories::UserLevelRepo;
use crewhub_events::{event_types, EventBus};
use crewhub_points::{DecayConfig, DecaySweeper, UserDecayResult};
use sqlx::PgPool;

async fn insert_level(pool: &PgPool, user_id: i64, points: f64, rank: Rank, inactive_days: i64) {
    sqlx::query(
        "INSERT INTO user_levels (user_id, activity_points, rank, rank_category, last_activity_at) \
         VALUES ($1, $2, $3, $4, NOW() - make_interval(days => $5))",
    )
    .bind(user_id)
    .bind(points)
    .bind(rank.as_str())
    .bind(rank.category().as_str())
    .bind(inactive_days as i32)
    .execute(pool)
    .await
    .unwrap();
}

fn sweeper(pool: &PgPool, bus: Arc<EventBus>) -> DecaySweeper {
    DecaySweeper::new(pool.clone(), bus, DecayConfig::default())
}

// -- sweep --------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn sixty_five_days_inactive_loses_two_periods(pool: PgPool) {
    insert_level(&pool, 1, 1000.0, Rank::StaffSergeant, 65).await;
    let bus = Arc::new(EventBus::default());
    let mut rx = bus.subscribe();

    let now = Utc::now();
    let report = sweeper(&pool, bus.clone()).sweep_at(now).await.unwrap();
    assert_eq!(report.scanned, 1);
    assert_eq!(report.reduced, 1);
    assert!(report.failures.is_empty());

    let level = UserLevelRepo::find_by_user(&pool, 1).await.unwrap().unwrap();
    assert_eq!(level.activity_points, 800.0);
    assert_eq!(level.rank, Rank::Sergeant);
    let reduced_at = level.last_points_reduction_at.unwrap();
    assert!((reduced_at - now).num_milliseconds().abs() < 1);
    assert_eq!(level.rank_history.0.len(), 1);
    assert!(level.rank_history.0[0].reason.contains("-200 points over 2 period(s)"));

    let decayed = rx.recv().await.unwrap();
    assert_eq!(decayed.event_type, event_types::POINTS_DECAYED);
    let changed = rx.recv().await.unwrap();
    assert_eq!(changed.event_type, event_types::RANK_CHANGED);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn second_sweep_in_same_period_does_nothing(pool: PgPool) {
    insert_level(&pool, 1, 1000.0, Rank::StaffSergeant, 65).await;
    let sweeper = sweeper(&pool, Arc::new(EventBus::default()));

    sweeper.apply_inactivity_decay().await.unwrap();
    let report = sweeper.apply_inactivity_decay().await.unwrap();
    assert_eq!(report.scanned, 1);
    assert_eq!(report.reduced, 0);
    assert_eq!(report.skipped, 1);

    let level = UserLevelRepo::find_by_user(&pool, 1).await.unwrap().unwrap();
    assert_eq!(level.activity_points, 800.0);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn decay_is_floored_at_zero(pool: PgPool) {
    insert_level(&pool, 2, 150.0, Rank::PrivateFirstClass, 95).await;
    let sweeper = sweeper(&pool, Arc::new(EventBus::default()));

    let result = sweeper.decay_user(2, Utc::now()).await.unwrap();
    assert_matches!(result, UserDecayResult::Reduced { outcome, .. } if outcome.points_after == 0.0);

    let level = UserLevelRepo::find_by_user(&pool, 2).await.unwrap().unwrap();
    assert_eq!(level.activity_points, 0.0);
    assert_eq!(level.rank, Rank::PrivateSecondClass);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn user_at_floor_only_moves_reduction_timestamp(pool: PgPool) {
    insert_level(&pool, 3, 0.0, Rank::PrivateSecondClass, 40).await;
    let sweeper = sweeper(&pool, Arc::new(EventBus::default()));

    let result = sweeper.decay_user(3, Utc::now()).await.unwrap();
    assert_eq!(result, UserDecayResult::AtFloor);

    let level = UserLevelRepo::find_by_user(&pool, 3).await.unwrap().unwrap();
    assert!(level.last_points_reduction_at.is_some());
    assert!(level.rank_history.0.is_empty());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn active_users_are_not_scanned(pool: PgPool) {
    insert_level(&pool, 4, 500.0, Rank::Corporal, 5).await;
    let report = sweeper(&pool, Arc::new(EventBus::default()))
        .apply_inactivity_decay()
        .await
        .unwrap();
    assert_eq!(report.scanned, 0);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn locked_user_times_out_without_stopping_sweep(pool: PgPool) {
    for user_id in 1..=3 {
        insert_level(&pool, user_id, 1000.0, Rank::StaffSergeant, 35).await;
    }

    // Hold user 2's row so the sweep cannot lock it.
    let mut blocker = pool.begin().await.unwrap();
    UserLevelRepo::lock_by_user(&mut blocker, 2).await.unwrap();

    let config = DecayConfig {
        user_timeout: Duration::from_millis(300),
        batch_size: 2,
        ..DecayConfig::default()
    };
    let sweeper = DecaySweeper::new(pool.clone(), Arc::new(EventBus::default()), config);
    let report = sweeper.apply_inactivity_decay().await.unwrap();
    blocker.rollback().await.unwrap();

    assert_eq!(report.scanned, 3);
    assert_eq!(report.reduced, 2);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].user_id, 2);

    let untouched = UserLevelRepo::find_by_user(&pool, 2).await.unwrap().unwrap();
    assert_eq!(untouched.activity_points, 1000.0);
    let decayed = UserLevelRepo::find_by_user(&pool, 3).await.unwrap().unwrap();
    assert_eq!(decayed.activity_points, 900.0);
}
