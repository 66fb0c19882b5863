use std::sync::Arc;
use std::time::Duration;

use crewhub_cache::{CacheStore, MemoryCache, RedisCache};
use crewhub_events::{EventBus, EventPersistence};
use crewhub_likes::{LikeCache, LikeWorker, LikesConfig};
use crewhub_points::{DecayConfig, DecaySweeper};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "crewhub_worker=debug,crewhub_likes=debug,crewhub_points=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let likes_config = LikesConfig::from_env();
    let decay_config = DecayConfig::from_env();
    tracing::info!(
        concurrency = likes_config.worker_concurrency,
        max_attempts = likes_config.max_attempts,
        sweep_interval_secs = decay_config.sweep_interval.as_secs(),
        "Loaded worker configuration"
    );

    // --- Database ---
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = crewhub_db::create_pool(&database_url)
        .await
        .expect("Failed to connect to database");
    tracing::info!("Database connection pool created");

    crewhub_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database migrations applied");

    // --- Cache ---
    let store: Arc<dyn CacheStore> = match std::env::var("REDIS_URL") {
        Ok(url) => Arc::new(
            RedisCache::connect(&url)
                .await
                .expect("Failed to connect to Redis"),
        ),
        Err(_) => {
            tracing::warn!("REDIS_URL not set, using in-process cache");
            Arc::new(MemoryCache::new())
        }
    };
    let cache = LikeCache::new(store, likes_config.cache_ttl);

    // --- Event bus ---
    // Persistence stops last so events published during shutdown are kept.
    let cancel = CancellationToken::new();
    let persistence_cancel = CancellationToken::new();
    let event_bus = Arc::new(EventBus::default());
    let persistence_handle = tokio::spawn(
        EventPersistence::new(pool.clone()).run(event_bus.subscribe(), persistence_cancel.clone()),
    );

    // --- Like job workers ---
    let like_worker = Arc::new(LikeWorker::new(
        pool.clone(),
        cache,
        Arc::clone(&event_bus),
        likes_config,
    ));
    let like_handle = tokio::spawn(Arc::clone(&like_worker).run(cancel.clone()));

    // --- Decay scheduler ---
    let sweeper = DecaySweeper::new(pool.clone(), Arc::clone(&event_bus), decay_config);
    let decay_cancel = cancel.clone();
    let decay_handle = tokio::spawn(async move {
        sweeper.run(decay_cancel).await;
    });

    tracing::info!("Worker started (like jobs, stale claim recovery, decay scheduler)");

    shutdown_signal().await;
    cancel.cancel();

    let _ = tokio::time::timeout(Duration::from_secs(30), like_handle).await;
    tracing::info!("Like workers stopped");
    let _ = tokio::time::timeout(Duration::from_secs(30), decay_handle).await;
    tracing::info!("Decay scheduler stopped");
    persistence_cancel.cancel();
    let _ = tokio::time::timeout(Duration::from_secs(5), persistence_handle).await;
    tracing::info!("Event persistence stopped");

    tracing::info!("Graceful shutdown complete");
}

/// Wait for SIGINT or (on Unix) SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("Received SIGINT (Ctrl-C), shutting down"),
        () = terminate => tracing::info!("Received SIGTERM, shutting down"),
    }
}
