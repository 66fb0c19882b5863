use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use crewhub_cache::{CacheStore, MemoryCache, RedisCache};
use crewhub_events::{EventBus, EventPersistence};
use crewhub_likes::{LikeStrategy, LikesConfig};
use crewhub_points::DecayConfig;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crewhub_api::config::ServerConfig;
use crewhub_api::router::build_app_router;
use crewhub_api::state::AppState;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "crewhub_api=debug,crewhub_likes=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    let likes_config = LikesConfig::from_env();
    let decay_config = DecayConfig::from_env();
    tracing::info!(
        host = %config.host,
        port = %config.port,
        like_strategy = ?likes_config.strategy,
        "Loaded server configuration"
    );

    // --- Database ---
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = crewhub_db::create_pool(&database_url)
        .await
        .expect("Failed to connect to database");
    tracing::info!("Database connection pool created");

    crewhub_db::health_check(&pool)
        .await
        .expect("Database health check failed");
    tracing::info!("Database health check passed");

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

    // --- Event bus ---
    let event_bus = Arc::new(EventBus::default());
    let persistence_cancel = CancellationToken::new();
    let persistence_handle = tokio::spawn(
        EventPersistence::new(pool.clone()).run(event_bus.subscribe(), persistence_cancel.clone()),
    );

    // --- App state ---
    let state = AppState::new(
        pool,
        config.clone(),
        store,
        Arc::clone(&event_bus),
        &likes_config,
        decay_config,
    );

    // --- Like flush timer ---
    let flush_cancel = CancellationToken::new();
    let flush_handle = (likes_config.strategy == LikeStrategy::Batched).then(|| {
        tokio::spawn(
            Arc::clone(state.likes.batcher())
                .run_flush_timer(likes_config.flush_interval, flush_cancel.clone()),
        )
    });

    // --- Start server ---
    let app = build_app_router(state);
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");

    flush_cancel.cancel();
    if let Some(handle) = flush_handle {
        let _ = tokio::time::timeout(Duration::from_secs(10), handle).await;
        tracing::info!("Like flush timer stopped");
    }

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
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
