use std::sync::Arc;

use crewhub_cache::CacheStore;
use crewhub_events::EventBus;
use crewhub_likes::{LikeCache, LikeService, LikesConfig};
use crewhub_points::{ActivityLedger, DecayConfig, DecaySweeper};

use crate::config::ServerConfig;

/// Shared application state available to all handlers via `State<AppState>`.
///
/// Cheaply cloneable: everything is behind `Arc` or is a pool handle.
#[derive(Clone)]
pub struct AppState {
    pub pool: crewhub_db::DbPool,
    pub config: Arc<ServerConfig>,
    pub event_bus: Arc<EventBus>,
    pub ledger: Arc<ActivityLedger>,
    pub decay: Arc<DecaySweeper>,
    pub likes: Arc<LikeService>,
}

impl AppState {
    /// Wire the services over one pool, cache and event bus.
    pub fn new(
        pool: crewhub_db::DbPool,
        config: ServerConfig,
        store: Arc<dyn CacheStore>,
        event_bus: Arc<EventBus>,
        likes_config: &LikesConfig,
        decay_config: DecayConfig,
    ) -> Self {
        let cache = LikeCache::new(store, likes_config.cache_ttl);
        Self {
            ledger: Arc::new(ActivityLedger::new(pool.clone(), Arc::clone(&event_bus))),
            decay: Arc::new(DecaySweeper::new(pool.clone(), Arc::clone(&event_bus), decay_config)),
            likes: Arc::new(LikeService::new(pool.clone(), cache, likes_config)),
            pool,
            config: Arc::new(config),
            event_bus,
        }
    }
}
