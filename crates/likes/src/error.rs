use crewhub_cache::CacheError;
use crewhub_core::error::CoreError;

/// Errors from the like services.
#[derive(Debug, thiserror::Error)]
pub enum LikeError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),
}
