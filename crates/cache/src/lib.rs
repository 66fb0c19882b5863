//! Shared key-value cache used for optimistic like counters and per-actor
//! reaction flags.
//!
//! [`CacheStore`] is the seam: [`RedisCache`] talks to the shared Redis
//! instance, [`MemoryCache`] keeps everything in-process for single-node
//! runs and tests.

use std::time::Duration;

use async_trait::async_trait;

pub mod memory;
pub mod redis_store;

pub use memory::MemoryCache;
pub use redis_store::RedisCache;

/// Default expiry for counters and flags (24 hours).
pub const DEFAULT_TTL: Duration = Duration::from_secs(86_400);

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Cache value at '{key}' is not an integer")]
    NotAnInteger { key: String },
}

/// Integer counters and boolean flags with expiry.
///
/// Every write refreshes the key's TTL.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Read an integer value.
    async fn get_i64(&self, key: &str) -> Result<Option<i64>, CacheError>;

    /// Overwrite an integer value.
    async fn set_i64(&self, key: &str, value: i64, ttl: Duration) -> Result<(), CacheError>;

    /// Atomically overwrite `values` and store `version` under
    /// `version_key`, unless that key already holds a version at least as
    /// new. Returns whether the write happened.
    async fn set_i64_if_newer(
        &self,
        values: &[(&str, i64)],
        version_key: &str,
        version: i64,
        ttl: Duration,
    ) -> Result<bool, CacheError>;

    /// Atomically add `delta` and return the new value. A missing key
    /// starts at zero.
    async fn incr_by(&self, key: &str, delta: i64, ttl: Duration) -> Result<i64, CacheError>;

    /// Atomically subtract `amount`, never going below zero, and return the
    /// new value.
    async fn decr_floor(&self, key: &str, amount: i64, ttl: Duration) -> Result<i64, CacheError>;

    /// Whether a key is present.
    async fn exists(&self, key: &str) -> Result<bool, CacheError>;

    /// Set a presence flag.
    async fn set_flag(&self, key: &str, ttl: Duration) -> Result<(), CacheError>;

    /// Remove a key. Removing a missing key is not an error.
    async fn delete(&self, key: &str) -> Result<(), CacheError>;
}
