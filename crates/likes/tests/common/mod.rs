#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use crewhub_cache::{CacheError, CacheStore, MemoryCache, DEFAULT_TTL};
use crewhub_likes::LikeCache;
use sqlx::PgPool;

pub fn memory_cache() -> (LikeCache, Arc<MemoryCache>) {
    let store = Arc::new(MemoryCache::new());
    (LikeCache::new(store.clone(), DEFAULT_TTL), store)
}

/// In-process store whose versioned writes can be held back or refused.
#[derive(Default)]
pub struct FlakyStore {
    inner: MemoryCache,
    first_write_delay: Option<Duration>,
    delayed: AtomicBool,
    failures_left: AtomicUsize,
}

impl FlakyStore {
    /// Sleep `delay` before the first versioned write.
    pub fn delaying_first_write(delay: Duration) -> Self {
        Self {
            first_write_delay: Some(delay),
            ..Self::default()
        }
    }

    /// Fail the first `count` versioned writes.
    pub fn failing_writes(count: usize) -> Self {
        Self {
            failures_left: AtomicUsize::new(count),
            ..Self::default()
        }
    }

    pub fn into_cache(self) -> LikeCache {
        LikeCache::new(Arc::new(self), DEFAULT_TTL)
    }
}

#[async_trait]
impl CacheStore for FlakyStore {
    async fn get_i64(&self, key: &str) -> Result<Option<i64>, CacheError> {
        self.inner.get_i64(key).await
    }

    async fn set_i64(&self, key: &str, value: i64, ttl: Duration) -> Result<(), CacheError> {
        self.inner.set_i64(key, value, ttl).await
    }

    async fn set_i64_if_newer(
        &self,
        values: &[(&str, i64)],
        version_key: &str,
        version: i64,
        ttl: Duration,
    ) -> Result<bool, CacheError> {
        if let Some(delay) = self.first_write_delay {
            if !self.delayed.swap(true, Ordering::SeqCst) {
                tokio::time::sleep(delay).await;
            }
        }
        let refused = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if refused {
            return Err(CacheError::NotAnInteger {
                key: version_key.to_string(),
            });
        }
        self.inner.set_i64_if_newer(values, version_key, version, ttl).await
    }

    async fn incr_by(&self, key: &str, delta: i64, ttl: Duration) -> Result<i64, CacheError> {
        self.inner.incr_by(key, delta, ttl).await
    }

    async fn decr_floor(&self, key: &str, amount: i64, ttl: Duration) -> Result<i64, CacheError> {
        self.inner.decr_floor(key, amount, ttl).await
    }

    async fn exists(&self, key: &str) -> Result<bool, CacheError> {
        self.inner.exists(key).await
    }

    async fn set_flag(&self, key: &str, ttl: Duration) -> Result<(), CacheError> {
        self.inner.set_flag(key, ttl).await
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.inner.delete(key).await
    }
}

pub async fn create_post(pool: &PgPool) -> i64 {
    sqlx::query_scalar("INSERT INTO posts (author_id) VALUES (1) RETURNING id")
        .fetch_one(pool)
        .await
        .unwrap()
}

pub async fn create_comment(pool: &PgPool, post_id: i64) -> i64 {
    sqlx::query_scalar("INSERT INTO comments (post_id, author_id) VALUES ($1, 1) RETURNING id")
        .bind(post_id)
        .fetch_one(pool)
        .await
        .unwrap()
}

pub async fn like_rows(pool: &PgPool, post_id: i64) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM post_likes WHERE post_id = $1")
        .bind(post_id)
        .fetch_one(pool)
        .await
        .unwrap()
}
