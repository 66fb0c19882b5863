//! In-process [`CacheStore`].

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::{CacheError, CacheStore};

struct Entry {
    value: i64,
    expires_at: Instant,
}

/// Cache held in a single mutex-guarded map.
///
/// Expired entries are dropped lazily on access.
#[derive(Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, Entry>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live entries.
    pub async fn len(&self) -> usize {
        let now = Instant::now();
        let entries = self.entries.lock().await;
        entries.values().filter(|e| e.expires_at > now).count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

fn live(entries: &mut HashMap<String, Entry>, key: &str) -> Option<i64> {
    let now = Instant::now();
    match entries.get(key) {
        Some(entry) if entry.expires_at > now => Some(entry.value),
        Some(_) => {
            entries.remove(key);
            None
        }
        None => None,
    }
}

#[async_trait]
impl CacheStore for MemoryCache {
    async fn get_i64(&self, key: &str) -> Result<Option<i64>, CacheError> {
        let mut entries = self.entries.lock().await;
        Ok(live(&mut entries, key))
    }

    async fn set_i64(&self, key: &str, value: i64, ttl: Duration) -> Result<(), CacheError> {
        let mut entries = self.entries.lock().await;
        entries.insert(
            key.to_string(),
            Entry {
                value,
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(())
    }

    async fn set_i64_if_newer(
        &self,
        values: &[(&str, i64)],
        version_key: &str,
        version: i64,
        ttl: Duration,
    ) -> Result<bool, CacheError> {
        let mut entries = self.entries.lock().await;
        if live(&mut entries, version_key).is_some_and(|stored| stored >= version) {
            return Ok(false);
        }
        let expires_at = Instant::now() + ttl;
        for (key, value) in values {
            entries.insert(
                key.to_string(),
                Entry {
                    value: *value,
                    expires_at,
                },
            );
        }
        entries.insert(
            version_key.to_string(),
            Entry {
                value: version,
                expires_at,
            },
        );
        Ok(true)
    }

    async fn incr_by(&self, key: &str, delta: i64, ttl: Duration) -> Result<i64, CacheError> {
        let mut entries = self.entries.lock().await;
        let value = live(&mut entries, key).unwrap_or(0) + delta;
        entries.insert(
            key.to_string(),
            Entry {
                value,
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(value)
    }

    async fn decr_floor(&self, key: &str, amount: i64, ttl: Duration) -> Result<i64, CacheError> {
        let mut entries = self.entries.lock().await;
        let value = (live(&mut entries, key).unwrap_or(0) - amount).max(0);
        entries.insert(
            key.to_string(),
            Entry {
                value,
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(value)
    }

    async fn exists(&self, key: &str) -> Result<bool, CacheError> {
        let mut entries = self.entries.lock().await;
        Ok(live(&mut entries, key).is_some())
    }

    async fn set_flag(&self, key: &str, ttl: Duration) -> Result<(), CacheError> {
        self.set_i64(key, 1, ttl).await
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.entries.lock().await.remove(key);
        Ok(())
    }
}
