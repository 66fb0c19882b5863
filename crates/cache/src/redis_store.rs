//! Redis-backed [`CacheStore`].

use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;

use crate::{CacheError, CacheStore};

/// INCRBY with TTL refresh in one round trip.
const INCR_SCRIPT: &str = r#"
    local v = redis.call("INCRBY", KEYS[1], ARGV[1])
    redis.call("EXPIRE", KEYS[1], ARGV[2])
    return v
"#;

/// Floored decrement: the value never drops below zero.
const DECR_FLOOR_SCRIPT: &str = r#"
    local current = tonumber(redis.call("GET", KEYS[1]) or "0")
    local next = current - tonumber(ARGV[1])
    if next < 0 then
      next = 0
    end
    redis.call("SET", KEYS[1], next, "EX", ARGV[2])
    return next
"#;

/// Versioned multi-key write. KEYS[1] is the version key, KEYS[2..] the
/// values; ARGV[1] is the version, ARGV[2] the TTL, ARGV[3..] the values.
const SET_IF_NEWER_SCRIPT: &str = r#"
    local stored = redis.call("GET", KEYS[1])
    if stored and tonumber(stored) >= tonumber(ARGV[1]) then
      return 0
    end
    for i = 2, #KEYS do
      redis.call("SET", KEYS[i], ARGV[i + 1], "EX", ARGV[2])
    end
    redis.call("SET", KEYS[1], ARGV[1], "EX", ARGV[2])
    return 1
"#;

/// Cache backed by a shared Redis instance.
///
/// [`ConnectionManager`] reconnects transparently and is cheap to clone,
/// so each call works on its own clone.
#[derive(Clone)]
pub struct RedisCache {
    conn: ConnectionManager,
    incr: redis::Script,
    decr_floor: redis::Script,
    set_if_newer: redis::Script,
}

impl RedisCache {
    /// Connect to `redis_url`.
    pub async fn connect(redis_url: &str) -> Result<Self, CacheError> {
        let client = redis::Client::open(redis_url)?;
        let conn = ConnectionManager::new(client).await?;
        tracing::info!("Connected to Redis");
        Ok(Self {
            conn,
            incr: redis::Script::new(INCR_SCRIPT),
            decr_floor: redis::Script::new(DECR_FLOOR_SCRIPT),
            set_if_newer: redis::Script::new(SET_IF_NEWER_SCRIPT),
        })
    }
}

fn ttl_secs(ttl: Duration) -> u64 {
    ttl.as_secs().max(1)
}

#[async_trait]
impl CacheStore for RedisCache {
    async fn get_i64(&self, key: &str) -> Result<Option<i64>, CacheError> {
        let mut conn = self.conn.clone();
        let raw: Option<String> = conn.get(key).await?;
        raw.map(|v| {
            v.parse::<i64>()
                .map_err(|_| CacheError::NotAnInteger { key: key.to_string() })
        })
        .transpose()
    }

    async fn set_i64(&self, key: &str, value: i64, ttl: Duration) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        let _: () = conn.set_ex(key, value, ttl_secs(ttl)).await?;
        Ok(())
    }

    async fn set_i64_if_newer(
        &self,
        values: &[(&str, i64)],
        version_key: &str,
        version: i64,
        ttl: Duration,
    ) -> Result<bool, CacheError> {
        let mut conn = self.conn.clone();
        let mut invocation = self.set_if_newer.prepare_invoke();
        invocation.key(version_key).arg(version).arg(ttl_secs(ttl));
        for (key, value) in values {
            invocation.key(*key).arg(*value);
        }
        let written: i64 = invocation.invoke_async(&mut conn).await?;
        Ok(written == 1)
    }

    async fn incr_by(&self, key: &str, delta: i64, ttl: Duration) -> Result<i64, CacheError> {
        let mut conn = self.conn.clone();
        let value: i64 = self
            .incr
            .key(key)
            .arg(delta)
            .arg(ttl_secs(ttl))
            .invoke_async(&mut conn)
            .await?;
        Ok(value)
    }

    async fn decr_floor(&self, key: &str, amount: i64, ttl: Duration) -> Result<i64, CacheError> {
        let mut conn = self.conn.clone();
        let value: i64 = self
            .decr_floor
            .key(key)
            .arg(amount)
            .arg(ttl_secs(ttl))
            .invoke_async(&mut conn)
            .await?;
        Ok(value)
    }

    async fn exists(&self, key: &str) -> Result<bool, CacheError> {
        let mut conn = self.conn.clone();
        let found: bool = conn.exists(key).await?;
        Ok(found)
    }

    async fn set_flag(&self, key: &str, ttl: Duration) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        let _: () = conn.set_ex(key, 1, ttl_secs(ttl)).await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        let _: i64 = conn.del(key).await?;
        Ok(())
    }
}
