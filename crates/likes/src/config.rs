//! Like pipeline configuration loaded from environment variables.

use std::str::FromStr;
use std::time::Duration;

use crewhub_cache::DEFAULT_TTL;

/// How toggles reach the durable store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LikeStrategy {
    /// Apply each toggle to the database before answering.
    #[default]
    Direct,
    /// Answer from the cache and persist through the batched job queue.
    Batched,
}

impl FromStr for LikeStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "direct" => Ok(LikeStrategy::Direct),
            "batched" => Ok(LikeStrategy::Batched),
            other => Err(format!("unknown like strategy '{other}' (expected direct or batched)")),
        }
    }
}

/// Upper bound for the retry delay of a failed like job.
pub const MAX_RETRY_DELAY_SECS: f64 = 300.0;

#[derive(Debug, Clone)]
pub struct LikesConfig {
    pub strategy: LikeStrategy,
    pub flush_interval: Duration,
    pub cache_ttl: Duration,
    pub worker_concurrency: usize,
    pub max_attempts: i16,
    pub poll_interval: Duration,
    /// Running jobs claimed longer ago than this are returned to the queue.
    pub stale_after: Duration,
}

impl Default for LikesConfig {
    fn default() -> Self {
        Self {
            strategy: LikeStrategy::Direct,
            flush_interval: Duration::from_millis(5000),
            cache_ttl: DEFAULT_TTL,
            worker_concurrency: 4,
            max_attempts: 5,
            poll_interval: Duration::from_millis(500),
            stale_after: Duration::from_secs(300),
        }
    }
}

impl LikesConfig {
    /// Load configuration from environment variables.
    ///
    /// | Env var                     | Default  |
    /// |-----------------------------|----------|
    /// | `LIKE_STRATEGY`             | `direct` |
    /// | `LIKE_FLUSH_INTERVAL_MS`    | `5000`   |
    /// | `LIKE_CACHE_TTL_SECS`       | `86400`  |
    /// | `LIKE_WORKER_CONCURRENCY`   | `4`      |
    /// | `LIKE_JOB_MAX_ATTEMPTS`     | `5`      |
    /// | `LIKE_JOB_POLL_INTERVAL_MS` | `500`    |
    /// | `LIKE_JOB_STALE_SECS`       | `300`    |
    pub fn from_env() -> Self {
        let strategy: LikeStrategy = std::env::var("LIKE_STRATEGY")
            .unwrap_or_else(|_| "direct".into())
            .parse()
            .expect("LIKE_STRATEGY must be 'direct' or 'batched'");

        let flush_interval_ms: u64 = std::env::var("LIKE_FLUSH_INTERVAL_MS")
            .unwrap_or_else(|_| "5000".into())
            .parse()
            .expect("LIKE_FLUSH_INTERVAL_MS must be a valid u64");

        let cache_ttl_secs: u64 = std::env::var("LIKE_CACHE_TTL_SECS")
            .unwrap_or_else(|_| "86400".into())
            .parse()
            .expect("LIKE_CACHE_TTL_SECS must be a valid u64");

        let worker_concurrency: usize = std::env::var("LIKE_WORKER_CONCURRENCY")
            .unwrap_or_else(|_| "4".into())
            .parse()
            .expect("LIKE_WORKER_CONCURRENCY must be a valid usize");

        let max_attempts: i16 = std::env::var("LIKE_JOB_MAX_ATTEMPTS")
            .unwrap_or_else(|_| "5".into())
            .parse()
            .expect("LIKE_JOB_MAX_ATTEMPTS must be a valid i16");

        let poll_interval_ms: u64 = std::env::var("LIKE_JOB_POLL_INTERVAL_MS")
            .unwrap_or_else(|_| "500".into())
            .parse()
            .expect("LIKE_JOB_POLL_INTERVAL_MS must be a valid u64");

        let stale_secs: u64 = std::env::var("LIKE_JOB_STALE_SECS")
            .unwrap_or_else(|_| "300".into())
            .parse()
            .expect("LIKE_JOB_STALE_SECS must be a valid u64");

        assert!(flush_interval_ms > 0, "LIKE_FLUSH_INTERVAL_MS must be positive");
        assert!(max_attempts > 0, "LIKE_JOB_MAX_ATTEMPTS must be positive");

        Self {
            strategy,
            flush_interval: Duration::from_millis(flush_interval_ms),
            cache_ttl: Duration::from_secs(cache_ttl_secs),
            worker_concurrency: worker_concurrency.max(1),
            max_attempts,
            poll_interval: Duration::from_millis(poll_interval_ms),
            stale_after: Duration::from_secs(stale_secs),
        }
    }

    /// Delay before retrying a job that failed its `attempt`-th attempt:
    /// `2^attempt` seconds, capped at five minutes.
    pub fn retry_delay_secs(&self, attempt: i16) -> f64 {
        2f64.powi(i32::from(attempt.max(0))).min(MAX_RETRY_DELAY_SECS)
    }
}
