//! Decay sweep configuration loaded from environment variables.

use std::time::Duration;

use crewhub_core::decay::{
    DecayPolicy, DEFAULT_INACTIVITY_DAYS, DEFAULT_MIN_POINTS, DEFAULT_REDUCTION_POINTS,
};

/// Default interval between sweeps: once a day.
pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 86_400;

/// Default time budget for decaying one user.
pub const DEFAULT_USER_TIMEOUT_SECS: u64 = 10;

/// Default page size when listing stale users.
pub const DEFAULT_BATCH_SIZE: i64 = 500;

/// Decay policy plus the sweep's scheduling bounds.
#[derive(Debug, Clone)]
pub struct DecayConfig {
    pub policy: DecayPolicy,
    pub sweep_interval: Duration,
    /// Per-user bound; a user exceeding it is reported as a failure.
    pub user_timeout: Duration,
    pub batch_size: i64,
}

impl Default for DecayConfig {
    fn default() -> Self {
        Self {
            policy: DecayPolicy::default(),
            sweep_interval: Duration::from_secs(DEFAULT_SWEEP_INTERVAL_SECS),
            user_timeout: Duration::from_secs(DEFAULT_USER_TIMEOUT_SECS),
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

impl DecayConfig {
    /// Load configuration from environment variables.
    ///
    /// | Env var                     | Default  |
    /// |-----------------------------|----------|
    /// | `DECAY_INACTIVITY_DAYS`     | `30`     |
    /// | `DECAY_REDUCTION_POINTS`    | `100`    |
    /// | `DECAY_MIN_POINTS`          | `0`      |
    /// | `DECAY_SWEEP_INTERVAL_SECS` | `86400`  |
    /// | `DECAY_USER_TIMEOUT_SECS`   | `10`     |
    /// | `DECAY_BATCH_SIZE`          | `500`    |
    pub fn from_env() -> Self {
        let inactivity_days: i64 = std::env::var("DECAY_INACTIVITY_DAYS")
            .unwrap_or_else(|_| DEFAULT_INACTIVITY_DAYS.to_string())
            .parse()
            .expect("DECAY_INACTIVITY_DAYS must be a valid i64");

        let reduction_points: f64 = std::env::var("DECAY_REDUCTION_POINTS")
            .unwrap_or_else(|_| DEFAULT_REDUCTION_POINTS.to_string())
            .parse()
            .expect("DECAY_REDUCTION_POINTS must be a valid number");

        let min_points: f64 = std::env::var("DECAY_MIN_POINTS")
            .unwrap_or_else(|_| DEFAULT_MIN_POINTS.to_string())
            .parse()
            .expect("DECAY_MIN_POINTS must be a valid number");

        let sweep_interval_secs: u64 = std::env::var("DECAY_SWEEP_INTERVAL_SECS")
            .unwrap_or_else(|_| DEFAULT_SWEEP_INTERVAL_SECS.to_string())
            .parse()
            .expect("DECAY_SWEEP_INTERVAL_SECS must be a valid u64");

        let user_timeout_secs: u64 = std::env::var("DECAY_USER_TIMEOUT_SECS")
            .unwrap_or_else(|_| DEFAULT_USER_TIMEOUT_SECS.to_string())
            .parse()
            .expect("DECAY_USER_TIMEOUT_SECS must be a valid u64");

        let batch_size: i64 = std::env::var("DECAY_BATCH_SIZE")
            .unwrap_or_else(|_| DEFAULT_BATCH_SIZE.to_string())
            .parse()
            .expect("DECAY_BATCH_SIZE must be a valid i64");

        assert!(inactivity_days > 0, "DECAY_INACTIVITY_DAYS must be positive");

        let config = Self {
            policy: DecayPolicy {
                inactivity_period: chrono::Duration::days(inactivity_days),
                reduction_points,
                min_points,
            },
            sweep_interval: Duration::from_secs(sweep_interval_secs),
            user_timeout: Duration::from_secs(user_timeout_secs),
            batch_size,
        };
        config.validate();
        config
    }

    /// Panics on a zero sweep interval, per-user timeout or batch size.
    pub fn validate(&self) {
        assert!(
            !self.sweep_interval.is_zero(),
            "DECAY_SWEEP_INTERVAL_SECS must be positive"
        );
        assert!(
            !self.user_timeout.is_zero(),
            "DECAY_USER_TIMEOUT_SECS must be positive"
        );
        assert!(self.batch_size > 0, "DECAY_BATCH_SIZE must be positive");
    }
}
