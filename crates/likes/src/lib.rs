//! Like/dislike handling for posts and comments.
//!
//! Two strategies share one state machine
//! ([`crewhub_core::likes::apply_action`]) and one reconciliation primitive
//! ([`crewhub_db::repositories::LikeRepo::apply`]):
//!
//! - [`DirectLikes`]: applies each toggle to the durable store immediately,
//!   then mirrors the committed counters into the cache.
//! - [`LikeBatcher`] + [`LikeWorker`]: answers toggles optimistically from
//!   the cache, coalesces them in memory, and flushes net actions to the
//!   durable `like_jobs` queue on a timer; workers apply them.
//!
//! [`LikeService`] picks one according to [`LikeStrategy`].

pub mod batcher;
pub mod cache;
pub mod config;
pub mod direct;
pub mod error;
pub mod service;
pub mod worker;

pub use batcher::{FlushReport, LikeBatcher};
pub use cache::{LikeCache, ReactionCounts};
pub use config::{LikeStrategy, LikesConfig};
pub use direct::DirectLikes;
pub use error::LikeError;
pub use service::{LikeService, ReactionSummary, ToggleResult};
pub use worker::LikeWorker;
