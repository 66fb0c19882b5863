//! In-process event bus backed by a `tokio::sync::broadcast` channel.
//!
//! [`EventBus`] is shared via `Arc<EventBus>` between the API, the decay
//! scheduler and the like workers. Publishing never blocks and never fails.

use chrono::{DateTime, Utc};
use crewhub_core::badge::BadgeProgress;
use crewhub_core::decay::DecayOutcome;
use crewhub_core::likes::LikeJobPayload;
use crewhub_core::rank::RankTransition;
use crewhub_core::types::DbId;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Event type names. Each has a seeded row in `event_types`.
pub mod event_types {
    pub const RANK_CHANGED: &str = "rank.changed";
    pub const BADGE_AWARDED: &str = "badge.awarded";
    pub const POINTS_DECAYED: &str = "points.decayed";
    pub const LIKE_JOB_EXHAUSTED: &str = "like_job.exhausted";
}

// ---------------------------------------------------------------------------
// DomainEvent
// ---------------------------------------------------------------------------

/// A domain event that occurred on the platform.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainEvent {
    /// Dot-separated event name, see [`event_types`].
    pub event_type: String,

    /// Source entity kind (e.g. `"user_level"`, `"like_job"`).
    pub source_entity_type: Option<String>,

    pub source_entity_id: Option<DbId>,

    /// The user the event is about, when there is one.
    pub actor_user_id: Option<DbId>,

    pub payload: serde_json::Value,

    pub timestamp: DateTime<Utc>,
}

impl DomainEvent {
    pub fn new(event_type: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            source_entity_type: None,
            source_entity_id: None,
            actor_user_id: None,
            payload: serde_json::Value::Object(Default::default()),
            timestamp: Utc::now(),
        }
    }

    pub fn with_source(mut self, entity_type: impl Into<String>, entity_id: DbId) -> Self {
        self.source_entity_type = Some(entity_type.into());
        self.source_entity_id = Some(entity_id);
        self
    }

    pub fn with_actor(mut self, user_id: DbId) -> Self {
        self.actor_user_id = Some(user_id);
        self
    }

    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }

    /// A user moved up or down the rank ladder.
    pub fn rank_changed(user_id: DbId, transition: &RankTransition, activity_points: f64) -> Self {
        Self::new(event_types::RANK_CHANGED)
            .with_actor(user_id)
            .with_payload(serde_json::json!({
                "from": transition.from,
                "to": transition.to,
                "category": transition.category,
                "promotion": transition.is_promotion(),
                "activityPoints": activity_points,
            }))
    }

    /// A user earned a catalog badge.
    pub fn badge_awarded(user_id: DbId, badge_id: DbId, name: &str, progress: BadgeProgress) -> Self {
        Self::new(event_types::BADGE_AWARDED)
            .with_source("badge", badge_id)
            .with_actor(user_id)
            .with_payload(serde_json::json!({
                "badgeName": name,
                "progress": progress,
            }))
    }

    /// Inactivity decay reduced a user's activity points.
    pub fn points_decayed(user_id: DbId, outcome: &DecayOutcome) -> Self {
        Self::new(event_types::POINTS_DECAYED)
            .with_actor(user_id)
            .with_payload(serde_json::json!({
                "periods": outcome.periods,
                "pointsBefore": outcome.points_before,
                "pointsAfter": outcome.points_after,
            }))
    }

    /// A like job failed on its last attempt; the durable record may
    /// disagree with the cache until reconciled.
    pub fn like_job_exhausted(job_id: DbId, payload: &LikeJobPayload, error: &str) -> Self {
        let event = Self::new(event_types::LIKE_JOB_EXHAUSTED)
            .with_source("like_job", job_id)
            .with_payload(serde_json::json!({
                "jobKey": payload.job_key(),
                "job": payload,
                "error": error,
            }));
        match payload.actor {
            crewhub_core::likes::Actor::User(user_id) => event.with_actor(user_id),
            crewhub_core::likes::Actor::Ip(_) => event,
        }
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

const DEFAULT_CAPACITY: usize = 1024;

/// In-process fan-out event bus.
pub struct EventBus {
    sender: broadcast::Sender<DomainEvent>,
}

impl EventBus {
    /// Create a bus with a specific channel capacity.
    ///
    /// Slow receivers observe `RecvError::Lagged` once the buffer is full.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish to all current subscribers. Dropped if nobody listens.
    pub fn publish(&self, event: DomainEvent) {
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DomainEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
