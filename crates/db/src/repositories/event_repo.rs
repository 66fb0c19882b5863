//! Repository for the `events` and `event_types` tables.

use crewhub_core::types::DbId;
use sqlx::PgPool;

use crate::models::event::{Event, EventType};

/// Column list for `event_types` queries.
const EVENT_TYPE_COLUMNS: &str = "id, name, category, description, created_at";

/// Column list for `events` queries.
const EVENT_COLUMNS: &str =
    "id, event_type_id, source_entity_type, source_entity_id, actor_user_id, payload, created_at";

/// Provides read/write operations for events and event types.
pub struct EventRepo;

impl EventRepo {
    /// Find an event type by its dot-separated name (e.g. `"rank.changed"`).
    pub async fn get_event_type_by_name(pool: &PgPool, name: &str) -> Result<Option<EventType>, sqlx::Error> {
        let query = format!("SELECT {EVENT_TYPE_COLUMNS} FROM event_types WHERE name = $1");
        sqlx::query_as::<_, EventType>(&query)
            .bind(name)
            .fetch_optional(pool)
            .await
    }

    /// Insert a new event row, returning the generated ID.
    pub async fn insert(
        pool: &PgPool,
        event_type_id: DbId,
        source_entity_type: Option<&str>,
        source_entity_id: Option<DbId>,
        actor_user_id: Option<DbId>,
        payload: &serde_json::Value,
    ) -> Result<DbId, sqlx::Error> {
        sqlx::query_scalar(
            "INSERT INTO events \
                (event_type_id, source_entity_type, source_entity_id, actor_user_id, payload) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING id",
        )
        .bind(event_type_id)
        .bind(source_entity_type)
        .bind(source_entity_id)
        .bind(actor_user_id)
        .bind(payload)
        .fetch_one(pool)
        .await
    }

    /// Recent events of one type, newest first.
    pub async fn list_recent_by_type(
        pool: &PgPool,
        event_type_name: &str,
        limit: i64,
    ) -> Result<Vec<Event>, sqlx::Error> {
        let query = format!(
            "SELECT {} FROM events e \
             JOIN event_types t ON t.id = e.event_type_id \
             WHERE t.name = $1 \
             ORDER BY e.created_at DESC, e.id DESC LIMIT $2",
            EVENT_COLUMNS
                .split(", ")
                .map(|c| format!("e.{c}"))
                .collect::<Vec<_>>()
                .join(", ")
        );
        sqlx::query_as::<_, Event>(&query)
            .bind(event_type_name)
            .bind(limit)
            .fetch_all(pool)
            .await
    }
}
