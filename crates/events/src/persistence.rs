//! Durable event persistence service.
//!
//! [`EventPersistence`] subscribes to the [`EventBus`](crate::bus::EventBus)
//! and writes every received [`DomainEvent`] to the `events` table.

use std::collections::HashMap;

use crewhub_core::types::DbId;
use crewhub_db::repositories::EventRepo;
use crewhub_db::DbPool;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use crate::bus::DomainEvent;

/// Background service that persists domain events.
pub struct EventPersistence {
    pool: DbPool,
    /// `event_types.name` to id, filled on first use of each name.
    type_ids: HashMap<String, DbId>,
}

impl EventPersistence {
    pub fn new(pool: DbPool) -> Self {
        Self {
            pool,
            type_ids: HashMap::new(),
        }
    }

    /// Run until `cancel` fires or the bus is dropped.
    pub async fn run(mut self, mut receiver: broadcast::Receiver<DomainEvent>, cancel: CancellationToken) {
        loop {
            let received = tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Event persistence stopping");
                    break;
                }
                received = receiver.recv() => received,
            };
            match received {
                Ok(event) => {
                    if let Err(e) = self.persist(&event).await {
                        tracing::error!(
                            error = %e,
                            event_type = %event.event_type,
                            "Failed to persist event"
                        );
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(skipped = n, "Event persistence lagged, some events were not persisted");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::info!("Event bus closed, persistence shutting down");
                    break;
                }
            }
        }
    }

    /// Write a single event, resolving its type name to `event_types.id`.
    pub async fn persist(&mut self, event: &DomainEvent) -> Result<DbId, sqlx::Error> {
        let type_id = match self.type_ids.get(&event.event_type) {
            Some(id) => *id,
            None => {
                let event_type = EventRepo::get_event_type_by_name(&self.pool, &event.event_type)
                    .await?
                    .ok_or(sqlx::Error::RowNotFound)?;
                self.type_ids.insert(event.event_type.clone(), event_type.id);
                event_type.id
            }
        };

        EventRepo::insert(
            &self.pool,
            type_id,
            event.source_entity_type.as_deref(),
            event.source_entity_id,
            event.actor_user_id,
            &event.payload,
        )
        .await
    }
}
