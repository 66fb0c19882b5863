//! Domain event bus for crewhub.
//!
//! - [`EventBus`]: in-process publish/subscribe hub backed by
//!   `tokio::sync::broadcast`.
//! - [`DomainEvent`]: the event envelope, with typed constructors for every
//!   event the points and likes pipelines emit.
//! - [`EventPersistence`]: background service that durably writes every
//!   event to the `events` table.

pub mod bus;
pub mod persistence;

pub use bus::{event_types, DomainEvent, EventBus};
pub use persistence::EventPersistence;
