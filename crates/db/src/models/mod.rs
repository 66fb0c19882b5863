//! Row models and DTOs.
//!
//! Each submodule contains a `FromRow` + `Serialize` struct matching the
//! database row, plus any `Deserialize` DTOs used to create rows.

pub mod activity;
pub mod badge;
pub mod event;
pub mod like;
pub mod like_job;
pub mod status;
pub mod user_level;
