//! Crewhub domain core.
//!
//! Pure, I/O-free building blocks shared by every other crate:
//!
//! - [`rank`] -- the 19-step rank ladder and its categories.
//! - [`activity`] -- point-earning activity types and the points table.
//! - [`decay`] -- inactivity decay arithmetic.
//! - [`badge`] -- badge catalog requirements and eligibility predicates.
//! - [`likes`] -- the like/dislike state machine, job payloads and the
//!   cache key namespace.

pub mod activity;
pub mod badge;
pub mod decay;
pub mod error;
pub mod likes;
pub mod rank;
pub mod roles;
pub mod types;
