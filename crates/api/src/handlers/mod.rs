pub mod activities;
pub mod admin;
pub mod levels;
pub mod reactions;
