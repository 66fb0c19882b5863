//! Badge catalog and awarded badges.

use crewhub_core::badge::{BadgeProgress, BadgeRequirements, BadgeType};
use crewhub_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;

/// A row from the `badges` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Badge {
    pub id: DbId,
    pub name: String,
    pub description: String,
    #[sqlx(try_from = "String")]
    pub badge_type: BadgeType,
    pub category: String,
    pub requirements: Json<BadgeRequirements>,
    pub is_hidden: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for adding a badge to the catalog.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateBadge {
    pub name: String,
    pub description: Option<String>,
    pub badge_type: BadgeType,
    pub category: Option<String>,
    pub requirements: BadgeRequirements,
    pub is_hidden: Option<bool>,
}

/// An awarded badge joined with its catalog entry.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct UserBadgeDetail {
    pub badge_id: DbId,
    pub name: String,
    pub description: String,
    #[sqlx(try_from = "String")]
    pub badge_type: BadgeType,
    pub category: String,
    pub is_hidden: bool,
    pub progress: Json<BadgeProgress>,
    pub earned_at: Timestamp,
}
