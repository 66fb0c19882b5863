//! Badge catalog requirements and eligibility.
//!
//! Badges are evaluated on the activity path only: a badge is considered
//! when its requirements name the activity type that was just recorded.
//! Requirements without an activity type are never evaluated here.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::activity::ActivityType;
use crate::error::CoreError;
use crate::rank::Rank;

/// Catalog badge kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BadgeType {
    Achievement,
    Milestone,
    Special,
}

impl BadgeType {
    pub fn as_str(self) -> &'static str {
        match self {
            BadgeType::Achievement => "ACHIEVEMENT",
            BadgeType::Milestone => "MILESTONE",
            BadgeType::Special => "SPECIAL",
        }
    }
}

impl fmt::Display for BadgeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BadgeType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ACHIEVEMENT" => Ok(BadgeType::Achievement),
            "MILESTONE" => Ok(BadgeType::Milestone),
            "SPECIAL" => Ok(BadgeType::Special),
            other => Err(CoreError::Validation(format!("Unknown badge type: '{other}'"))),
        }
    }
}

impl TryFrom<String> for BadgeType {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Predicate record stored with each catalog badge.
///
/// Any one satisfied threshold is enough to earn the badge.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BadgeRequirements {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub activity_type: Option<ActivityType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<i64>,
    /// Minimum rank, compared by ladder position.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<Rank>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub points: Option<f64>,
}

/// Snapshot of the user's standing when a badge is checked.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BadgeContext {
    pub activity_count: i64,
    pub rank: Rank,
    pub activity_points: f64,
}

/// Progress stored with an awarded badge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BadgeProgress {
    pub current: i64,
    pub target: i64,
}

impl BadgeRequirements {
    /// Whether this badge is evaluated when `activity` is recorded.
    pub fn applies_to(&self, activity: ActivityType) -> bool {
        self.activity_type == Some(activity)
    }

    /// True when any configured threshold is met.
    pub fn is_met(&self, ctx: &BadgeContext) -> bool {
        let count_met = self.count.is_some_and(|c| ctx.activity_count >= c);
        let level_met = self
            .level
            .is_some_and(|level| ctx.rank.ordinal() >= level.ordinal());
        let points_met = self.points.is_some_and(|p| ctx.activity_points >= p);
        count_met || level_met || points_met
    }

    /// Progress snapshot recorded at award time.
    pub fn progress(&self, activity_count: i64) -> BadgeProgress {
        BadgeProgress {
            current: activity_count,
            target: self.count.unwrap_or(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(count: i64, rank: Rank, points: f64) -> BadgeContext {
        BadgeContext {
            activity_count: count,
            rank,
            activity_points: points,
        }
    }

    #[test]
    fn applies_only_to_matching_activity() {
        let req = BadgeRequirements {
            activity_type: Some(ActivityType::PostCreate),
            count: Some(10),
            ..Default::default()
        };
        assert!(req.applies_to(ActivityType::PostCreate));
        assert!(!req.applies_to(ActivityType::CommentCreate));
    }

    #[test]
    fn requirements_without_activity_never_apply() {
        let req = BadgeRequirements {
            points: Some(1.0),
            ..Default::default()
        };
        assert!(!req.applies_to(ActivityType::PostCreate));
    }

    #[test]
    fn count_threshold() {
        let req = BadgeRequirements {
            count: Some(10),
            ..Default::default()
        };
        assert!(!req.is_met(&ctx(9, Rank::LOWEST, 0.0)));
        assert!(req.is_met(&ctx(10, Rank::LOWEST, 0.0)));
    }

    #[test]
    fn level_threshold_uses_ladder_order() {
        let req = BadgeRequirements {
            level: Some(Rank::Corporal),
            ..Default::default()
        };
        assert!(!req.is_met(&ctx(0, Rank::PrivateFirstClass, 0.0)));
        assert!(req.is_met(&ctx(0, Rank::Corporal, 0.0)));
        assert!(req.is_met(&ctx(0, Rank::General, 0.0)));
    }

    #[test]
    fn any_threshold_is_enough() {
        let req = BadgeRequirements {
            count: Some(100),
            points: Some(50.0),
            ..Default::default()
        };
        assert!(req.is_met(&ctx(1, Rank::LOWEST, 50.0)));
    }

    #[test]
    fn no_thresholds_is_never_met() {
        let req = BadgeRequirements {
            activity_type: Some(ActivityType::PostCreate),
            ..Default::default()
        };
        assert!(!req.is_met(&ctx(1000, Rank::General, 1e9)));
    }

    #[test]
    fn progress_defaults_target_to_zero() {
        let req = BadgeRequirements::default();
        assert_eq!(req.progress(3), BadgeProgress { current: 3, target: 0 });
    }

    #[test]
    fn requirements_parse_from_camel_case_json() {
        let req: BadgeRequirements = serde_json::from_value(serde_json::json!({
            "activityType": "POST_CREATE",
            "count": 10,
            "level": "SERGEANT"
        }))
        .unwrap();
        assert_eq!(req.activity_type, Some(ActivityType::PostCreate));
        assert_eq!(req.count, Some(10));
        assert_eq!(req.level, Some(Rank::Sergeant));
        assert_eq!(req.points, None);
    }
}
