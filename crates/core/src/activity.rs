//! Point-earning activity types and the canonical points table.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Every activity that can be recorded against a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActivityType {
    PostCreate,
    CommentCreate,
    PostLike,
    CommentLike,
    DailyLogin,
    ProfileComplete,
    PostShare,
    CommentReply,
    PostView,
    BroadcastEarning,
}

/// All activity types, in declaration order.
pub const ALL_ACTIVITY_TYPES: [ActivityType; 10] = [
    ActivityType::PostCreate,
    ActivityType::CommentCreate,
    ActivityType::PostLike,
    ActivityType::CommentLike,
    ActivityType::DailyLogin,
    ActivityType::ProfileComplete,
    ActivityType::PostShare,
    ActivityType::CommentReply,
    ActivityType::PostView,
    ActivityType::BroadcastEarning,
];

/// Points awarded per activity.
///
/// `BroadcastEarning` deliberately has no entry: recording it is a
/// configuration error until a value is assigned.
pub const ACTIVITY_POINTS: &[(ActivityType, f64)] = &[
    (ActivityType::PostCreate, 10.0),
    (ActivityType::CommentCreate, 5.0),
    (ActivityType::PostLike, 1.0),
    (ActivityType::CommentLike, 1.0),
    (ActivityType::DailyLogin, 2.0),
    (ActivityType::ProfileComplete, 20.0),
    (ActivityType::PostShare, 3.0),
    (ActivityType::CommentReply, 3.0),
    (ActivityType::PostView, 0.1),
];

/// Look up the points for an activity.
///
/// A missing entry is an [`CoreError::Internal`]: callers must not fall back
/// to zero.
pub fn points_for(activity: ActivityType) -> Result<f64, CoreError> {
    ACTIVITY_POINTS
        .iter()
        .find(|(a, _)| *a == activity)
        .map(|(_, points)| *points)
        .ok_or_else(|| {
            CoreError::Internal(format!("No point value configured for activity {activity}"))
        })
}

impl ActivityType {
    pub fn as_str(self) -> &'static str {
        match self {
            ActivityType::PostCreate => "POST_CREATE",
            ActivityType::CommentCreate => "COMMENT_CREATE",
            ActivityType::PostLike => "POST_LIKE",
            ActivityType::CommentLike => "COMMENT_LIKE",
            ActivityType::DailyLogin => "DAILY_LOGIN",
            ActivityType::ProfileComplete => "PROFILE_COMPLETE",
            ActivityType::PostShare => "POST_SHARE",
            ActivityType::CommentReply => "COMMENT_REPLY",
            ActivityType::PostView => "POST_VIEW",
            ActivityType::BroadcastEarning => "BROADCAST_EARNING",
        }
    }
}

impl fmt::Display for ActivityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActivityType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ALL_ACTIVITY_TYPES
            .iter()
            .copied()
            .find(|a| a.as_str() == s)
            .ok_or_else(|| {
                CoreError::Validation(format!(
                    "Unknown activity type: '{s}'. Valid types: {}",
                    ALL_ACTIVITY_TYPES
                        .iter()
                        .map(|a| a.as_str())
                        .collect::<Vec<_>>()
                        .join(", ")
                ))
            })
    }
}

impl TryFrom<String> for ActivityType {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}
