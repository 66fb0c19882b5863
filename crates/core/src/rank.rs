//! Rank ladder and rank categories.
//!
//! A user's rank is a pure function of cumulative activity points: the
//! highest rank whose threshold is `<=` the points. Thresholds are strictly
//! increasing, start at 0 and have no upper bound, so every non-negative
//! point total maps to exactly one rank.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::Timestamp;

// ---------------------------------------------------------------------------
// Rank
// ---------------------------------------------------------------------------

/// One step of the 19-step progression ladder, in ascending order.
///
/// The derived `Ord` follows declaration order, which is also the order of
/// [`RANK_TABLE`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Rank {
    PrivateSecondClass,
    PrivateFirstClass,
    Corporal,
    Sergeant,
    StaffSergeant,
    SergeantFirstClass,
    MasterSergeant,
    SergeantMajor,
    WarrantOfficer,
    SecondLieutenant,
    FirstLieutenant,
    Captain,
    Major,
    LieutenantColonel,
    Colonel,
    BrigadierGeneral,
    MajorGeneral,
    LieutenantGeneral,
    General,
}

/// Coarse grouping of contiguous ranks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RankCategory {
    Soldier,
    Nco,
    Officer,
    General,
}

/// A rank and the minimum cumulative activity points required to hold it.
#[derive(Debug, Clone, Copy)]
pub struct RankThreshold {
    pub rank: Rank,
    pub min_points: f64,
}

/// The rank table, ascending by threshold.
pub const RANK_TABLE: [RankThreshold; 19] = [
    RankThreshold { rank: Rank::PrivateSecondClass, min_points: 0.0 },
    RankThreshold { rank: Rank::PrivateFirstClass, min_points: 100.0 },
    RankThreshold { rank: Rank::Corporal, min_points: 300.0 },
    RankThreshold { rank: Rank::Sergeant, min_points: 600.0 },
    RankThreshold { rank: Rank::StaffSergeant, min_points: 1000.0 },
    RankThreshold { rank: Rank::SergeantFirstClass, min_points: 1500.0 },
    RankThreshold { rank: Rank::MasterSergeant, min_points: 2100.0 },
    RankThreshold { rank: Rank::SergeantMajor, min_points: 2800.0 },
    RankThreshold { rank: Rank::WarrantOfficer, min_points: 3600.0 },
    RankThreshold { rank: Rank::SecondLieutenant, min_points: 4500.0 },
    RankThreshold { rank: Rank::FirstLieutenant, min_points: 5500.0 },
    RankThreshold { rank: Rank::Captain, min_points: 6600.0 },
    RankThreshold { rank: Rank::Major, min_points: 7800.0 },
    RankThreshold { rank: Rank::LieutenantColonel, min_points: 9100.0 },
    RankThreshold { rank: Rank::Colonel, min_points: 10500.0 },
    RankThreshold { rank: Rank::BrigadierGeneral, min_points: 12000.0 },
    RankThreshold { rank: Rank::MajorGeneral, min_points: 13600.0 },
    RankThreshold { rank: Rank::LieutenantGeneral, min_points: 15300.0 },
    RankThreshold { rank: Rank::General, min_points: 17100.0 },
];

/// Ranks in the SOLDIER category.
pub const SOLDIER_RANKS: [Rank; 4] = [
    Rank::PrivateSecondClass,
    Rank::PrivateFirstClass,
    Rank::Corporal,
    Rank::Sergeant,
];

/// Ranks in the NCO category.
pub const NCO_RANKS: [Rank; 4] = [
    Rank::StaffSergeant,
    Rank::SergeantFirstClass,
    Rank::MasterSergeant,
    Rank::SergeantMajor,
];

/// Ranks in the OFFICER category.
pub const OFFICER_RANKS: [Rank; 7] = [
    Rank::WarrantOfficer,
    Rank::SecondLieutenant,
    Rank::FirstLieutenant,
    Rank::Captain,
    Rank::Major,
    Rank::LieutenantColonel,
    Rank::Colonel,
];

/// Ranks in the GENERAL category.
pub const GENERAL_RANKS: [Rank; 4] = [
    Rank::BrigadierGeneral,
    Rank::MajorGeneral,
    Rank::LieutenantGeneral,
    Rank::General,
];

impl Rank {
    /// The rank every user starts at.
    pub const LOWEST: Rank = Rank::PrivateSecondClass;

    /// Zero-based position on the ladder.
    pub fn ordinal(self) -> usize {
        RANK_TABLE
            .iter()
            .position(|t| t.rank == self)
            .unwrap_or_default()
    }

    /// Minimum activity points needed to hold this rank.
    pub fn min_points(self) -> f64 {
        RANK_TABLE[self.ordinal()].min_points
    }

    /// The category containing this rank.
    pub fn category(self) -> RankCategory {
        if SOLDIER_RANKS.contains(&self) {
            RankCategory::Soldier
        } else if NCO_RANKS.contains(&self) {
            RankCategory::Nco
        } else if OFFICER_RANKS.contains(&self) {
            RankCategory::Officer
        } else {
            RankCategory::General
        }
    }

    /// Database / wire representation, e.g. `"PRIVATE_FIRST_CLASS"`.
    pub fn as_str(self) -> &'static str {
        match self {
            Rank::PrivateSecondClass => "PRIVATE_SECOND_CLASS",
            Rank::PrivateFirstClass => "PRIVATE_FIRST_CLASS",
            Rank::Corporal => "CORPORAL",
            Rank::Sergeant => "SERGEANT",
            Rank::StaffSergeant => "STAFF_SERGEANT",
            Rank::SergeantFirstClass => "SERGEANT_FIRST_CLASS",
            Rank::MasterSergeant => "MASTER_SERGEANT",
            Rank::SergeantMajor => "SERGEANT_MAJOR",
            Rank::WarrantOfficer => "WARRANT_OFFICER",
            Rank::SecondLieutenant => "SECOND_LIEUTENANT",
            Rank::FirstLieutenant => "FIRST_LIEUTENANT",
            Rank::Captain => "CAPTAIN",
            Rank::Major => "MAJOR",
            Rank::LieutenantColonel => "LIEUTENANT_COLONEL",
            Rank::Colonel => "COLONEL",
            Rank::BrigadierGeneral => "BRIGADIER_GENERAL",
            Rank::MajorGeneral => "MAJOR_GENERAL",
            Rank::LieutenantGeneral => "LIEUTENANT_GENERAL",
            Rank::General => "GENERAL",
        }
    }
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Rank {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RANK_TABLE
            .iter()
            .map(|t| t.rank)
            .find(|r| r.as_str() == s)
            .ok_or_else(|| CoreError::Validation(format!("Unknown rank: '{s}'")))
    }
}

impl TryFrom<String> for Rank {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl RankCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            RankCategory::Soldier => "SOLDIER",
            RankCategory::Nco => "NCO",
            RankCategory::Officer => "OFFICER",
            RankCategory::General => "GENERAL",
        }
    }
}

impl fmt::Display for RankCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RankCategory {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SOLDIER" => Ok(RankCategory::Soldier),
            "NCO" => Ok(RankCategory::Nco),
            "OFFICER" => Ok(RankCategory::Officer),
            "GENERAL" => Ok(RankCategory::General),
            other => Err(CoreError::Validation(format!(
                "Unknown rank category: '{other}'"
            ))),
        }
    }
}

impl TryFrom<String> for RankCategory {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

// ---------------------------------------------------------------------------
// Rank computation
// ---------------------------------------------------------------------------

/// Map cumulative activity points to `(rank, category)`.
///
/// Scans the table in ascending order and keeps the last rank whose
/// threshold is `<=` `activity_points`. Anything below the first threshold
/// (including negative or NaN input) yields the lowest rank.
pub fn compute_rank(activity_points: f64) -> (Rank, RankCategory) {
    let mut selected = Rank::LOWEST;
    for threshold in &RANK_TABLE {
        if threshold.min_points <= activity_points {
            selected = threshold.rank;
        } else {
            break;
        }
    }
    (selected, selected.category())
}

/// A change of rank detected after points moved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RankTransition {
    pub from: Rank,
    pub to: Rank,
    pub category: RankCategory,
}

impl RankTransition {
    pub fn is_promotion(&self) -> bool {
        self.to > self.from
    }
}

/// Recompute the rank for `activity_points` and report a transition when it
/// differs from `current`.
pub fn detect_transition(current: Rank, activity_points: f64) -> Option<RankTransition> {
    let (rank, category) = compute_rank(activity_points);
    (rank != current).then_some(RankTransition {
        from: current,
        to: rank,
        category,
    })
}

// ---------------------------------------------------------------------------
// Rank history
// ---------------------------------------------------------------------------

/// One entry of a user's append-only rank history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankHistoryEntry {
    pub rank: Rank,
    pub date: Timestamp,
    pub reason: String,
}

impl RankHistoryEntry {
    pub fn new(rank: Rank, date: Timestamp, reason: impl Into<String>) -> Self {
        Self {
            rank,
            date,
            reason: reason.into(),
        }
    }
}

/// History reason for a transition caused by earned points.
pub fn transition_reason(transition: &RankTransition, activity_points: f64) -> String {
    let verb = if transition.is_promotion() {
        "Promoted"
    } else {
        "Demoted"
    };
    format!(
        "{verb} from {} to {} at {activity_points} activity points",
        transition.from, transition.to
    )
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    // -- table shape ----------------------------------------------------------

    #[test]
    fn thresholds_strictly_increase_from_zero() {
        assert_eq!(RANK_TABLE[0].min_points, 0.0);
        for pair in RANK_TABLE.windows(2) {
            assert!(pair[0].min_points < pair[1].min_points);
            assert!(pair[0].rank < pair[1].rank);
        }
    }

    #[test]
    fn categories_partition_the_ladder() {
        let total =
            SOLDIER_RANKS.len() + NCO_RANKS.len() + OFFICER_RANKS.len() + GENERAL_RANKS.len();
        assert_eq!(total, RANK_TABLE.len());
        assert_eq!(RANK_TABLE[3].rank.category(), RankCategory::Soldier);
        assert_eq!(RANK_TABLE[4].rank.category(), RankCategory::Nco);
        assert_eq!(RANK_TABLE[8].rank.category(), RankCategory::Officer);
        assert_eq!(RANK_TABLE[14].rank.category(), RankCategory::Officer);
        assert_eq!(RANK_TABLE[15].rank.category(), RankCategory::General);
    }

    #[test]
    fn ordinal_matches_table_position() {
        for (i, t) in RANK_TABLE.iter().enumerate() {
            assert_eq!(t.rank.ordinal(), i);
        }
    }

    // -- compute_rank ---------------------------------------------------------

    #[test]
    fn zero_points_is_lowest_rank() {
        assert_eq!(
            compute_rank(0.0),
            (Rank::PrivateSecondClass, RankCategory::Soldier)
        );
    }

    #[test]
    fn negative_points_is_lowest_rank() {
        assert_eq!(compute_rank(-5.0).0, Rank::PrivateSecondClass);
    }

    #[test]
    fn exact_threshold_selects_that_rank() {
        assert_eq!(compute_rank(100.0).0, Rank::PrivateFirstClass);
        assert_eq!(compute_rank(1000.0), (Rank::StaffSergeant, RankCategory::Nco));
    }

    #[test]
    fn just_below_threshold_selects_previous_rank() {
        assert_eq!(compute_rank(99.9).0, Rank::PrivateSecondClass);
        assert_eq!(compute_rank(17_099.0).0, Rank::LieutenantGeneral);
    }

    #[test]
    fn points_beyond_top_keep_highest_rank() {
        assert_eq!(
            compute_rank(1_000_000.0),
            (Rank::General, RankCategory::General)
        );
    }

    #[test]
    fn selected_rank_is_highest_qualifying() {
        let mut p = 0.0;
        while p < 18_000.0 {
            let (rank, _) = compute_rank(p);
            assert!(rank.min_points() <= p);
            let higher_qualifies = RANK_TABLE
                .iter()
                .any(|t| t.min_points > rank.min_points() && t.min_points <= p);
            assert!(!higher_qualifies, "points {p} selected {rank}");
            p += 37.5;
        }
    }

    #[test]
    fn rank_is_monotonic_in_points() {
        let mut previous = Rank::LOWEST;
        for step in 0..2000 {
            let (rank, _) = compute_rank(step as f64 * 10.0);
            assert!(rank >= previous);
            previous = rank;
        }
    }

    // -- transitions ----------------------------------------------------------

    #[test]
    fn no_transition_when_rank_unchanged() {
        assert!(detect_transition(Rank::PrivateSecondClass, 90.0).is_none());
    }

    #[test]
    fn promotion_detected() {
        let t = detect_transition(Rank::PrivateSecondClass, 100.0).unwrap();
        assert_eq!(t.from, Rank::PrivateSecondClass);
        assert_eq!(t.to, Rank::PrivateFirstClass);
        assert!(t.is_promotion());
    }

    #[test]
    fn demotion_detected() {
        let t = detect_transition(Rank::Corporal, 150.0).unwrap();
        assert_eq!(t.to, Rank::PrivateFirstClass);
        assert!(!t.is_promotion());
        assert!(transition_reason(&t, 150.0).starts_with("Demoted"));
    }

    // -- string forms ---------------------------------------------------------

    #[test]
    fn rank_string_roundtrips_through_from_str() {
        for t in &RANK_TABLE {
            assert_eq!(t.rank.as_str().parse::<Rank>().unwrap(), t.rank);
        }
        assert!("FIELD_MARSHAL".parse::<Rank>().is_err());
    }

    #[test]
    fn rank_serializes_as_screaming_snake_case() {
        let json = serde_json::to_string(&Rank::SergeantFirstClass).unwrap();
        assert_eq!(json, "\"SERGEANT_FIRST_CLASS\"");
        let json = serde_json::to_string(&RankCategory::Nco).unwrap();
        assert_eq!(json, "\"NCO\"");
    }
}
