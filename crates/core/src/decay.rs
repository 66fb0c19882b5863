//! Inactivity decay arithmetic.
//!
//! A user is stale once their last activity is older than one inactivity
//! period. A stale user loses a fixed amount per whole period elapsed since
//! their last reduction (or their last activity if they were never reduced),
//! floored at a minimum.

use chrono::Duration;

use crate::types::Timestamp;

/// Default inactivity period in days.
pub const DEFAULT_INACTIVITY_DAYS: i64 = 30;

/// Default points removed per elapsed period.
pub const DEFAULT_REDUCTION_POINTS: f64 = 100.0;

/// Default floor for activity points.
pub const DEFAULT_MIN_POINTS: f64 = 0.0;

/// Tunable decay parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecayPolicy {
    pub inactivity_period: Duration,
    pub reduction_points: f64,
    pub min_points: f64,
}

impl Default for DecayPolicy {
    fn default() -> Self {
        Self {
            inactivity_period: Duration::days(DEFAULT_INACTIVITY_DAYS),
            reduction_points: DEFAULT_REDUCTION_POINTS,
            min_points: DEFAULT_MIN_POINTS,
        }
    }
}

/// Result of evaluating decay for one user.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecayOutcome {
    /// Whole inactivity periods elapsed since the decay anchor.
    pub periods: i64,
    pub points_before: f64,
    pub points_after: f64,
}

impl DecayOutcome {
    pub fn reduced_by(&self) -> f64 {
        self.points_before - self.points_after
    }

    /// History reason recorded alongside the recomputed rank.
    pub fn reason(&self) -> String {
        format!(
            "Inactivity decay: -{} points over {} period(s)",
            self.reduced_by(),
            self.periods
        )
    }
}

impl DecayPolicy {
    /// Users whose last activity is before this instant are stale.
    pub fn stale_cutoff(&self, now: Timestamp) -> Timestamp {
        now - self.inactivity_period
    }

    pub fn is_stale(&self, last_activity_at: Timestamp, now: Timestamp) -> bool {
        last_activity_at < self.stale_cutoff(now)
    }

    /// Evaluate decay for one user.
    ///
    /// Returns `None` when the user is not stale or no whole period has
    /// elapsed since the anchor: the last reduction, or the last activity
    /// when there was none. Points never go below `min_points` and never
    /// increase.
    pub fn evaluate(
        &self,
        activity_points: f64,
        last_activity_at: Timestamp,
        last_points_reduction_at: Option<Timestamp>,
        now: Timestamp,
    ) -> Option<DecayOutcome> {
        if !self.is_stale(last_activity_at, now) {
            return None;
        }

        let anchor = last_points_reduction_at.unwrap_or(last_activity_at);

        let period_secs = self.inactivity_period.num_seconds();
        if period_secs <= 0 {
            return None;
        }
        let periods = (now - anchor).num_seconds() / period_secs;
        if periods <= 0 {
            return None;
        }

        let reduced = activity_points - periods as f64 * self.reduction_points;
        let points_after = reduced.max(self.min_points).min(activity_points);

        Some(DecayOutcome {
            periods,
            points_before: activity_points,
            points_after,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn now() -> Timestamp {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
    }

    // -- staleness ------------------------------------------------------------

    #[test]
    fn recent_activity_is_not_stale() {
        let policy = DecayPolicy::default();
        let last = now() - Duration::days(10);
        assert!(!policy.is_stale(last, now()));
        assert!(policy.evaluate(500.0, last, None, now()).is_none());
    }

    #[test]
    fn exactly_one_period_is_not_stale() {
        let policy = DecayPolicy::default();
        let last = now() - Duration::days(30);
        assert!(!policy.is_stale(last, now()));
    }

    // -- evaluation -----------------------------------------------------------

    #[test]
    fn sixty_five_days_never_reduced_is_two_periods() {
        let policy = DecayPolicy::default();
        let last = now() - Duration::days(65);
        let outcome = policy.evaluate(1000.0, last, None, now()).unwrap();
        assert_eq!(outcome.periods, 2);
        assert_eq!(outcome.points_after, 800.0);
        assert_eq!(outcome.reduced_by(), 200.0);
    }

    #[test]
    fn reduction_is_floored_at_minimum() {
        let policy = DecayPolicy::default();
        let last = now() - Duration::days(65);
        let outcome = policy.evaluate(150.0, last, None, now()).unwrap();
        assert_eq!(outcome.points_after, 0.0);
        assert_eq!(outcome.reduced_by(), 150.0);
    }

    #[test]
    fn no_second_reduction_within_same_period() {
        let policy = DecayPolicy::default();
        let last = now() - Duration::days(66);
        let reduced_at = now() - Duration::days(1);
        assert!(policy
            .evaluate(800.0, last, Some(reduced_at), now())
            .is_none());
    }

    #[test]
    fn counts_periods_since_last_reduction() {
        let policy = DecayPolicy::default();
        let last = now() - Duration::days(100);
        let reduced_at = now() - Duration::days(31);
        let outcome = policy
            .evaluate(800.0, last, Some(reduced_at), now())
            .unwrap();
        assert_eq!(outcome.periods, 1);
        assert_eq!(outcome.points_after, 700.0);
    }

    #[test]
    fn reduction_anchor_wins_over_later_activity() {
        let policy = DecayPolicy::default();
        let reduced_at = now() - Duration::days(100);
        let last = now() - Duration::days(61);
        let outcome = policy
            .evaluate(1000.0, last, Some(reduced_at), now())
            .unwrap();
        assert_eq!(outcome.periods, 3);
        assert_eq!(outcome.points_after, 700.0);
    }

    #[test]
    fn activity_anchor_only_without_reduction() {
        let policy = DecayPolicy::default();
        let last = now() - Duration::days(61);
        let outcome = policy.evaluate(1000.0, last, None, now()).unwrap();
        assert_eq!(outcome.periods, 2);
        assert_eq!(outcome.points_after, 800.0);
    }

    #[test]
    fn already_at_floor_reduces_nothing() {
        let policy = DecayPolicy::default();
        let last = now() - Duration::days(90);
        let outcome = policy.evaluate(0.0, last, None, now()).unwrap();
        assert_eq!(outcome.reduced_by(), 0.0);
    }

    #[test]
    fn reason_mentions_points_and_periods() {
        let outcome = DecayOutcome {
            periods: 2,
            points_before: 1000.0,
            points_after: 800.0,
        };
        assert_eq!(
            outcome.reason(),
            "Inactivity decay: -200 points over 2 period(s)"
        );
    }
}
