//! Activity points, ranks, badges and inactivity decay.
//!
//! - [`ActivityLedger`]: records point-earning activities, moves the user
//!   along the rank ladder and awards badges, in one transaction.
//! - [`BadgeEvaluator`]: awards catalog badges after an activity.
//! - [`DecaySweeper`]: periodic sweep reducing points of inactive users.
//! - [`PurchasePoints`]: the separate spendable currency.

pub mod badges;
pub mod config;
pub mod decay;
pub mod error;
pub mod ledger;
pub mod purchase;

pub use badges::{AwardedBadge, BadgeEvaluator};
pub use config::DecayConfig;
pub use decay::{DecayFailure, DecaySweepReport, DecaySweeper, UserDecayResult};
pub use error::PointsError;
pub use ledger::{ActivityLedger, ActivityOutcome};
pub use purchase::PurchasePoints;
