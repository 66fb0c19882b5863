//! Purchase points: a spendable balance independent of rank.

use crewhub_core::error::CoreError;
use crewhub_core::types::DbId;
use crewhub_db::models::user_level::UserLevel;
use crewhub_db::repositories::UserLevelRepo;
use crewhub_db::DbPool;

use crate::error::PointsError;

pub struct PurchasePoints;

impl PurchasePoints {
    /// Credit `amount` to the user's balance.
    pub async fn grant(pool: &DbPool, user_id: DbId, amount: i64) -> Result<UserLevel, PointsError> {
        validate_amount(amount)?;
        let level = UserLevelRepo::add_purchase_points(pool, user_id, amount).await?;
        tracing::info!(user_id, amount, balance = level.purchase_points, "Purchase points granted");
        Ok(level)
    }

    /// Debit `amount` from the user's balance.
    ///
    /// Spending more than the balance is a conflict and leaves the balance
    /// unchanged.
    pub async fn spend(pool: &DbPool, user_id: DbId, amount: i64) -> Result<UserLevel, PointsError> {
        validate_amount(amount)?;
        match UserLevelRepo::spend_purchase_points(pool, user_id, amount).await? {
            Some(level) => {
                tracing::info!(user_id, amount, balance = level.purchase_points, "Purchase points spent");
                Ok(level)
            }
            None => {
                let balance = UserLevelRepo::find_by_user(pool, user_id)
                    .await?
                    .map(|l| l.purchase_points)
                    .unwrap_or(0);
                Err(CoreError::Conflict(format!(
                    "Insufficient purchase points: balance {balance}, requested {amount}"
                ))
                .into())
            }
        }
    }
}

fn validate_amount(amount: i64) -> Result<(), CoreError> {
    if amount <= 0 {
        return Err(CoreError::Validation(format!(
            "Amount must be positive, got {amount}"
        )));
    }
    Ok(())
}
