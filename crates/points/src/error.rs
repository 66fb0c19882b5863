use crewhub_core::error::CoreError;

/// Errors from the points services.
#[derive(Debug, thiserror::Error)]
pub enum PointsError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}
