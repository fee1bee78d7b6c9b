use super::sync::SyncError;
use super::unit::UnitError;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    UnitError(#[from] UnitError),

    #[error(transparent)]
    SyncError(#[from] SyncError),

    #[error(transparent)]
    DatabaseError(#[from] sqlx::Error),
}
