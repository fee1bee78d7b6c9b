use axum::http::StatusCode;

/// Failures of the synchronization core. `Unreachable` is non-fatal by
/// design: operator intents queue instead of failing.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("Unit not found")]
    UnitNotFound,

    #[error("Pin is not part of the unit's switch map")]
    UnknownPin,

    #[error("Unit is unreachable")]
    Unreachable,

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

impl SyncError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            SyncError::UnitNotFound => StatusCode::NOT_FOUND,
            SyncError::UnknownPin => StatusCode::NOT_FOUND,
            SyncError::Unreachable => StatusCode::SERVICE_UNAVAILABLE,
            SyncError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
