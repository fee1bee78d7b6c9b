use axum::http::StatusCode;

#[derive(Debug, thiserror::Error)]
pub enum UnitError {
    #[error("Unit not found")]
    UnitNotFound,

    #[error("Switch slot not found")]
    SlotNotFound,

    #[error("Duplicate pin assignment in switch map")]
    PinConflict,

    #[error("Invalid switch kind")]
    InvalidKind,

    #[error("Invalid manual input mode")]
    InvalidMode,
}

impl UnitError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            UnitError::UnitNotFound => StatusCode::NOT_FOUND,
            UnitError::SlotNotFound => StatusCode::NOT_FOUND,
            UnitError::PinConflict => StatusCode::CONFLICT,
            UnitError::InvalidKind => StatusCode::BAD_REQUEST,
            UnitError::InvalidMode => StatusCode::BAD_REQUEST,
        }
    }
}
