use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Result type for decision-core operations
pub type AppResult<T> = Result<T, Error>;

/// Errors that can occur in decision-core operations.
///
/// The HTTP layer maps each kind to a status code in `IntoResponse`; core
/// code never swallows one of these.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("capacity exceeded: {0}")]
    CapacityExceeded(String),

    #[error("unauthenticated: {0}")]
    Unauthenticated(String),
}

impl Error {
    /// Stable machine-readable tag for the error kind
    fn kind(&self) -> &'static str {
        match self {
            Error::NotFound(_) => "not_found",
            Error::PermissionDenied(_) => "permission_denied",
            Error::InvalidState(_) => "invalid_state",
            Error::Validation(_) => "validation_error",
            Error::CapacityExceeded(_) => "capacity_exceeded",
            Error::Unauthenticated(_) => "unauthenticated",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::PermissionDenied(_) => StatusCode::FORBIDDEN,
            Error::InvalidState(_) => StatusCode::CONFLICT,
            Error::Validation(_) => StatusCode::BAD_REQUEST,
            Error::CapacityExceeded(_) => StatusCode::CONFLICT,
            Error::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.kind(),
            message: self.to_string(),
        };
        (self.status(), Json(body)).into_response()
    }
}
