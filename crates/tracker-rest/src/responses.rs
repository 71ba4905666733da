//! API response types.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use tracker_bus::BusError;
use tracker_core::{ErrorResponse, TrackerError};

/// Body of a 404 from the event endpoint.
pub const PROGRAM_ID_NOT_FOUND: &str = "ProgramId not found";

/// Application error type for Axum.
#[derive(Debug)]
pub struct AppError(pub TrackerError);

impl From<TrackerError> for AppError {
    fn from(err: TrackerError) -> Self {
        Self(err)
    }
}

impl From<BusError> for AppError {
    fn from(err: BusError) -> Self {
        Self(err.into())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        (status, Json(ErrorResponse::from_error(&self.0))).into_response()
    }
}

/// Result type for Axum handlers.
pub type ApiResult<T> = Result<T, AppError>;

/// The 404 returned when a program id resolves to nothing.
pub fn program_not_found() -> Response {
    (StatusCode::NOT_FOUND, Json(PROGRAM_ID_NOT_FOUND)).into_response()
}

/// Rejects a missing or blank path id.
pub fn require_id(id: &str) -> ApiResult<&str> {
    let id = id.trim();
    if id.is_empty() {
        return Err(AppError(TrackerError::validation("event id is required")));
    }
    Ok(id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_follows_error() {
        let response = AppError(TrackerError::validation("x")).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = AppError::from(BusError::NoHandler("a".to_string())).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_require_id() {
        assert_eq!(require_id(" 42 ").unwrap(), "42");
        assert!(require_id("   ").is_err());
    }
}
