// src/error.rs

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;

/// Global Application Error Enum.
/// Centralizes error handling and mapping to HTTP responses.
#[derive(Debug)]
pub enum AppError {
    // 500 Internal Server Error
    InternalServerError(String),

    // 400 Bad Request
    BadRequest(String),

    // 404 Not Found
    NotFound(String),

    // 409 Conflict: no question pool has been imported yet
    PoolEmpty,

    // 409 Conflict: category and dedup filter left nothing to play
    RoundFilterExhausted { category: String },

    // 409 Conflict: optimistic write lost against a concurrent writer
    VersionConflict(String),

    // 403 Forbidden: the controller's motion sensor is off
    SensorPermissionDenied,
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::PoolEmpty => write!(f, "No question pool has been imported"),
            AppError::RoundFilterExhausted { category } => write!(
                f,
                "No unused questions left for category '{}'",
                category
            ),
            AppError::VersionConflict(room) => {
                write!(f, "Room '{}' was modified concurrently", room)
            }
            AppError::SensorPermissionDenied => {
                write!(f, "Motion sensor is not available for this controller")
            }
            other => write!(f, "{:?}", other),
        }
    }
}

impl std::error::Error for AppError {}

/// Implements `IntoResponse` for `AppError`.
/// Converts the error into a JSON response with appropriate HTTP status code.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let display = self.to_string();
        let (status, error_message) = match self {
            AppError::InternalServerError(msg) => {
                tracing::error!("Internal Server Error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal Server Error".to_string(),
                )
            }
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::SensorPermissionDenied => (StatusCode::FORBIDDEN, display),
            AppError::PoolEmpty
            | AppError::RoundFilterExhausted { .. }
            | AppError::VersionConflict(_) => (StatusCode::CONFLICT, display),
        };
        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

/// Converts `sqlx::Error` into `AppError::InternalServerError`.
/// Allows using `?` operator on database queries.
impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::InternalServerError(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::BadRequest(err.to_string())
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::BadRequest(err.to_string())
    }
}
