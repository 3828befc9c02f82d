use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use sea_orm::{DbErr, SqlErr};
use serde::Serialize;
use thiserror::Error;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Maximum tree depth {max} exceeded: {level}")]
    DepthExceeded { level: i32, max: i32 },

    #[error("Cycle detected: {0}")]
    CycleDetected(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Sequence exhausted: {0}")]
    SequenceExhausted(String),

    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

/// Error response body
#[derive(Serialize)]
struct ErrorResponse {
    code: u16,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message, details) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "Not Found", Some(msg.clone())),
            AppError::Validation(msg) => {
                (StatusCode::BAD_REQUEST, "Validation Error", Some(msg.clone()))
            }
            AppError::DepthExceeded { .. } => {
                (StatusCode::BAD_REQUEST, "Depth Exceeded", Some(self.to_string()))
            }
            AppError::CycleDetected(msg) => {
                (StatusCode::BAD_REQUEST, "Cycle Detected", Some(msg.clone()))
            }
            AppError::Conflict(msg) => (StatusCode::CONFLICT, "Conflict", Some(msg.clone())),
            AppError::SequenceExhausted(msg) => {
                tracing::error!("Sequence exhausted: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Sequence Exhausted", None)
            }
            AppError::Database(err) => {
                tracing::error!("Database error: {}", err);
                (StatusCode::INTERNAL_SERVER_ERROR, "Database Error", None)
            }
        };

        let body = ErrorResponse {
            code: status.as_u16(),
            message: message.to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for application
pub type AppResult<T> = Result<T, AppError>;

/// Helper trait for converting Option to AppError::NotFound
pub trait OptionExt<T> {
    fn ok_or_not_found(self, msg: impl Into<String>) -> AppResult<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_not_found(self, msg: impl Into<String>) -> AppResult<T> {
        self.ok_or_else(|| AppError::NotFound(msg.into()))
    }
}

/// Turn a unique-index violation into a Conflict naming `what`
pub fn conflict_on_unique(err: DbErr, what: &str) -> AppError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(detail)) => {
            tracing::warn!("Unique violation on {}: {}", what, detail);
            AppError::Conflict(format!("{} already in use", what))
        }
        _ => AppError::Database(err),
    }
}
