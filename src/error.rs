// src/error.rs

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;

use crate::{
    models::question::InvalidQuestion,
    services::{delivery::GradeError, schedule::ScheduleError, scoring::ScoringError},
    utils::jwt::AuthError,
};

/// Global Application Error Enum.
/// Centralizes error handling and mapping to HTTP responses.
#[derive(Debug)]
pub enum AppError {
    // 500 Internal Server Error
    InternalServerError(String),

    // 400 Bad Request
    BadRequest(String),

    // 401 Unauthorized (missing, expired, malformed or revoked credential)
    AuthError(String),

    // 403 Forbidden (authenticated, wrong role)
    PermissionDenied(String),

    // 404 Not Found
    NotFound(String),

    // 409 Conflict (e.g., duplicate username, overlapping exam window)
    Conflict(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl std::error::Error for AppError {}

/// Implements `IntoResponse` for `AppError`.
/// Converts the error into a JSON response with appropriate HTTP status code.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::InternalServerError(msg) => {
                tracing::error!("Internal Server Error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal Server Error".to_string(),
                )
            }
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::AuthError(msg) => (StatusCode::UNAUTHORIZED, msg),
            AppError::PermissionDenied(msg) => (StatusCode::FORBIDDEN, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg),
        };
        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

/// Converts `sqlx::Error` into `AppError`.
/// Unique and exclusion violations become `Conflict`, everything else is internal.
impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        let code = err
            .as_database_error()
            .and_then(|db| db.code())
            .map(|c| c.into_owned());
        match code.as_deref() {
            Some("23505") => AppError::Conflict("Record already exists".to_string()),
            Some("23503") => AppError::NotFound("Referenced record not found".to_string()),
            Some("23P01") => {
                AppError::Conflict("Exam window overlaps with an existing exam".to_string())
            }
            _ => AppError::InternalServerError(err.to_string()),
        }
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

impl From<ScheduleError> for AppError {
    fn from(err: ScheduleError) -> Self {
        match err {
            ScheduleError::InvalidWindow { .. } => AppError::BadRequest(err.to_string()),
            ScheduleError::Conflict { .. } => AppError::Conflict(err.to_string()),
        }
    }
}

impl From<ScoringError> for AppError {
    fn from(err: ScoringError) -> Self {
        AppError::BadRequest(err.to_string())
    }
}

impl From<GradeError> for AppError {
    fn from(err: GradeError) -> Self {
        AppError::BadRequest(err.to_string())
    }
}

impl From<InvalidQuestion> for AppError {
    fn from(err: InvalidQuestion) -> Self {
        AppError::BadRequest(err.to_string())
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        AppError::AuthError(err.to_string())
    }
}
