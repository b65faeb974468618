//! Error handling
//!
//! Every error the service can produce and how it becomes an HTTP response.
//! Persistence and upstream failures are logged with a correlation id and
//! returned to the caller without internal detail.

use std::borrow::Cow;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

/// Main application error
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Cache error: {0}")]
    Cache(#[from] redis::RedisError),

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    #[error("JWT error: {0}")]
    Jwt(String),

    #[error("Hash error: {0}")]
    Hash(String),

    #[error("Payment gateway error: {0}")]
    ExternalApi(String),
}

/// JSON error body
#[derive(Debug, serde::Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    correlation_id: Option<String>,
}

impl ErrorResponse {
    fn new(error: &str, message: impl Into<String>, code: &str) -> Self {
        Self {
            error: error.to_string(),
            message: message.into(),
            details: None,
            code: Some(code.to_string()),
            correlation_id: None,
        }
    }

    /// Failure whose detail only goes to the log
    fn opaque(error: &str, message: &str, code: &str, detail: &str) -> Self {
        let correlation_id = Uuid::new_v4().to_string();
        tracing::error!(correlation_id = %correlation_id, code, "❌ {}: {}", error, detail);
        Self {
            correlation_id: Some(correlation_id),
            ..Self::new(error, message, code)
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            AppError::Database(e) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorResponse::opaque(
                    "Database Error",
                    "An error occurred while accessing the database",
                    "DB_ERROR",
                    &e.to_string(),
                ),
            ),

            AppError::Cache(e) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorResponse::opaque(
                    "Cache Error",
                    "An error occurred while accessing the cache",
                    "CACHE_ERROR",
                    &e.to_string(),
                ),
            ),

            AppError::Validation(e) => {
                tracing::debug!("Validation error: {}", e);
                let mut body = ErrorResponse::new(
                    "Validation Error",
                    "The provided data is invalid",
                    "VALIDATION_ERROR",
                );
                body.details = Some(json!(e));
                (StatusCode::BAD_REQUEST, body)
            }

            AppError::Unauthorized(msg) => {
                tracing::debug!("Unauthorized access: {}", msg);
                (
                    StatusCode::UNAUTHORIZED,
                    ErrorResponse::new("Unauthorized", msg, "UNAUTHORIZED"),
                )
            }

            AppError::Forbidden(msg) => (
                StatusCode::FORBIDDEN,
                ErrorResponse::new("Forbidden", msg, "FORBIDDEN"),
            ),

            AppError::NotFound(msg) => (
                StatusCode::NOT_FOUND,
                ErrorResponse::new("Not Found", msg, "NOT_FOUND"),
            ),

            AppError::Conflict(msg) => (
                StatusCode::CONFLICT,
                ErrorResponse::new("Conflict", msg, "CONFLICT"),
            ),

            AppError::BadRequest(msg) => (
                StatusCode::BAD_REQUEST,
                ErrorResponse::new("Bad Request", msg, "BAD_REQUEST"),
            ),

            AppError::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorResponse::opaque(
                    "Internal Server Error",
                    "An unexpected error occurred",
                    "INTERNAL_ERROR",
                    &msg,
                ),
            ),

            AppError::RateLimitExceeded => (
                StatusCode::TOO_MANY_REQUESTS,
                ErrorResponse::new(
                    "Rate Limit Exceeded",
                    "Too many requests. Please try again later",
                    "RATE_LIMIT_EXCEEDED",
                ),
            ),

            AppError::Jwt(msg) => {
                tracing::debug!("JWT error: {}", msg);
                (
                    StatusCode::UNAUTHORIZED,
                    ErrorResponse::new("Unauthorized", "Invalid or expired session", "JWT_ERROR"),
                )
            }

            AppError::Hash(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorResponse::opaque(
                    "Hash Error",
                    "An error occurred while processing credentials",
                    "HASH_ERROR",
                    &msg,
                ),
            ),

            AppError::ExternalApi(msg) => (
                StatusCode::BAD_GATEWAY,
                ErrorResponse::opaque(
                    "Payment Gateway Error",
                    "An error occurred while communicating with the payment gateway",
                    "PAYMENT_GATEWAY_ERROR",
                    &msg,
                ),
            ),
        };

        (status, Json(body)).into_response()
    }
}

/// Typed result for fallible operations
pub type AppResult<T> = Result<T, AppError>;

/// Field-level validation error
pub fn validation_error(field: &'static str, message: impl Into<Cow<'static, str>>) -> AppError {
    use validator::ValidationError;

    let mut error = ValidationError::new("invalid");
    error.message = Some(message.into());

    let mut errors = validator::ValidationErrors::new();
    errors.add(field, error);

    AppError::Validation(errors)
}

pub fn not_found_error(resource: &str, id: impl std::fmt::Display) -> AppError {
    AppError::NotFound(format!("{} with id '{}' not found", resource, id))
}

pub fn conflict_error(resource: &str, field: &str, value: &str) -> AppError {
    AppError::Conflict(format!("{} with {} '{}' already exists", resource, field, value))
}

/// Turn a unique-constraint violation into a conflict, pass everything else through
pub fn map_unique_violation(error: sqlx::Error, resource: &str, field: &str, value: &str) -> AppError {
    match &error {
        sqlx::Error::Database(db) if db.code().as_deref() == Some("23505") => {
            conflict_error(resource, field, value)
        }
        _ => AppError::Database(error),
    }
}

impl From<serde_json::Error> for AppError {
    fn from(e: serde_json::Error) -> Self {
        AppError::Internal(format!("Serialization error: {}", e))
    }
}
