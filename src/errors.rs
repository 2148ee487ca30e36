//! Centralized error handling.
//!
//! Provides a unified error type for the entire application,
//! with automatic HTTP response conversion. Every error response
//! the service emits is built by [`error_response`], so the body
//! shape is identical across endpoints and causes.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A single failed rule on an inbound payload.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FieldViolation {
    pub field: String,
    pub message: String,
}

impl FieldViolation {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Authentication & Authorization
    #[error("Authentication required")]
    Unauthorized,

    #[error("Invalid credentials")]
    InvalidCredentials,

    // Resource errors
    #[error("Resource not found")]
    NotFound,

    #[error("{0} already exists")]
    Conflict(String),

    // Validation
    #[error("Request validation failed")]
    ValidationFailed(Vec<FieldViolation>),

    // Unit of work misuse
    #[error("Invalid unit of work state: {0}")]
    InvalidState(String),

    // External service errors
    #[error("Persistence error")]
    Persistence(#[from] sea_orm::DbErr),

    #[error("Token error")]
    Jwt(#[from] jsonwebtoken::errors::Error),

    // Internal
    #[error("Internal server error")]
    Internal(String),
}

/// Error response body
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub status: u16,
    pub kind: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub violations: Vec<FieldViolation>,
}

/// Diagnostic attached to error responses for the exception boundary to log.
///
/// Carries the internal detail that is never written to the response body.
#[derive(Debug, Clone)]
pub struct ErrorReport {
    pub kind: &'static str,
    pub detail: String,
}

impl AppError {
    /// Get error code for client
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Unauthorized => "UNAUTHORIZED",
            AppError::InvalidCredentials => "INVALID_CREDENTIALS",
            AppError::NotFound => "NOT_FOUND",
            AppError::Conflict(_) => "CONFLICT",
            AppError::ValidationFailed(_) => "VALIDATION_FAILED",
            AppError::InvalidState(_) => "INVALID_STATE",
            AppError::Persistence(_) => "PERSISTENCE_ERROR",
            AppError::Jwt(_) | AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Get HTTP status code
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Unauthorized | AppError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::ValidationFailed(_) => StatusCode::BAD_REQUEST,
            AppError::InvalidState(_)
            | AppError::Persistence(_)
            | AppError::Jwt(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get user-facing message (hides internal details)
    fn user_message(&self) -> String {
        match self {
            AppError::Conflict(entity) => format!("{} already exists", entity),
            AppError::InvalidState(_) => "The request could not be completed".to_string(),
            AppError::Persistence(_) => "Changes could not be saved".to_string(),
            AppError::Jwt(_) | AppError::Internal(_) => "An internal error occurred".to_string(),
            _ => self.to_string(),
        }
    }

    /// Internal detail for logs
    fn detail(&self) -> String {
        match self {
            AppError::InvalidState(msg) | AppError::Internal(msg) => msg.clone(),
            AppError::Persistence(e) => e.to_string(),
            AppError::Jwt(e) => e.to_string(),
            AppError::ValidationFailed(violations) => {
                format!("{} violation(s)", violations.len())
            }
            other => other.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let report = ErrorReport {
            kind: self.kind(),
            detail: self.detail(),
        };
        let message = self.user_message();
        let status = self.status();
        let violations = match self {
            AppError::ValidationFailed(violations) => violations,
            _ => Vec::new(),
        };

        let mut response = error_response(status, report.kind, message, violations);
        response.extensions_mut().insert(report);
        response
    }
}

/// Build the uniform error response.
pub fn error_response(
    status: StatusCode,
    kind: &str,
    message: impl Into<String>,
    violations: Vec<FieldViolation>,
) -> Response {
    let body = ErrorResponse {
        error: ErrorBody {
            status: status.as_u16(),
            kind: kind.to_string(),
            message: message.into(),
            violations,
        },
    };

    (status, Json(body)).into_response()
}

/// Result type alias
pub type AppResult<T> = Result<T, AppError>;

/// Extension trait for Option -> AppError conversion
pub trait OptionExt<T> {
    fn ok_or_not_found(self) -> AppResult<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_not_found(self) -> AppResult<T> {
        self.ok_or(AppError::NotFound)
    }
}

/// Convenience constructors
impl AppError {
    pub fn conflict(entity: impl Into<String>) -> Self {
        AppError::Conflict(entity.into())
    }

    pub fn invalid_state(msg: impl Into<String>) -> Self {
        AppError::InvalidState(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        AppError::Internal(msg.into())
    }

    /// A validation failure on a single field.
    pub fn violation(field: impl Into<String>, message: impl Into<String>) -> Self {
        AppError::ValidationFailed(vec![FieldViolation::new(field, message)])
    }
}
