// src/error.rs

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use std::fmt;
use utoipa::ToSchema;

/// Global Application Error Enum.
/// Centralizes error handling and mapping to HTTP responses.
///
/// Every variant carries a human-readable message; `kind()` is the stable
/// machine-readable tag sent alongside it.
#[derive(Debug)]
pub enum AppError {
    // 500 Internal Server Error
    InternalServerError(String),

    // 400 Bad Request (malformed input)
    BadRequest(String),

    // 401 Unauthorized
    AuthError(String),

    // 403 Forbidden
    AccessDenied(String),

    // 404 Not Found
    NotFound(String),

    // 400, attempt lifecycle preconditions
    NotPublished(String),
    NotActive(String),
    Expired(String),
    AlreadyActive(String),
    AlreadyFinalized(String),
}

/// JSON body of every error response.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    /// Human-readable message.
    pub error: String,
    /// Stable machine-readable kind, e.g. `expired` or `already_active`.
    pub kind: String,
}

impl AppError {
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::InternalServerError(_) => "internal",
            AppError::BadRequest(_) => "invalid",
            AppError::AuthError(_) => "unauthorized",
            AppError::AccessDenied(_) => "access_denied",
            AppError::NotFound(_) => "not_found",
            AppError::NotPublished(_) => "not_published",
            AppError::NotActive(_) => "not_active",
            AppError::Expired(_) => "expired",
            AppError::AlreadyActive(_) => "already_active",
            AppError::AlreadyFinalized(_) => "already_finalized",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::InternalServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::AuthError(_) => StatusCode::UNAUTHORIZED,
            AppError::AccessDenied(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::BadRequest(_)
            | AppError::NotPublished(_)
            | AppError::NotActive(_)
            | AppError::Expired(_)
            | AppError::AlreadyActive(_)
            | AppError::AlreadyFinalized(_) => StatusCode::BAD_REQUEST,
        }
    }

    fn message(&self) -> &str {
        match self {
            AppError::InternalServerError(msg)
            | AppError::BadRequest(msg)
            | AppError::AuthError(msg)
            | AppError::AccessDenied(msg)
            | AppError::NotFound(msg)
            | AppError::NotPublished(msg)
            | AppError::NotActive(msg)
            | AppError::Expired(msg)
            | AppError::AlreadyActive(msg)
            | AppError::AlreadyFinalized(msg) => msg,
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind(), self.message())
    }
}

impl std::error::Error for AppError {}

/// Implements `IntoResponse` for `AppError`.
/// Converts the error into a JSON response with appropriate HTTP status code.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error_message = match &self {
            AppError::InternalServerError(msg) => {
                tracing::error!("Internal Server Error: {}", msg);
                "Internal Server Error".to_string()
            }
            other => other.message().to_string(),
        };
        let body = Json(ErrorBody {
            error: error_message,
            kind: self.kind().to_string(),
        });

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
