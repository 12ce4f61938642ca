//! Error handling module
//!
//! Centralized error types and HTTP response conversion.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::domain::DomainError;

/// Application-wide Result type
pub type AppResult<T> = Result<T, AppError>;

/// Postgres SQLSTATE for `lock_not_available` (lock_timeout expired)
const PG_LOCK_NOT_AVAILABLE: &str = "55P03";

/// Postgres SQLSTATE for `unique_violation`
const PG_UNIQUE_VIOLATION: &str = "23505";

/// Application error types
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    // Client errors (4xx)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Unauthenticated")]
    Unauthorized,

    #[error("Transaction not found: {0}")]
    TransactionNotFound(i64),

    #[error("Idempotency conflict: key already used for a different or concurrent request")]
    IdempotencyConflict,

    // Domain errors
    #[error(transparent)]
    Domain(#[from] DomainError),

    // Retryable storage contention (503)
    #[error("Account is busy, please retry")]
    LockTimeout,

    // Server errors (5xx)
    #[error("Database error: {0}")]
    Database(sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        let code = err
            .as_database_error()
            .and_then(|db| db.code().map(|c| c.into_owned()));

        match code.as_deref() {
            Some(PG_LOCK_NOT_AVAILABLE) => AppError::LockTimeout,
            Some(PG_UNIQUE_VIOLATION)
                if err
                    .as_database_error()
                    .and_then(|db| db.constraint())
                    .is_some_and(|c| c.starts_with("idempotency_keys")) =>
            {
                AppError::IdempotencyConflict
            }
            _ => AppError::Database(err),
        }
    }
}

impl AppError {
    /// Whether retrying the whole operation may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, AppError::LockTimeout | AppError::Database(_))
    }
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub error_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_code, details) = match &self {
            // 422 Unprocessable Entity
            AppError::InvalidRequest(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "invalid_request",
                Some(msg.clone()),
            ),

            // 401 Unauthorized
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized", None),

            // 404 Not Found
            AppError::TransactionNotFound(id) => (
                StatusCode::NOT_FOUND,
                "transaction_not_found",
                Some(id.to_string()),
            ),

            // 409 Conflict
            AppError::IdempotencyConflict => (StatusCode::CONFLICT, "idempotency_conflict", None),

            // Domain errors are all caller-correctable
            AppError::Domain(domain_err) => match domain_err {
                DomainError::InsufficientBalance { .. } => (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    "insufficient_balance",
                    Some(domain_err.to_string()),
                ),
                DomainError::InvalidAmount(msg) => (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    "invalid_amount",
                    Some(msg.clone()),
                ),
                DomainError::AccountNotFound(id) => (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    "account_not_found",
                    Some(id.to_string()),
                ),
                DomainError::SameAccountTransfer => (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    "same_account_transfer",
                    None,
                ),
            },

            // 503 Service Unavailable
            AppError::LockTimeout => {
                tracing::warn!("Row lock wait timed out");
                (StatusCode::SERVICE_UNAVAILABLE, "lock_timeout", None)
            }

            // 500 Internal Server Error
            AppError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "database_error", None)
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", None)
            }
        };

        // Server faults never echo their cause
        let error = if status.is_server_error() && status != StatusCode::SERVICE_UNAVAILABLE {
            "Internal server error".to_string()
        } else {
            match &self {
                AppError::Domain(DomainError::InsufficientBalance { .. }) => {
                    "Insufficient balance".to_string()
                }
                other => other.to_string(),
            }
        };

        let body = ErrorResponse {
            error,
            error_code: error_code.to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}
