// ============================
// crates/backend-lib/src/error.rs
// ============================
//! Central error type + Axum integration.
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// Application error types with error codes and context
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    /// Unknown unique key and wrong password both surface this variant.
    /// The two causes must stay indistinguishable to callers.
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// Missing, expired or invalid session/token
    #[error("Not authenticated")]
    Unauthenticated,

    #[error("Authentication rate limit exceeded")]
    RateLimited,

    /// Stored password hash failed to parse
    #[error("Corrupt password hash")]
    CorruptHash,

    #[error("Store error: {0}")]
    Store(String),

    /// A store operation exceeded its deadline
    #[error("Store operation timed out")]
    Timeout,

    /// Fatal at startup only, never returned per-request
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::InvalidCredentials | AppError::Unauthenticated => {
                StatusCode::UNAUTHORIZED
            },
            AppError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            AppError::Timeout => StatusCode::GATEWAY_TIMEOUT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error code for this error
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "VAL_001",
            AppError::Conflict(_) => "CONFLICT_001",
            AppError::InvalidCredentials => "AUTH_001",
            AppError::Unauthenticated => "AUTH_002",
            AppError::RateLimited => "AUTH_003",
            AppError::CorruptHash => "AUTH_004",
            AppError::Store(_) => "STORE_001",
            AppError::Timeout => "STORE_002",
            AppError::Config(_) => "CFG_001",
            AppError::Io(_) => "IO_001",
            AppError::Json(_) => "JSON_001",
            AppError::Internal(_) => "INT_001",
        }
    }

    /// Get a sanitized message suitable for production use
    pub fn sanitized_message(&self) -> String {
        match self {
            AppError::Validation(msg) => msg.clone(),
            AppError::Conflict(_) => "Unique key already registered".to_string(),
            AppError::InvalidCredentials => "Invalid credentials".to_string(),
            AppError::Unauthenticated => "Not authenticated".to_string(),
            AppError::RateLimited => {
                "Too many authentication attempts, please try again later".to_string()
            },
            AppError::Timeout => "The request timed out, please retry".to_string(),
            AppError::Store(_) => "A storage error occurred".to_string(),
            AppError::Json(_) => "Invalid request format".to_string(),
            _ => "An internal server error occurred".to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error_code = self.error_code();

        // Use detailed messages in development, sanitized in production
        let message = if cfg!(debug_assertions) {
            self.to_string()
        } else {
            self.sanitized_message()
        };

        let body = serde_json::json!({
            "error": {
                "code": error_code,
                "message": message,
            }
        });

        (status, axum::Json(body)).into_response()
    }
}
