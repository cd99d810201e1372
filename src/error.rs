//! Error types and HTTP error response handling.
//!
//! This module defines all application errors and how they are converted
//! into HTTP responses with appropriate status codes and JSON bodies.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

/// Application-wide error type.
///
/// Each variant maps to a specific HTTP status code and error code.
///
/// # Error Categories
///
/// - **Database Errors**: Any sqlx::Error from database operations
/// - **Resource Errors**: Requested site, key or history entry not found
/// - **Availability Errors**: No key of a site can be issued or returned
/// - **Conflicts**: Unique or foreign-key constraint violations
/// - **Validation Errors**: Invalid request data or backup file
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Database operation failed (e.g., connection error, query error).
    ///
    /// Constraint violations never land here; `From<sqlx::Error>` turns them
    /// into `Conflict` or `InvalidRequest`.
    #[error("Database error: {0}")]
    Database(sqlx::Error),

    #[error("Site '{0}' not found")]
    SiteNotFound(String),

    #[error("Key with ID {0} not found")]
    KeyNotFound(i32),

    #[error("History entry with ID {0} not found")]
    HistoryNotFound(i32),

    /// Every key of the site is already issued (or the site has none).
    #[error("No available keys for site '{0}'")]
    NoAvailableKey(String),

    /// No key of the site is currently issued.
    #[error("No issued keys found for site '{0}'")]
    NoIssuedKey(String),

    /// The change would break a unique or foreign-key constraint.
    ///
    /// Returns HTTP 409 Conflict.
    #[error("{0}")]
    Conflict(String),

    /// Request body or parameters are invalid.
    ///
    /// Returns HTTP 400 Bad Request.
    #[error("{0}")]
    InvalidRequest(String),

    /// Uploaded backup is not a usable YAML document.
    #[error("Invalid backup file: {0}")]
    InvalidBackup(String),
}

impl From<sqlx::Error> for AppError {
    fn from(error: sqlx::Error) -> Self {
        if let sqlx::Error::Database(ref db_error) = error {
            if db_error.is_unique_violation() {
                return AppError::Conflict("Record already exists".to_string());
            }
            if db_error.is_foreign_key_violation() {
                return AppError::Conflict(
                    "Record is referenced by other records or references a missing one"
                        .to_string(),
                );
            }
            if db_error.is_check_violation() {
                return AppError::InvalidRequest(format!(
                    "Value rejected by constraint {}",
                    db_error.constraint().unwrap_or("check")
                ));
            }
        }
        AppError::Database(error)
    }
}

/// Convert AppError into an HTTP response.
///
/// # Response Format
///
/// All errors return JSON in this format:
/// ```json
/// {
///   "error": {
///     "code": "error_type",
///     "message": "Human-readable error message"
///   }
/// }
/// ```
///
/// # Status Code Mapping
///
/// - `SiteNotFound`, `KeyNotFound`, `HistoryNotFound` → 404 Not Found
/// - `NoAvailableKey`, `NoIssuedKey` → 404 Not Found
/// - `Conflict` → 409 Conflict
/// - `InvalidRequest`, `InvalidBackup` → 400 Bad Request
/// - `Database` → 500 Internal Server Error (hides details from client)
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = match self {
            AppError::SiteNotFound(_) => (StatusCode::NOT_FOUND, "site_not_found"),
            AppError::KeyNotFound(_) => (StatusCode::NOT_FOUND, "key_not_found"),
            AppError::HistoryNotFound(_) => (StatusCode::NOT_FOUND, "history_not_found"),
            AppError::NoAvailableKey(_) => (StatusCode::NOT_FOUND, "no_available_key"),
            AppError::NoIssuedKey(_) => (StatusCode::NOT_FOUND, "no_issued_key"),
            AppError::Conflict(_) => (StatusCode::CONFLICT, "conflict"),
            AppError::InvalidRequest(_) => (StatusCode::BAD_REQUEST, "invalid_request"),
            AppError::InvalidBackup(_) => (StatusCode::BAD_REQUEST, "invalid_backup"),
            AppError::Database(ref e) => {
                tracing::error!("Database error: {:?}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error")
            }
        };

        let message = match self {
            AppError::Database(_) => "An internal error occurred".to_string(),
            other => other.to_string(),
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}
