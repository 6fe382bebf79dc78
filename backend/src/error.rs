//! Error handling for the card stock server
//!
//! Every failure leaves the API as `{ "error", "message", "fields"? }`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use shared::{FieldErrors, LedgerError};
use std::collections::BTreeMap;
use thiserror::Error;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Request errors
    #[error("Validation error: {message}")]
    Validation { message: String, fields: FieldErrors },

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Duplicate entry: {0}")]
    DuplicateEntry(String),

    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),

    // Storage errors
    #[error("Storage error: {0}")]
    StorageError(String),

    // Database errors
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    // Internal errors
    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Internal server error")]
    InternalError(#[from] anyhow::Error),
}

impl AppError {
    /// Validation failure on a single field
    pub fn field(field: &str, message: impl Into<String>) -> Self {
        let message = message.into();
        AppError::Validation {
            fields: FieldErrors::single(field, message.clone()),
            message,
        }
    }

    /// Validation failure without a specific field
    pub fn invalid(message: impl Into<String>) -> Self {
        AppError::Validation {
            message: message.into(),
            fields: FieldErrors::new(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation { .. } => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::DuplicateEntry(_) => StatusCode::CONFLICT,
            AppError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::StorageError(_)
            | AppError::DatabaseError(_)
            | AppError::Internal(_)
            | AppError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn body(&self) -> ErrorResponse {
        let (error, message, fields) = match self {
            AppError::Validation { message, fields } => (
                "ValidationError",
                message.clone(),
                (!fields.is_empty()).then(|| fields.clone().into_map()),
            ),
            AppError::Unauthorized(msg) => ("Unauthorized", msg.clone(), None),
            AppError::Forbidden(msg) => ("Forbidden", msg.clone(), None),
            AppError::NotFound(resource) => ("NotFound", format!("{} not found", resource), None),
            AppError::DuplicateEntry(field) => (
                "Conflict",
                format!("A record with this {} already exists", field),
                None,
            ),
            AppError::PayloadTooLarge(msg) => ("PayloadTooLarge", msg.clone(), None),
            AppError::StorageError(_) => (
                "InternalServerError",
                "File storage is unavailable".to_string(),
                None,
            ),
            AppError::DatabaseError(_) | AppError::Internal(_) | AppError::InternalError(_) => (
                "InternalServerError",
                "An internal server error occurred".to_string(),
                None,
            ),
        };
        ErrorResponse {
            error: error.to_string(),
            message,
            fields,
        }
    }
}

/// Error response structure
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<BTreeMap<String, String>>,
}

impl From<FieldErrors> for AppError {
    fn from(fields: FieldErrors) -> Self {
        AppError::Validation {
            message: "Validation failed".to_string(),
            fields,
        }
    }
}

impl From<LedgerError> for AppError {
    fn from(err: LedgerError) -> Self {
        if err.is_forbidden() {
            return AppError::Forbidden(err.to_string());
        }
        match err.field() {
            Some(field) => AppError::field(field, err.to_string()),
            None => AppError::invalid(err.to_string()),
        }
    }
}

/// Map unique violations to 409, everything else stays a database error
pub fn map_unique_violation(err: sqlx::Error, field: &str) -> AppError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            AppError::DuplicateEntry(field.to_string())
        }
        _ => AppError::DatabaseError(err),
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Log the error for debugging
        if status.is_server_error() {
            tracing::error!("Error: {:?}", self);
        } else {
            tracing::warn!("Request rejected: {}", self);
        }

        (status, Json(self.body())).into_response()
    }
}

/// Result type alias for handlers
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use shared::{TransactionStatus, TransactionType};

    #[test]
    fn test_field_errors_become_bad_request() {
        let mut fields = FieldErrors::new();
        fields.add("qty", "qty is required");
        let err = AppError::from(fields);
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);

        let body = serde_json::to_value(err.body()).unwrap();
        assert_eq!(body["error"], "ValidationError");
        assert_eq!(body["fields"]["qty"], "qty is required");
    }

    #[test]
    fn test_insufficient_stock_is_field_error() {
        let err = AppError::from(LedgerError::InsufficientStock {
            requested: 81,
            available: 80,
        });
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        let body = serde_json::to_value(err.body()).unwrap();
        assert_eq!(
            body["fields"]["qty"],
            "Requested quantity 81 exceeds available quantity 80"
        );
    }

    #[test]
    fn test_not_posted_is_forbidden() {
        let err = AppError::from(LedgerError::NotPosted(TransactionStatus::Reversed));
        assert_eq!(err.status(), StatusCode::FORBIDDEN);
        let err = AppError::from(LedgerError::NotReversible(TransactionType::Adjustment));
        assert_eq!(err.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn test_amount_too_large_is_field_error() {
        let err = AppError::from(LedgerError::AmountTooLarge { field: "unitCost" });
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        let body = serde_json::to_value(err.body()).unwrap();
        assert_eq!(body["error"], "ValidationError");
        assert!(body["fields"]["unitCost"]
            .as_str()
            .unwrap()
            .contains("999999999999.99"));
    }

    #[test]
    fn test_not_found_message() {
        let body = serde_json::to_value(AppError::NotFound("Batch".into()).body()).unwrap();
        assert_eq!(body["error"], "NotFound");
        assert_eq!(body["message"], "Batch not found");
        assert!(body.get("fields").is_none());
    }

    #[test]
    fn test_internal_errors_hide_details() {
        let err = AppError::Internal("connection reset by peer".into());
        let body = serde_json::to_value(err.body()).unwrap();
        assert_eq!(body["message"], "An internal server error occurred");
    }
}
