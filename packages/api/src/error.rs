use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::collections::HashMap;
use thiserror::Error;
use tracing::{error, info};
use uuid::Uuid;

use parkshare_core::{describe, ValidationError};
use parkshare_storage::StorageError;

/// Error type returned by every handler
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation failed: {}", describe(.0))]
    Validation(Vec<ValidationError>),

    #[error("{0} not found")]
    NotFound(String),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Structured error response format for API consistency
#[derive(Serialize)]
struct ErrorResponse {
    success: bool,
    error: ErrorDetail,
    request_id: String,
}

/// Error detail structure with machine-readable codes
#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<HashMap<String, String>>,
}

impl AppError {
    /// Convert AppError to appropriate HTTP status code and error code
    fn to_status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            AppError::Storage(storage_error) => match storage_error {
                StorageError::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
                StorageError::BusinessRule(_) => {
                    (StatusCode::BAD_REQUEST, "BUSINESS_RULE_VIOLATION")
                }
                StorageError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
                StorageError::DuplicateSpaceNumber(_) => {
                    (StatusCode::BAD_REQUEST, "DUPLICATE_SPACE_NUMBER")
                }
                StorageError::DuplicateHouseholdNumber(_) => {
                    (StatusCode::BAD_REQUEST, "DUPLICATE_HOUSEHOLD_NUMBER")
                }
                _ => (StatusCode::INTERNAL_SERVER_ERROR, "STORAGE_ERROR"),
            },
        }
    }

    /// Get user-friendly error message (sanitized for external consumption)
    fn to_user_message(&self) -> String {
        match self {
            AppError::Storage(storage_error) if !storage_error.is_client_error() => {
                "Data storage error".to_string()
            }
            other => other.to_string(),
        }
    }

    fn details(&self) -> Option<HashMap<String, String>> {
        let AppError::Validation(errors) = self else {
            return None;
        };
        let mut details: HashMap<String, String> = HashMap::new();
        for error in errors {
            details
                .entry(error.field.clone())
                .and_modify(|message| {
                    message.push_str("; ");
                    message.push_str(&error.message);
                })
                .or_insert_with(|| error.message.clone());
        }
        Some(details)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let request_id = Uuid::new_v4().to_string();
        let (status_code, error_code) = self.to_status_and_code();

        // Log internal errors with full context but don't expose details
        if status_code.is_server_error() {
            error!(
                request_id = %request_id,
                storage_error = %self,
                "Storage system error"
            );
        } else {
            info!(
                request_id = %request_id,
                error_code = %error_code,
                error = %self,
                "API error response"
            );
        }

        let error_response = ErrorResponse {
            success: false,
            error: ErrorDetail {
                code: error_code.to_string(),
                message: self.to_user_message(),
                details: self.details(),
            },
            request_id,
        };

        (status_code, Json(error_response)).into_response()
    }
}

/// Malformed JSON bodies are reported like any other validation failure
impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::invalid("body", rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::invalid("query", rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::invalid("id", rejection.body_text())
    }
}

/// Result type alias for API handlers
pub type ApiResult<T> = Result<T, AppError>;

/// Helper functions for common error scenarios
impl AppError {
    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation(vec![ValidationError::new(field, message)])
    }

    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound(resource.into())
    }

    /// Fail with every collected problem, or pass when there are none
    pub fn check(errors: Vec<ValidationError>) -> ApiResult<()> {
        if errors.is_empty() {
            Ok(())
        } else {
            Err(Self::Validation(errors))
        }
    }
}
