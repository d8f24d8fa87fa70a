//! # API Error Types
//!
//! Structured error type implementing `axum::response::IntoResponse`.
//! Maps [`CustodyError`] from the engine to HTTP status codes and a JSON body
//! with a machine-readable code, a message, and optional details. Internal
//! error messages are logged and never returned to clients.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use custody_core::{CustodyError, ErrorKind, ValidationError};

/// Structured JSON error response body.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

/// Inner error detail.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g., "NOT_FOUND", "INVALID_STATE").
    pub code: String,
    /// Human-readable error message.
    pub message: String,
    /// Additional details; for validation errors, `{"field": ...}`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// Application-level error type that implements [`IntoResponse`] for Axum.
#[derive(Error, Debug)]
pub enum AppError {
    /// Resource not found (404).
    #[error("{0}")]
    NotFound(String),

    /// A field failed validation (422).
    #[error("{message}")]
    Validation {
        message: String,
        field: Option<&'static str>,
    },

    /// Request body or query could not be parsed (400).
    #[error("{0}")]
    BadRequest(String),

    /// No usable session (401).
    #[error("{0}")]
    Unauthorized(String),

    /// Role not permitted (403).
    #[error("{0}")]
    Forbidden(String),

    /// Unique key already exists (409).
    #[error("{0}")]
    Conflict(String),

    /// Lifecycle transition not allowed from the current state (409).
    #[error("{0}")]
    InvalidState(String),

    /// Durable storage unavailable; safe to retry (503).
    #[error("{0}")]
    StorageUnavailable(String),

    /// Internal server error (500). Message is logged but not returned to client.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Return the HTTP status code and machine-readable error code for this error.
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            Self::Validation { .. } => (StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR"),
            Self::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            Self::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            Self::Forbidden(_) => (StatusCode::FORBIDDEN, "FORBIDDEN"),
            Self::Conflict(_) => (StatusCode::CONFLICT, "CONFLICT"),
            Self::InvalidState(_) => (StatusCode::CONFLICT, "INVALID_STATE"),
            Self::StorageUnavailable(_) => {
                (StatusCode::SERVICE_UNAVAILABLE, "STORAGE_UNAVAILABLE")
            }
            Self::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        let message = match &self {
            Self::Internal(_) => "An internal error occurred".to_string(),
            Self::StorageUnavailable(_) => {
                "Audit storage is unavailable; no changes were made".to_string()
            }
            other => other.to_string(),
        };

        match &self {
            Self::Internal(_) => tracing::error!(error = %self, "internal server error"),
            Self::StorageUnavailable(_) => tracing::error!(error = %self, "storage unavailable"),
            _ => {}
        }

        let details = match &self {
            Self::Validation {
                field: Some(field), ..
            } => Some(serde_json::json!({ "field": field })),
            _ => None,
        };

        let body = ErrorBody {
            error: ErrorDetail {
                code: code.to_string(),
                message,
                details,
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        Self::Validation {
            field: err.field(),
            message: err.to_string(),
        }
    }
}

impl From<CustodyError> for AppError {
    fn from(err: CustodyError) -> Self {
        match err {
            CustodyError::Validation(v) => v.into(),
            other => {
                let message = other.to_string();
                match other.kind() {
                    ErrorKind::Authentication => Self::Unauthorized(message),
                    ErrorKind::Authorization => Self::Forbidden(message),
                    ErrorKind::Validation => Self::Validation {
                        message,
                        field: None,
                    },
                    ErrorKind::Conflict => Self::Conflict(message),
                    ErrorKind::State => Self::InvalidState(message),
                    ErrorKind::NotFound => Self::NotFound(message),
                    ErrorKind::Storage => Self::StorageUnavailable(message),
                }
            }
        }
    }
}
