//! # API Error Types
//!
//! Structured error type implementing `axum::response::IntoResponse`.
//! Maps store and identifier errors to HTTP status codes and returns JSON
//! error bodies with a code and message. Internal error details are logged
//! and never returned to clients.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use evhub_store::StoreError;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

/// Structured JSON error response body.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

/// Inner error detail.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g., "NOT_FOUND", "VALIDATION_ERROR").
    pub code: String,
    /// Human-readable error message.
    pub message: String,
    /// Additional details, present only for client errors.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// Application-level error type that implements [`IntoResponse`] for Axum.
#[derive(Error, Debug)]
pub enum AppError {
    /// Resource not found (404).
    #[error("not found: {0}")]
    NotFound(String),

    /// Request validation failed (422).
    #[error("validation error: {0}")]
    Validation(String),

    /// Request body could not be parsed (400).
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Request body exceeds the configured limit (413).
    #[error("payload too large: {0}")]
    PayloadTooLarge(String),

    /// Internal server error (500). Message is logged but not returned to client.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Return the HTTP status code and machine-readable error code for this error.
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            Self::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR"),
            Self::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            Self::PayloadTooLarge(_) => (StatusCode::PAYLOAD_TOO_LARGE, "PAYLOAD_TOO_LARGE"),
            Self::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        // Never expose internal error messages to clients.
        let message = match &self {
            Self::Internal(_) => "An internal error occurred".to_string(),
            other => other.to_string(),
        };

        if matches!(&self, Self::Internal(_)) {
            tracing::error!(error = %self, "internal server error");
        }

        let body = ErrorBody {
            error: ErrorDetail {
                code: code.to_string(),
                message,
                details: None,
            },
        };

        (status, Json(body)).into_response()
    }
}

/// Convert identifier parse failures to API errors.
impl From<evhub_core::ValidationError> for AppError {
    fn from(err: evhub_core::ValidationError) -> Self {
        Self::Validation(err.to_string())
    }
}

/// Convert content store errors to API errors.
///
/// A filename that yields no usable extension is the client's fault; every
/// other store failure is a server-side I/O problem.
impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        if err.is_client_error() {
            Self::Validation(err.to_string())
        } else {
            Self::Internal(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn status_codes() {
        let cases = [
            (AppError::NotFound("x".into()), StatusCode::NOT_FOUND, "NOT_FOUND"),
            (
                AppError::Validation("x".into()),
                StatusCode::UNPROCESSABLE_ENTITY,
                "VALIDATION_ERROR",
            ),
            (AppError::BadRequest("x".into()), StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            (
                AppError::PayloadTooLarge("x".into()),
                StatusCode::PAYLOAD_TOO_LARGE,
                "PAYLOAD_TOO_LARGE",
            ),
            (
                AppError::Internal("x".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
            ),
        ];
        for (err, status, code) in cases {
            assert_eq!(err.status_and_code(), (status, code), "{err:?}");
        }
    }

    #[test]
    fn invalid_filename_is_validation_error() {
        let app_err = AppError::from(StoreError::InvalidFilename("filename is empty".into()));
        assert!(matches!(app_err, AppError::Validation(ref m) if m.contains("filename is empty")));
    }

    #[test]
    fn io_failures_are_internal() {
        let err = StoreError::CreateDir {
            path: PathBuf::from("/data/03a"),
            source: std::io::Error::from(std::io::ErrorKind::PermissionDenied),
        };
        assert!(matches!(AppError::from(err), AppError::Internal(_)));
        let err = StoreError::NotADirectory(PathBuf::from("/data/03a"));
        assert!(matches!(AppError::from(err), AppError::Internal(_)));
    }

    #[test]
    fn record_id_error_is_validation() {
        let err = evhub_core::FileId::parse("0").unwrap_err();
        assert!(matches!(AppError::from(err), AppError::Validation(_)));
    }

    #[test]
    fn error_body_skips_empty_details() {
        let body = ErrorBody {
            error: ErrorDetail {
                code: "TEST".to_string(),
                message: "test message".to_string(),
                details: None,
            },
        };
        let json = serde_json::to_string(&body).unwrap();
        assert!(json.contains("test message"));
        assert!(!json.contains("details"));
    }

    // ── into_response tests ──────────────────────────────────────

    use http_body_util::BodyExt;

    async fn response_parts(err: AppError) -> (StatusCode, ErrorBody) {
        let response = err.into_response();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body: ErrorBody = serde_json::from_slice(&bytes).unwrap();
        (status, body)
    }

    #[tokio::test]
    async fn into_response_not_found() {
        let (status, body) = response_parts(AppError::NotFound("event 123".into())).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body.error.code, "NOT_FOUND");
        assert!(body.error.message.contains("event 123"));
    }

    #[tokio::test]
    async fn into_response_internal_hides_details() {
        let err = AppError::from(StoreError::Write {
            path: PathBuf::from("/data/03a/c67/secret.jpg"),
            source: std::io::Error::from(std::io::ErrorKind::Other),
        });
        let (status, body) = response_parts(err).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body.error.message, "An internal error occurred");
        assert!(!body.error.message.contains("/data"));
    }
}
