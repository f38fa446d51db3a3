//! Error types for TubeScribe services
//!
//! Two layers:
//! - `StoreError`: the narrow contract of the summary store
//! - `AppError`: everything the gateway can surface, with error codes and
//!   HTTP status mapping

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

/// Errors raised by a summary store backend
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Missing or invalid connection setup. Raised at construction only.
    #[error("Store configuration error: {message}")]
    Configuration { message: String },

    /// The liveness probe failed
    #[error("Store connection error: {message}")]
    Connection { message: String },

    /// A write (or a structurally invalid read) failed on a live connection
    #[error("Persistence error: {message}")]
    Persistence { message: String },

    /// A required field was empty
    #[error("Invalid summary: field '{field}' must not be empty")]
    InvalidInput { field: &'static str },
}

/// Error codes for machine-readable error identification
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Validation errors (1xxx)
    ValidationError,
    InvalidUrls,

    // Resource errors (4xxx)
    VideoNotFound,

    // Database errors (7xxx)
    PersistenceError,
    ConnectionError,

    // External service errors (8xxx)
    UpstreamError,
    AllVideosFailed,

    // Internal errors (9xxx)
    ConfigurationError,
}

impl ErrorCode {
    /// Get the numeric code for this error
    pub fn as_code(&self) -> u16 {
        match self {
            ErrorCode::ValidationError => 1001,
            ErrorCode::InvalidUrls => 1002,

            ErrorCode::VideoNotFound => 4001,

            ErrorCode::PersistenceError => 7001,
            ErrorCode::ConnectionError => 7002,

            ErrorCode::UpstreamError => 8001,
            ErrorCode::AllVideosFailed => 8002,

            ErrorCode::ConfigurationError => 9002,
        }
    }
}

/// A single URL that could not be turned into video metadata
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FetchFailure {
    pub url: String,
    pub error: String,
}

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Validation errors
    #[error("Validation failed: {message}")]
    Validation {
        message: String,
        field: Option<String>,
    },

    #[error("No valid YouTube URLs provided")]
    InvalidUrls,

    #[error("Not a recognizable YouTube video URL: {url}")]
    InvalidUrl { url: String },

    // Resource errors
    #[error("Video not found: {video_id}")]
    VideoNotFound { video_id: String },

    // Store errors
    #[error(transparent)]
    Store(#[from] StoreError),

    // External service errors
    /// `retryable` marks network failures, rate limiting and 5xx answers
    #[error("{service} error: {message}")]
    Upstream {
        service: String,
        message: String,
        retryable: bool,
    },

    #[error("All {} videos failed to load", .failures.len())]
    AllVideosFailed { failures: Vec<FetchFailure> },

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    // Internal errors
    #[error("Configuration error: {message}")]
    Configuration { message: String },
}

impl AppError {
    /// Get the error code for this error
    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::Validation { .. } => ErrorCode::ValidationError,
            AppError::InvalidUrls | AppError::InvalidUrl { .. } => ErrorCode::InvalidUrls,
            AppError::VideoNotFound { .. } => ErrorCode::VideoNotFound,
            AppError::Store(StoreError::Configuration { .. }) => ErrorCode::ConfigurationError,
            AppError::Store(StoreError::Connection { .. }) => ErrorCode::ConnectionError,
            AppError::Store(StoreError::Persistence { .. }) => ErrorCode::PersistenceError,
            AppError::Store(StoreError::InvalidInput { .. }) => ErrorCode::ValidationError,
            AppError::Upstream { .. } | AppError::HttpClient(_) => ErrorCode::UpstreamError,
            AppError::AllVideosFailed { .. } => ErrorCode::AllVideosFailed,
            AppError::Configuration { .. } => ErrorCode::ConfigurationError,
        }
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            // 400 Bad Request
            AppError::Validation { .. }
            | AppError::InvalidUrls
            | AppError::InvalidUrl { .. }
            | AppError::Store(StoreError::InvalidInput { .. }) => StatusCode::BAD_REQUEST,

            // 404 Not Found
            AppError::VideoNotFound { .. } => StatusCode::NOT_FOUND,

            // 500 Internal Server Error
            AppError::Store(StoreError::Persistence { .. })
            | AppError::Store(StoreError::Configuration { .. })
            | AppError::Configuration { .. } => StatusCode::INTERNAL_SERVER_ERROR,

            // 502 Bad Gateway
            AppError::Upstream { .. }
            | AppError::AllVideosFailed { .. }
            | AppError::HttpClient(_) => StatusCode::BAD_GATEWAY,

            // 503 Service Unavailable
            AppError::Store(StoreError::Connection { .. }) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Check if this error should be logged at error level
    pub fn is_server_error(&self) -> bool {
        self.status_code().is_server_error()
    }

    /// Check if this error is a client error
    pub fn is_client_error(&self) -> bool {
        self.status_code().is_client_error()
    }

    fn details(&self) -> Option<serde_json::Value> {
        match self {
            AppError::AllVideosFailed { failures } => serde_json::to_value(failures).ok(),
            AppError::Validation { field: Some(field), .. } => {
                Some(serde_json::json!({ "field": field }))
            }
            AppError::Store(StoreError::InvalidInput { field }) => {
                Some(serde_json::json!({ "field": field }))
            }
            _ => None,
        }
    }
}

/// Structured error response for API
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorDetails,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetails {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.code();
        let message = self.to_string();

        // Log based on severity
        if self.is_server_error() {
            tracing::error!(
                error = %message,
                code = ?code,
                status = status.as_u16(),
                "Server error"
            );
        } else if self.is_client_error() {
            tracing::warn!(
                error = %message,
                code = ?code,
                status = status.as_u16(),
                "Client error"
            );
        }

        let body = ErrorResponse {
            error: ErrorDetails {
                code,
                message,
                details: self.details(),
            },
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_error_mapping() {
        let err = AppError::from(StoreError::Connection {
            message: "probe failed".into(),
        });
        assert_eq!(err.code(), ErrorCode::ConnectionError);
        assert_eq!(err.status_code(), StatusCode::SERVICE_UNAVAILABLE);
        assert!(err.is_server_error());

        let err = AppError::from(StoreError::Persistence {
            message: "insert failed".into(),
        });
        assert_eq!(err.code(), ErrorCode::PersistenceError);
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_invalid_input_is_client_error() {
        let err = AppError::from(StoreError::InvalidInput { field: "title" });
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert!(err.is_client_error());
        assert_eq!(err.details(), Some(serde_json::json!({ "field": "title" })));
    }

    #[test]
    fn test_all_videos_failed_details() {
        let err = AppError::AllVideosFailed {
            failures: vec![FetchFailure {
                url: "https://youtu.be/xxxxxxxxxxx".into(),
                error: "Video not found".into(),
            }],
        };
        assert_eq!(err.status_code(), StatusCode::BAD_GATEWAY);
        assert_eq!(err.to_string(), "All 1 videos failed to load");
        let details = err.details().unwrap();
        assert_eq!(details[0]["url"], "https://youtu.be/xxxxxxxxxxx");
    }

    #[test]
    fn test_numeric_codes() {
        assert_eq!(ErrorCode::ConnectionError.as_code(), 7002);
        assert_eq!(ErrorCode::ConfigurationError.as_code(), 9002);
    }
}
