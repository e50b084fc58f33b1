//! Error types for torrdown
//!
//! This module provides error handling for the library, including:
//! - Domain-specific error types (transfer engine, catalog, configuration)
//! - HTTP status code mapping for API integration
//! - Structured error responses with machine-readable error codes

use crate::types::JobId;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

/// Result type alias for torrdown operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for torrdown
///
/// This is the primary error type used throughout the library. Errors raised
/// inside a job's lifecycle task never reach the caller directly; they are
/// recorded on the job and surface through a status read.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "download_dir")
        key: Option<String>,
    },

    /// Operation referenced a job id that was never issued
    #[error("job not found: {0}")]
    NotFound(JobId),

    /// A job id supplied by a client could not be parsed
    #[error("invalid job id: {0}")]
    InvalidJobId(String),

    /// The source identifier handed to `start` is unusable
    #[error("invalid source identifier: {0}")]
    InvalidSource(String),

    /// Transfer engine operation failed
    #[error("transfer engine error: {0}")]
    Engine(#[from] EngineError),

    /// The external catalog could not be queried or its markup was unusable
    #[error("catalog unavailable: {0}")]
    CatalogUnavailable(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Shutdown in progress - not accepting new jobs
    #[error("shutdown in progress: not accepting new jobs")]
    ShuttingDown,

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// API server error
    #[error("API server error: {0}")]
    ApiServerError(String),

    /// Other error
    #[error("{0}")]
    Other(String),
}

/// Transfer engine errors
///
/// Acquisition failures terminate the job. Pause and resume failures are
/// retried on the next poll tick. Release failures are logged and swallowed.
#[derive(Debug, Clone, Error)]
pub enum EngineError {
    /// The engine itself could not be initialised
    #[error("engine initialisation failed: {0}")]
    Init(String),

    /// The engine refused or failed to create a handle for the identifier
    #[error("failed to acquire transfer for {identifier}: {reason}")]
    Acquire {
        /// The source identifier that was being acquired
        identifier: String,
        /// The reason acquisition failed
        reason: String,
    },

    /// Pausing an active transfer failed
    #[error("failed to pause transfer: {0}")]
    Pause(String),

    /// Resuming a paused transfer failed
    #[error("failed to resume transfer: {0}")]
    Resume(String),

    /// Releasing the engine handle failed
    #[error("failed to release transfer: {0}")]
    Release(String),
}

/// API error response format
///
/// This structure is returned by API endpoints when an error occurs.
///
/// # Example JSON Response
///
/// ```json
/// {
///   "error": {
///     "code": "not_found",
///     "message": "job not found: 6f2c...",
///     "details": {
///       "job_id": "6f2c..."
///     }
///   }
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApiError {
    /// The error details
    pub error: ErrorDetail,
}

/// Detailed error information for API responses
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g., "not_found", "invalid_job_id")
    pub code: String,

    /// Human-readable error message
    pub message: String,

    /// Optional additional context about the error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    /// Create a new API error with code and message
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ErrorDetail {
                code: code.into(),
                message: message.into(),
                details: None,
            },
        }
    }

    /// Create a "validation error" error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new("validation_error", message)
    }

    /// Create an "internal server error"
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new("internal_error", message)
    }
}

/// Convert errors to HTTP status codes for API responses
pub trait ToHttpStatus {
    /// Get the HTTP status code for this error
    fn status_code(&self) -> u16;

    /// Get the machine-readable error code
    fn error_code(&self) -> &str;
}

impl ToHttpStatus for Error {
    fn status_code(&self) -> u16 {
        match self {
            // 400 Bad Request - Client error (invalid input)
            Error::Config { .. } => 400,
            Error::InvalidJobId(_) => 400,
            Error::InvalidSource(_) => 422,

            // 404 Not Found
            Error::NotFound(_) => 404,

            // 500 Internal Server Error - Server-side issues
            Error::Io(_) => 500,
            Error::ApiServerError(_) => 500,
            Error::Serialization(_) => 500,
            Error::Other(_) => 500,

            // 502 Bad Gateway - External collaborators
            Error::Engine(_) => 502,
            Error::CatalogUnavailable(_) => 502,

            // 503 Service Unavailable
            Error::ShuttingDown => 503,
        }
    }

    fn error_code(&self) -> &str {
        match self {
            Error::Config { .. } => "config_error",
            Error::NotFound(_) => "not_found",
            Error::InvalidJobId(_) => "invalid_job_id",
            Error::InvalidSource(_) => "invalid_source",
            Error::Engine(e) => match e {
                EngineError::Init(_) => "engine_init_failed",
                EngineError::Acquire { .. } => "engine_acquire_failed",
                EngineError::Pause(_) => "engine_pause_failed",
                EngineError::Resume(_) => "engine_resume_failed",
                EngineError::Release(_) => "engine_release_failed",
            },
            Error::CatalogUnavailable(_) => "catalog_unavailable",
            Error::Io(_) => "io_error",
            Error::ShuttingDown => "shutting_down",
            Error::Serialization(_) => "serialization_error",
            Error::ApiServerError(_) => "api_server_error",
            Error::Other(_) => "internal_error",
        }
    }
}

impl From<Error> for ApiError {
    fn from(error: Error) -> Self {
        let code = error.error_code().to_string();
        let message = error.to_string();

        let details = match &error {
            Error::NotFound(id) => Some(serde_json::json!({
                "job_id": id,
            })),
            Error::InvalidJobId(raw) => Some(serde_json::json!({
                "job_id": raw,
            })),
            Error::Config { key: Some(key), .. } => Some(serde_json::json!({
                "key": key,
            })),
            Error::Engine(EngineError::Acquire { identifier, .. }) => Some(serde_json::json!({
                "source_identifier": identifier,
            })),
            _ => None,
        };

        ApiError {
            error: ErrorDetail {
                code,
                message,
                details,
            },
        }
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    /// Returns (Error, expected_status_code, expected_error_code) for every
    /// match arm in ToHttpStatus.
    fn all_error_variants() -> Vec<(Error, u16, &'static str)> {
        vec![
            (
                Error::Config {
                    message: "bad value".into(),
                    key: Some("download_dir".into()),
                },
                400,
                "config_error",
            ),
            (Error::InvalidJobId("xyz".into()), 400, "invalid_job_id"),
            (Error::InvalidSource("".into()), 422, "invalid_source"),
            (Error::NotFound(JobId::new()), 404, "not_found"),
            (
                Error::Io(std::io::Error::new(std::io::ErrorKind::NotFound, "gone")),
                500,
                "io_error",
            ),
            (
                Error::ApiServerError("bind failed".into()),
                500,
                "api_server_error",
            ),
            (Error::Other("unknown".into()), 500, "internal_error"),
            (
                Error::CatalogUnavailable("timeout".into()),
                502,
                "catalog_unavailable",
            ),
            (Error::ShuttingDown, 503, "shutting_down"),
            (
                Error::Engine(EngineError::Init("port in use".into())),
                502,
                "engine_init_failed",
            ),
            (
                Error::Engine(EngineError::Acquire {
                    identifier: "magnet:?xt=urn:btih:AAA".into(),
                    reason: "malformed".into(),
                }),
                502,
                "engine_acquire_failed",
            ),
            (
                Error::Engine(EngineError::Pause("busy".into())),
                502,
                "engine_pause_failed",
            ),
            (
                Error::Engine(EngineError::Resume("busy".into())),
                502,
                "engine_resume_failed",
            ),
            (
                Error::Engine(EngineError::Release("gone".into())),
                502,
                "engine_release_failed",
            ),
        ]
    }

    #[test]
    fn every_variant_maps_to_expected_status_and_code() {
        for (error, expected_status, expected_code) in all_error_variants() {
            assert_eq!(
                error.status_code(),
                expected_status,
                "error_code={expected_code} returned the wrong status"
            );
            assert_eq!(error.error_code(), expected_code);
        }
    }

    #[test]
    fn not_found_carries_job_id_in_details() {
        let id = JobId::new();
        let api_error: ApiError = Error::NotFound(id).into();

        assert_eq!(api_error.error.code, "not_found");
        assert!(api_error.error.message.contains(&id.to_string()));
        let details = api_error.error.details.unwrap();
        assert_eq!(details["job_id"], id.to_string());
    }

    #[test]
    fn acquire_failure_carries_source_identifier() {
        let api_error: ApiError = Error::Engine(EngineError::Acquire {
            identifier: "magnet:?xt=urn:btih:BBB".into(),
            reason: "bad hash".into(),
        })
        .into();

        assert!(api_error.error.message.contains("bad hash"));
        assert_eq!(
            api_error.error.details.unwrap()["source_identifier"],
            "magnet:?xt=urn:btih:BBB"
        );
    }

    #[test]
    fn errors_without_context_have_no_details() {
        let api_error: ApiError = Error::ShuttingDown.into();
        assert!(api_error.error.details.is_none());

        let json = serde_json::to_value(&api_error).unwrap();
        assert!(json["error"].get("details").is_none());
    }
}
