//! Error types module
//!
//! `AppError` unifies the failures a request handler or background task can surface.
//! Request-scoped rejections (auth, size, media type, publish) map to an HTTP status via
//! [`ErrorMetadata`]; directory and storage failures are normally absorbed by the
//! background loops and only reach this type from operator tooling.
//!
//! The `Database` variant and `From<sqlx::Error>` are gated behind the `sqlx` feature.

use crate::models::AuthRejection;
use std::io;

#[cfg(feature = "sqlx")]
use sqlx::Error as SqlxError;

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Expected rejections such as bad filenames or wrong credentials
    Debug,
    /// Recoverable issues worth an operator's attention
    Warn,
    /// Unexpected failures
    Error,
}

/// Metadata for error responses - defines how an error should be presented
pub trait ErrorMetadata {
    /// HTTP status code to return
    fn http_status_code(&self) -> u16;

    /// Machine-readable error code (e.g., "IP_MISMATCH")
    fn error_code(&self) -> &'static str;

    /// Whether this error is recoverable (can be retried)
    fn is_recoverable(&self) -> bool;

    /// Suggested action for the client
    fn suggested_action(&self) -> Option<&'static str>;

    /// Client-facing message (may differ from internal error message)
    fn client_message(&self) -> String;

    /// Whether details should be hidden in production
    fn is_sensitive(&self) -> bool;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;
}

/// Credential directory fetch failures. Absorbed by the credential cache.
#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    #[error("credential directory unreachable: {0}")]
    Unreachable(String),

    #[error("credential directory returned no cameras")]
    EmptyResult,
}

/// Fan-out publish failures. Surfaced to the uploader as a failed ingestion.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PublishError {
    #[error("fan-out exchange unreachable: {0}")]
    Unreachable(String),

    #[error("fan-out exchange rejected the message: {0}")]
    Rejected(String),
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[cfg(feature = "sqlx")]
    #[error("Database error: {0}")]
    Database(#[source] SqlxError),

    #[cfg(not(feature = "sqlx"))]
    #[error("Database error: {0}")]
    Database(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("File too large: {0}")]
    PayloadTooLarge(String),

    #[error("Unsupported media type: {0}")]
    UnsupportedMediaType(String),

    #[error("Upload rejected: {0}")]
    Rejected(#[from] AuthRejection),

    #[error("Publish failed: {0}")]
    Publish(#[from] PublishError),

    #[error("Directory error: {0}")]
    Directory(#[from] DirectoryError),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Internal error with source")]
    InternalWithSource {
        message: String,
        #[source]
        source: anyhow::Error,
    },
}

#[cfg(feature = "sqlx")]
impl From<SqlxError> for AppError {
    fn from(err: SqlxError) -> Self {
        AppError::Database(err)
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::InternalWithSource {
            message: err.to_string(),
            source: err,
        }
    }
}

impl From<io::Error> for AppError {
    fn from(err: io::Error) -> Self {
        AppError::Internal(format!("IO error: {}", err))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::InvalidInput(format!("JSON parsing error: {}", err))
    }
}

type StaticMetadata = (
    u16,
    &'static str,
    bool,
    Option<&'static str>,
    bool,
    LogLevel,
);

/// Static metadata per rejection reason:
/// (http_status, error_code, recoverable, suggested_action, sensitive, log_level).
fn rejection_static_metadata(reason: &AuthRejection) -> StaticMetadata {
    let (status, action, level) = match reason {
        AuthRejection::MalformedFilename => (
            400,
            "Send Content-Disposition with filename=\"<camera_id>.jpg\"",
            LogLevel::Debug,
        ),
        AuthRejection::InsecureScriptedUpload => {
            (400, "Upload over https from scripted hosts", LogLevel::Warn)
        }
        AuthRejection::UnknownCamera => (
            401,
            "Verify the camera is registered in the directory",
            LogLevel::Warn,
        ),
        AuthRejection::IpMismatch => (
            401,
            "Verify the camera's expected network",
            LogLevel::Warn,
        ),
        AuthRejection::CredentialMismatch => {
            (401, "Check the camera's username and password", LogLevel::Debug)
        }
        AuthRejection::NoCredentialsConfigured { .. } => (
            401,
            "Configure credentials for the camera's region",
            LogLevel::Error,
        ),
    };
    (status, reason.code(), false, Some(action), false, level)
}

/// Static metadata for each variant:
/// (http_status, error_code, recoverable, suggested_action, sensitive, log_level).
fn app_error_static_metadata(err: &AppError) -> StaticMetadata {
    match err {
        AppError::Database(_) => (
            500,
            "DATABASE_ERROR",
            true,
            Some("Retry after a short delay"),
            true,
            LogLevel::Error,
        ),
        AppError::Storage(_) => (
            500,
            "STORAGE_ERROR",
            true,
            Some("Retry after a short delay"),
            true,
            LogLevel::Error,
        ),
        AppError::InvalidInput(_) => (
            400,
            "INVALID_INPUT",
            false,
            Some("Check request parameters and try again"),
            false,
            LogLevel::Debug,
        ),
        AppError::BadRequest(_) => (
            400,
            "BAD_REQUEST",
            false,
            Some("Check request format and parameters"),
            false,
            LogLevel::Debug,
        ),
        AppError::NotFound(_) => (
            404,
            "NOT_FOUND",
            false,
            Some("Verify the camera id and time window"),
            false,
            LogLevel::Debug,
        ),
        AppError::PayloadTooLarge(_) => (
            413,
            "PAYLOAD_TOO_LARGE",
            false,
            Some("Reduce image size"),
            false,
            LogLevel::Debug,
        ),
        AppError::UnsupportedMediaType(_) => (
            415,
            "UNSUPPORTED_MEDIA_TYPE",
            false,
            Some("Upload JPEG images only"),
            false,
            LogLevel::Debug,
        ),
        AppError::Rejected(reason) => rejection_static_metadata(reason),
        AppError::Publish(_) => (
            500,
            "PUBLISH_FAILED",
            true,
            Some("Retry the upload"),
            true,
            LogLevel::Error,
        ),
        AppError::Directory(_) => (
            503,
            "DIRECTORY_UNAVAILABLE",
            true,
            Some("Retry after a short delay"),
            true,
            LogLevel::Warn,
        ),
        AppError::Internal(_) | AppError::InternalWithSource { .. } => (
            500,
            "INTERNAL_ERROR",
            true,
            Some("Retry after a short delay"),
            true,
            LogLevel::Error,
        ),
    }
}

impl AppError {
    /// Get the error type name for detailed error responses
    pub fn error_type(&self) -> &str {
        match self {
            AppError::Database(_) => "Database",
            AppError::Storage(_) => "Storage",
            AppError::InvalidInput(_) => "InvalidInput",
            AppError::BadRequest(_) => "BadRequest",
            AppError::NotFound(_) => "NotFound",
            AppError::PayloadTooLarge(_) => "PayloadTooLarge",
            AppError::UnsupportedMediaType(_) => "UnsupportedMediaType",
            AppError::Rejected(_) => "AuthRejection",
            AppError::Publish(_) => "Publish",
            AppError::Directory(_) => "Directory",
            AppError::Internal(_) | AppError::InternalWithSource { .. } => "Internal",
        }
    }

    /// Get detailed error information including error chain
    pub fn detailed_message(&self) -> String {
        use std::error::Error;

        let mut details = self.to_string();
        let mut source = self.source();
        let mut depth = 0;
        while let Some(err) = source {
            depth += 1;
            if depth > 5 {
                details.push_str("\n  ... (truncated)");
                break;
            }
            details.push_str(&format!("\n  caused by: {}", err));
            source = err.source();
        }
        details
    }
}

impl ErrorMetadata for AppError {
    fn http_status_code(&self) -> u16 {
        app_error_static_metadata(self).0
    }

    fn error_code(&self) -> &'static str {
        app_error_static_metadata(self).1
    }

    fn is_recoverable(&self) -> bool {
        app_error_static_metadata(self).2
    }

    fn suggested_action(&self) -> Option<&'static str> {
        app_error_static_metadata(self).3
    }

    fn client_message(&self) -> String {
        match self {
            AppError::Database(_) => "Failed to access database".to_string(),
            AppError::Storage(_) => "Failed to access storage".to_string(),
            AppError::InvalidInput(msg)
            | AppError::BadRequest(msg)
            | AppError::NotFound(msg)
            | AppError::PayloadTooLarge(msg)
            | AppError::UnsupportedMediaType(msg) => msg.clone(),
            AppError::Rejected(reason) => reason.to_string(),
            AppError::Publish(_) => "Failed to publish image".to_string(),
            AppError::Directory(_) => "Camera directory unavailable".to_string(),
            AppError::Internal(_) | AppError::InternalWithSource { .. } => {
                "An internal error occurred".to_string()
            }
        }
    }

    fn is_sensitive(&self) -> bool {
        app_error_static_metadata(self).4
    }

    fn log_level(&self) -> LogLevel {
        app_error_static_metadata(self).5
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_metadata_database() {
        #[cfg(feature = "sqlx")]
        let err = AppError::from(sqlx::Error::PoolClosed);
        #[cfg(not(feature = "sqlx"))]
        let err = AppError::Database("pool closed".to_string());
        assert_eq!(err.http_status_code(), 500);
        assert_eq!(err.error_code(), "DATABASE_ERROR");
        assert!(err.is_recoverable());
        assert_eq!(err.client_message(), "Failed to access database");
        assert!(err.is_sensitive());
        assert_eq!(err.log_level(), LogLevel::Error);
    }

    #[test]
    fn test_rejection_statuses() {
        let cases = [
            (AuthRejection::MalformedFilename, 400),
            (AuthRejection::InsecureScriptedUpload, 400),
            (AuthRejection::UnknownCamera, 401),
            (AuthRejection::IpMismatch, 401),
            (AuthRejection::CredentialMismatch, 401),
            (
                AuthRejection::NoCredentialsConfigured {
                    region: "north".to_string(),
                },
                401,
            ),
        ];
        for (reason, status) in cases {
            let code = reason.code();
            let err = AppError::from(reason);
            assert_eq!(err.http_status_code(), status);
            assert_eq!(err.error_code(), code);
            assert!(!err.is_recoverable());
        }
    }

    #[test]
    fn test_no_credentials_message_names_region() {
        let err = AppError::from(AuthRejection::NoCredentialsConfigured {
            region: "north".to_string(),
        });
        assert_eq!(
            err.client_message(),
            "no credentials configured for region north"
        );
        assert_eq!(err.log_level(), LogLevel::Error);
    }

    #[test]
    fn test_publish_error_is_server_error() {
        let err = AppError::from(PublishError::Unreachable("closed".to_string()));
        assert_eq!(err.http_status_code(), 500);
        assert_eq!(err.error_code(), "PUBLISH_FAILED");
        assert!(err.is_recoverable());
        assert!(err.is_sensitive());
    }

    #[test]
    fn test_detailed_message_includes_source_chain() {
        let err = AppError::from(anyhow::anyhow!("root cause").context("outer"));
        assert!(err.detailed_message().contains("Internal error with source"));
    }
}
