//! HTTP error response conversion
//!
//! This module provides HTTP-specific error response conversion for AppError.
//!
//! **Preferred handler pattern:** Return `Result<impl IntoResponse, HttpAppError>`. Use
//! `AppError` (or types that implement `Into<AppError>`) for errors so they become
//! `HttpAppError` and render consistently (status, body, logging).

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use camgate_core::models::AuthRejection;
use camgate_core::{AppError, ErrorMetadata, LogLevel, PublishError, RejectionPolicy};
use camgate_storage::StorageError;
use serde::Serialize;

/// Body returned to cameras when rejections are disguised.
pub const DISGUISED_REJECTION_BODY: &str = "OK";

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_type: Option<String>,
    /// Machine-readable error code for programmatic handling
    pub code: String,
    /// Whether this error is recoverable (can be retried)
    pub recoverable: bool,
    /// Suggested action for the client
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_action: Option<String>,
}

/// Wrapper type for AppError to implement IntoResponse
/// This is necessary because of Rust's orphan rules - we can't implement
/// IntoResponse (external trait) for AppError (external type from camgate-core)
#[derive(Debug)]
pub struct HttpAppError(pub AppError);

impl From<AppError> for HttpAppError {
    fn from(err: AppError) -> Self {
        HttpAppError(err)
    }
}

impl From<anyhow::Error> for HttpAppError {
    fn from(err: anyhow::Error) -> Self {
        HttpAppError(AppError::InternalWithSource {
            message: err.to_string(),
            source: err,
        })
    }
}

impl From<AuthRejection> for HttpAppError {
    fn from(reason: AuthRejection) -> Self {
        HttpAppError(AppError::Rejected(reason))
    }
}

impl From<PublishError> for HttpAppError {
    fn from(err: PublishError) -> Self {
        HttpAppError(AppError::Publish(err))
    }
}

impl From<StorageError> for HttpAppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(key) => HttpAppError(AppError::NotFound(key)),
            other => HttpAppError(AppError::Storage(other.to_string())),
        }
    }
}

fn log_error(error: &AppError) {
    let error_type = error.error_type();
    match error.log_level() {
        LogLevel::Debug => {
            tracing::debug!(error = %error, error_type = error_type, "Error occurred");
        }
        LogLevel::Warn => {
            tracing::warn!(error = %error, error_type = error_type, "Error occurred");
        }
        LogLevel::Error => {
            tracing::error!(error = %error, error_type = error_type, "Error occurred");
        }
    }
}

fn is_production_env() -> bool {
    std::env::var("ENVIRONMENT")
        .or_else(|_| std::env::var("APP_ENV"))
        .map(|env| env.to_lowercase() == "production" || env.to_lowercase() == "prod")
        .unwrap_or(false)
}

/// Machine code reported for every auth rejection in production.
pub const PUBLIC_REJECTION_CODE: &str = "UPLOAD_REJECTED";

/// Message shown to the client. Rejections collapse to their public wording in production.
fn client_message(error: &AppError, is_production: bool) -> String {
    match error {
        AppError::Rejected(reason) if is_production => reason.public_message().to_string(),
        other => other.client_message(),
    }
}

/// Build the JSON body for `error`.
///
/// In production an auth rejection renders the same body whichever check failed: one code,
/// the public message and no suggested action. Logs and counters keep the real reason.
fn error_body(app_error: &AppError, is_production: bool) -> ErrorResponse {
    if is_production {
        if let AppError::Rejected(_) = app_error {
            return ErrorResponse {
                error: client_message(app_error, true),
                details: None,
                error_type: None,
                code: PUBLIC_REJECTION_CODE.to_string(),
                recoverable: app_error.is_recoverable(),
                suggested_action: None,
            };
        }
    }

    // Always hide details in production; elsewhere only for sensitive errors.
    let hide_details = is_production || app_error.is_sensitive();
    ErrorResponse {
        error: client_message(app_error, is_production),
        details: (!hide_details).then(|| app_error.detailed_message()),
        error_type: (!hide_details).then(|| app_error.error_type().to_string()),
        code: app_error.error_code().to_string(),
        recoverable: app_error.is_recoverable(),
        suggested_action: app_error.suggested_action().map(String::from),
    }
}

impl IntoResponse for HttpAppError {
    fn into_response(self) -> Response {
        let app_error = &self.0;

        let status = StatusCode::from_u16(app_error.http_status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        log_error(app_error);

        (status, Json(error_body(app_error, is_production_env()))).into_response()
    }
}

/// Render an auth rejection according to the configured policy.
pub fn rejection_response(reason: AuthRejection, policy: RejectionPolicy) -> Response {
    match policy {
        RejectionPolicy::Status => HttpAppError::from(reason).into_response(),
        RejectionPolicy::Disguised => {
            tracing::debug!(reason = reason.code(), "Rejection disguised as success");
            (StatusCode::OK, DISGUISED_REJECTION_BODY).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_policy_keeps_rejection_status() {
        let response = rejection_response(AuthRejection::IpMismatch, RejectionPolicy::Status);
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response =
            rejection_response(AuthRejection::MalformedFilename, RejectionPolicy::Status);
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_disguised_policy_answers_ok() {
        let response =
            rejection_response(AuthRejection::CredentialMismatch, RejectionPolicy::Disguised);
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[test]
    fn test_production_hides_which_check_failed() {
        let ip = AppError::Rejected(AuthRejection::IpMismatch);
        let creds = AppError::Rejected(AuthRejection::CredentialMismatch);

        let ip_body = serde_json::to_value(error_body(&ip, true)).unwrap();
        let creds_body = serde_json::to_value(error_body(&creds, true)).unwrap();
        assert_eq!(ip_body, creds_body);
        assert_eq!(ip_body["code"], PUBLIC_REJECTION_CODE);
        assert!(ip_body.get("suggested_action").is_none());
        assert!(ip_body.get("details").is_none());
    }

    #[test]
    fn test_development_names_the_failed_check() {
        let ip = AppError::Rejected(AuthRejection::IpMismatch);
        let creds = AppError::Rejected(AuthRejection::CredentialMismatch);

        let ip_body = serde_json::to_value(error_body(&ip, false)).unwrap();
        let creds_body = serde_json::to_value(error_body(&creds, false)).unwrap();
        assert_eq!(ip_body["code"], "IP_MISMATCH");
        assert_eq!(creds_body["code"], "CREDENTIAL_MISMATCH");
        assert_ne!(ip_body["error"], creds_body["error"]);
    }

    #[test]
    fn test_production_keeps_codes_for_other_errors() {
        let body = error_body(&AppError::PayloadTooLarge("too big".to_string()), true);
        assert_eq!(body.code, "PAYLOAD_TOO_LARGE");
        assert!(body.details.is_none());
    }

    #[test]
    fn test_storage_not_found_maps_to_404() {
        let err = HttpAppError::from(StorageError::NotFound("a.jpg".to_string()));
        assert_eq!(err.0.http_status_code(), 404);
    }
}
