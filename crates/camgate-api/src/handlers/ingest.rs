use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use camgate_core::models::{AuthDecision, ImageMessage};
use camgate_core::validation::is_jpeg;
use camgate_core::AppError;
use chrono::Utc;

use crate::error::{rejection_response, HttpAppError};
use crate::state::AppState;
use crate::utils::upload::UploadMeta;

/// Receive one camera image.
///
/// A request whose declared Content-Length exceeds the upload limit is answered 413 by the
/// router's body limit layer before it reaches this handler, whoever sent it. Otherwise the
/// upload is authorized before the body is inspected, so an unauthorized camera learns
/// nothing about the format checks. Accepted images are published to the fan-out exchange;
/// a publish failure fails the request.
#[tracing::instrument(skip_all, fields(camera_id))]
pub async fn ingest_image(
    State(state): State<Arc<AppState>>,
    UploadMeta(meta): UploadMeta,
    body: Result<Bytes, BytesRejection>,
) -> Result<Response, HttpAppError> {
    let snapshot = state.auth.cache.current();
    let accepted = match state.auth.engine.authorize(&snapshot, &meta) {
        AuthDecision::Accepted(accepted) => accepted,
        AuthDecision::Rejected(reason) => {
            return Ok(rejection_response(reason, state.ingest.rejection_policy));
        }
    };
    tracing::Span::current().record("camera_id", accepted.camera.id.as_str());

    let max_size = state.ingest.max_upload_size_bytes;
    let body = body.map_err(|rejection| {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            AppError::PayloadTooLarge(format!("Image exceeds {} bytes", max_size))
        } else {
            AppError::BadRequest(rejection.body_text())
        }
    })?;

    if body.is_empty() {
        return Err(AppError::BadRequest("No image data received".to_string()).into());
    }
    if body.len() > max_size {
        return Err(AppError::PayloadTooLarge(format!("Image exceeds {} bytes", max_size)).into());
    }
    if !is_jpeg(&body) {
        return Err(AppError::UnsupportedMediaType(
            "The camera image is not in JPG/JPEG format".to_string(),
        )
        .into());
    }

    let size_bytes = body.len();
    let message = ImageMessage::new(&accepted.camera.id, Utc::now(), body);
    let filename = message.headers.filename.clone();

    let metrics = state.auth.engine.metrics();
    if let Err(e) = state.ingest.publisher.publish(message).await {
        metrics.record_publish(false);
        return Err(e.into());
    }
    metrics.record_publish(true);

    tracing::info!(
        camera_id = %accepted.camera.id,
        filename = %filename,
        is_scripted = accepted.is_scripted,
        size_bytes,
        "Image ingested"
    );

    Ok((StatusCode::OK, format!("Image received: {}", filename)).into_response())
}

/// Reachability check used by camera firmware before uploading.
pub async fn upload_endpoint_check() -> &'static str {
    "ok"
}
