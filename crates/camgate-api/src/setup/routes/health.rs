//! Health check handlers and response types.

use crate::state::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use camgate_core::models::SnapshotSource;
use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Run an async check with timeout. Returns "healthy", "timeout" or "{prefix}: {error}".
async fn run_check<F, E>(timeout: Duration, f: F, error_prefix: &str) -> String
where
    F: Future<Output = Result<(), E>>,
    E: Display,
{
    match tokio::time::timeout(timeout, f).await {
        Ok(Ok(())) => "healthy".to_string(),
        Ok(Err(e)) => format!("{}: {}", error_prefix, e),
        Err(_) => "timeout".to_string(),
    }
}

#[derive(serde::Serialize)]
pub(super) struct ReadinessResponse {
    pub status: String,
    pub index: String,
    pub credentials: String,
    pub credential_source: SnapshotSource,
    pub camera_count: usize,
}

/// Liveness check - process is running.
pub async fn liveness_check() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(serde_json::json!({ "status": "alive" })),
    )
}

/// Readiness check - index store reachable and at least one camera can authenticate.
pub async fn readiness_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    const TIMEOUT: Duration = Duration::from_secs(5);

    let index = state.archive.index.clone();
    let index_status = run_check(TIMEOUT, async move { index.ping().await }, "unhealthy").await;
    if index_status != "healthy" {
        tracing::error!(index = %index_status, "Index store readiness check failed");
    }

    let cache = state.auth.cache.stats();
    let credentials = if cache.loaded {
        "loaded"
    } else if cache.camera_count > 0 {
        "fallback"
    } else {
        "empty"
    };

    let ready = index_status == "healthy" && credentials != "empty";
    let response = ReadinessResponse {
        status: if ready { "ready" } else { "not_ready" }.to_string(),
        index: index_status,
        credentials: credentials.to_string(),
        credential_source: cache.source,
        camera_count: cache.camera_count,
    };

    let status_code = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(response))
}
