//! Replay and timelapse reads over the image index.
//!
//! Only fully populated rows are served; a row with any tier already reclaimed is hidden.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};
use camgate_core::constants::{REPLAY_WINDOW_HOURS, TIMELAPSE_WINDOW_DAYS};
use camgate_core::models::ImageIndexEntry;
use camgate_core::validation::is_valid_camera_id;
use camgate_core::AppError;
use chrono::{Duration, Utc};

use crate::error::HttpAppError;
use crate::state::AppState;

fn validated(camera_id: &str) -> Result<&str, HttpAppError> {
    if is_valid_camera_id(camera_id) {
        Ok(camera_id)
    } else {
        Err(AppError::InvalidInput(format!("Invalid camera id '{}'", camera_id)).into())
    }
}

async fn window(
    state: &AppState,
    camera_id: &str,
    span: Duration,
) -> Result<Vec<ImageIndexEntry>, HttpAppError> {
    let camera_id = validated(camera_id)?;
    let since = Utc::now() - span;
    let entries = state.archive.index.list_window(camera_id, since).await?;
    tracing::debug!(camera_id, count = entries.len(), "Index window served");
    Ok(entries)
}

/// Images of the last 24 hours, oldest first.
pub async fn replay(
    State(state): State<Arc<AppState>>,
    Path(camera_id): Path<String>,
) -> Result<Json<Vec<ImageIndexEntry>>, HttpAppError> {
    window(&state, &camera_id, Duration::hours(REPLAY_WINDOW_HOURS))
        .await
        .map(Json)
}

/// Images of the last 30 days, oldest first.
pub async fn timelapse(
    State(state): State<Arc<AppState>>,
    Path(camera_id): Path<String>,
) -> Result<Json<Vec<ImageIndexEntry>>, HttpAppError> {
    window(&state, &camera_id, Duration::days(TIMELAPSE_WINDOW_DAYS))
        .await
        .map(Json)
}

pub async fn latest(
    State(state): State<Arc<AppState>>,
    Path(camera_id): Path<String>,
) -> Result<Json<ImageIndexEntry>, HttpAppError> {
    let camera_id = validated(&camera_id)?;
    let since = Utc::now() - Duration::hours(REPLAY_WINDOW_HOURS);

    state
        .archive
        .index
        .latest(camera_id, since)
        .await?
        .map(Json)
        .ok_or_else(|| {
            AppError::NotFound(format!(
                "No image found in the last {} hours for camera {}",
                REPLAY_WINDOW_HOURS, camera_id
            ))
            .into()
        })
}
