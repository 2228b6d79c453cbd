use std::sync::Arc;

use axum::{extract::State, Json};
use camgate_services::{ArchiveStats, CacheStats, RelayStats, RetentionStats};
use serde::Serialize;

use crate::auth::AuthMetricsSnapshot;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct MetricsResponse {
    pub auth: AuthMetricsSnapshot,
    pub credential_cache: CacheStats,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub archiver: Option<ArchiveStats>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ftp_relay: Option<RelayStats>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retention: Option<RetentionStats>,
}

/// Counter dump for operators.
pub async fn metrics(State(state): State<Arc<AppState>>) -> Json<MetricsResponse> {
    Json(MetricsResponse {
        auth: state.auth.engine.metrics().snapshot(),
        credential_cache: state.auth.cache.stats(),
        archiver: state.archive.archiver.as_ref().map(|a| a.stats()),
        ftp_relay: state.archive.relay.as_ref().map(|r| r.stats()),
        retention: state.archive.retention.as_ref().map(|r| r.stats()),
    })
}
