//! Route configuration and setup.
//!
//! Upload and read routes live under [`API_PREFIX`]; health checks in [health](health).

mod health;

use crate::handlers;
use crate::state::AppState;
use axum::{extract::DefaultBodyLimit, routing::get, Router};
use camgate_core::constants::API_PREFIX;
use camgate_core::Config;
use std::sync::Arc;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

/// Setup all application routes
pub fn setup_routes(config: &Config, state: Arc<AppState>) -> Router<()> {
    let api_routes = Router::new()
        .route("/healthz", get(health::liveness_check))
        .route("/readyz", get(health::readiness_check))
        .route("/metrics", get(handlers::metrics::metrics))
        .route(
            "/images",
            get(handlers::ingest::upload_endpoint_check).post(handlers::ingest::ingest_image),
        )
        .route("/images/{camera_id}/latest", get(handlers::images::latest))
        .route("/replay/{camera_id}", get(handlers::images::replay))
        .route("/timelapse/{camera_id}", get(handlers::images::timelapse));

    tracing::info!(
        max_upload_size_bytes = config.max_upload_size_bytes(),
        "Request body limit enabled"
    );

    Router::new()
        .nest(API_PREFIX, api_routes)
        .layer(RequestBodyLimitLayer::new(config.max_upload_size_bytes()))
        .layer(DefaultBodyLimit::disable())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
