//! Application setup and initialization
//!
//! This module contains all application initialization logic extracted from main.rs
//! for better organization and testability.

pub mod database;
pub mod routes;
pub mod server;
pub mod services;
pub mod storage;

use crate::state::AppState;
use anyhow::{Context, Result};
use camgate_core::Config;
use camgate_db::{CameraDirectoryRepository, ImageIndexRepository};
use std::sync::Arc;

pub use services::{initialize_services, BackgroundTasks, Collaborators};

/// A fully wired gateway.
pub struct App {
    pub state: Arc<AppState>,
    pub router: axum::Router,
    pub background: BackgroundTasks,
}

/// Initialize the entire application
pub async fn initialize_app(config: Config) -> Result<App> {
    // Validate configuration first - fail fast on misconfiguration
    config.validate().context("Configuration validation failed")?;

    crate::telemetry::init_telemetry(config.is_production())
        .map_err(|e| anyhow::anyhow!("Failed to initialize telemetry: {}", e))?;

    tracing::info!(
        environment = config.environment(),
        "Configuration loaded and validated successfully"
    );

    // Setup database
    let pool = database::setup_database(&config).await?;

    // Setup storage
    let tiers = storage::setup_storage(&config).await?;
    let relay = storage::setup_relay(&config).await?;

    let collaborators = Collaborators {
        pool: Some(pool.clone()),
        directory: Arc::new(CameraDirectoryRepository::new(pool.clone())),
        index: Arc::new(ImageIndexRepository::new(pool)),
        tiers,
        relay,
    };
    let (state, background) = initialize_services(&config, collaborators);

    // Setup routes
    let router = routes::setup_routes(&config, state.clone());

    Ok(App {
        state,
        router,
        background,
    })
}
