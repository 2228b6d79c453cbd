//! Shared plumbing for the operator binaries.

use anyhow::{Context, Result};
use camgate_core::models::CameraRecord;
use camgate_core::Config;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::time::Duration;

/// Output format accepted by the `--format` flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
}

/// Initialize tracing for CLI binaries. Logs go to stderr so stdout stays parseable.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}

/// Connect to the gateway database without running migrations.
pub async fn connect(config: &Config) -> Result<PgPool> {
    PgPoolOptions::new()
        .max_connections(2)
        .acquire_timeout(Duration::from_secs(config.db_timeout_seconds()))
        .connect(config.database_url())
        .await
        .context("Failed to connect to database")
}

/// Truncate a string to max_len characters, appending "..." if truncated.
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Render cameras as a fixed-width table, sorted by id.
pub fn camera_table(cameras: &[&CameraRecord]) -> String {
    let mut rows: Vec<&CameraRecord> = cameras.to_vec();
    rows.sort_by(|a, b| a.id.cmp(&b.id));

    let mut out = format!("{:<16} {:<16} {:<24} {}\n", "CAMERA", "REGION", "NETWORK", "FTP TARGET");
    for camera in rows {
        let network = camera
            .expected_network
            .as_ref()
            .map(|n| n.to_string())
            .unwrap_or_else(|| "-".to_string());
        let target = match (&camera.ftp_target_folder, &camera.ftp_target_filename) {
            (Some(folder), Some(file)) => format!("{}/{}", folder, file),
            (Some(folder), None) => folder.clone(),
            (None, Some(file)) => file.clone(),
            (None, None) => "-".to_string(),
        };
        out.push_str(&format!(
            "{:<16} {:<16} {:<24} {}\n",
            truncate_string(&camera.id, 16),
            truncate_string(&camera.region, 16),
            truncate_string(&network, 24),
            target
        ));
    }
    out
}
