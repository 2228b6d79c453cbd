use anyhow::{Context, Result};
use camgate_core::Config;
use camgate_services::{FtpClient, StorageFtpClient};
use camgate_storage::{create_directory_storage, create_storage_tiers, StorageTiers};
use std::sync::Arc;

/// Open both archive tiers.
pub async fn setup_storage(config: &Config) -> Result<StorageTiers> {
    let storage = config.storage();
    let tiers = create_storage_tiers(storage)
        .await
        .context("Failed to initialize storage tiers")?;

    tracing::info!(
        local_path = %storage.local_storage_path,
        object_backend = %storage.object_backend(),
        "Storage tiers ready"
    );
    Ok(tiers)
}

/// Open the FTP relay target when the relay is enabled.
pub async fn setup_relay(config: &Config) -> Result<Option<Arc<dyn FtpClient>>> {
    let relay = &config.fanout().relay;
    if !relay.enabled {
        return Ok(None);
    }

    let storage = create_directory_storage(&relay.drop_path)
        .await
        .context("Failed to initialize FTP relay target")?;
    tracing::info!(drop_path = %relay.drop_path, "FTP relay target ready");
    Ok(Some(Arc::new(StorageFtpClient::new(storage))))
}
