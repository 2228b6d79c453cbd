#[cfg(feature = "storage-local")]
use crate::LocalStorage;
#[cfg(feature = "storage-s3")]
use crate::S3Storage;
use crate::{Storage, StorageBackend, StorageError, StorageResult};
use camgate_core::config::StorageConfig;
use camgate_core::models::StorageTier;
use std::path::Path;
use std::sync::Arc;

/// Subdirectory of `LOCAL_STORAGE_PATH` holding the object tier when no bucket is set.
pub const LOCAL_OBJECT_TIER_DIR: &str = "objects";

/// The two archive tiers.
#[derive(Clone)]
pub struct StorageTiers {
    pub local: Arc<dyn Storage>,
    pub object: Arc<dyn Storage>,
}

impl StorageTiers {
    pub fn new(local: Arc<dyn Storage>, object: Arc<dyn Storage>) -> Self {
        Self { local, object }
    }

    pub fn tier(&self, tier: StorageTier) -> &Arc<dyn Storage> {
        match tier {
            StorageTier::Local => &self.local,
            StorageTier::Object => &self.object,
        }
    }
}

/// Create both storage tiers from configuration
pub async fn create_storage_tiers(config: &StorageConfig) -> StorageResult<StorageTiers> {
    let local = create_local(Path::new(&config.local_storage_path)).await?;

    let object = match config.object_backend() {
        #[cfg(feature = "storage-s3")]
        StorageBackend::S3 => {
            let bucket = config
                .s3_bucket
                .clone()
                .ok_or_else(|| StorageError::ConfigError("S3_BUCKET not configured".to_string()))?;
            let storage = S3Storage::new(
                bucket.clone(),
                config.s3_region.clone(),
                config.s3_endpoint.clone(),
            )?;
            tracing::info!(bucket = %bucket, region = %config.s3_region, "Object tier on S3");
            Arc::new(storage) as Arc<dyn Storage>
        }

        #[cfg(not(feature = "storage-s3"))]
        StorageBackend::S3 => {
            return Err(StorageError::ConfigError(
                "S3 storage backend not available (storage-s3 feature not enabled)".to_string(),
            ))
        }

        StorageBackend::Local => {
            let path = Path::new(&config.local_storage_path).join(LOCAL_OBJECT_TIER_DIR);
            tracing::info!(path = %path.display(), "Object tier on local filesystem");
            create_local(&path).await?
        }
    };

    Ok(StorageTiers { local, object })
}

/// Filesystem storage rooted at `path`, used for directories outside the archive tiers.
pub async fn create_directory_storage(path: &str) -> StorageResult<Arc<dyn Storage>> {
    create_local(Path::new(path)).await
}

#[cfg(feature = "storage-local")]
async fn create_local(path: &Path) -> StorageResult<Arc<dyn Storage>> {
    Ok(Arc::new(LocalStorage::new(path).await?))
}

#[cfg(not(feature = "storage-local"))]
async fn create_local(_path: &Path) -> StorageResult<Arc<dyn Storage>> {
    Err(StorageError::ConfigError(
        "Local storage backend not available (storage-local feature not enabled)".to_string(),
    ))
}
