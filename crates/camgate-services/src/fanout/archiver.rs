//! Archiver consumer: writes each fanned-out image to both tiers and indexes it.

use bytes::Bytes;
use camgate_core::constants::{LOCAL_ORIGINALS_PREFIX, WATERMARKED_PREFIX};
use camgate_core::models::{ImageIndexEntry, ImageMessage, NewImageIndexEntry};
use camgate_core::validation::is_valid_camera_id;
use camgate_core::AppError;
use camgate_db::ImageIndexStore;
use camgate_storage::{StorageError, StorageTiers};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

const JPEG_CONTENT_TYPE: &str = "image/jpeg";

#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    #[error("invalid message headers: {0}")]
    InvalidHeaders(String),

    #[error("watermarking failed: {0}")]
    Watermark(String),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Index(#[from] AppError),
}

/// Produces the watermarked rendition of an image.
pub trait Watermarker: Send + Sync {
    fn apply(&self, camera_id: &str, image: Bytes) -> Result<Bytes, ArchiveError>;
}

/// Identity transform.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassthroughWatermarker;

impl Watermarker for PassthroughWatermarker {
    fn apply(&self, _camera_id: &str, image: Bytes) -> Result<Bytes, ArchiveError> {
        Ok(image)
    }
}

/// Storage keys for one archived image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveKeys {
    pub original_local: String,
    pub watermarked_local: String,
    pub original_object: String,
    pub watermarked_object: String,
}

impl ArchiveKeys {
    pub fn new(camera_id: &str, at: DateTime<Utc>) -> Self {
        let millis = at.timestamp_millis();
        let hour_path = at.format("%Y/%m/%d/%H");
        Self {
            original_local: format!("{}/{}/{}.jpg", LOCAL_ORIGINALS_PREFIX, camera_id, millis),
            watermarked_local: format!("{}/{}/{}.jpg", WATERMARKED_PREFIX, camera_id, millis),
            original_object: format!("{}/{}/{}.jpg", camera_id, hour_path, millis),
            watermarked_object: format!(
                "{}/{}/{}/{}.jpg",
                WATERMARKED_PREFIX, camera_id, hour_path, millis
            ),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ArchiveStats {
    pub archived: u64,
    pub failed: u64,
}

pub struct ArchiveConsumer {
    tiers: StorageTiers,
    index: Arc<dyn ImageIndexStore>,
    watermarker: Arc<dyn Watermarker>,
    archived: AtomicU64,
    failed: AtomicU64,
}

impl ArchiveConsumer {
    pub fn new(
        tiers: StorageTiers,
        index: Arc<dyn ImageIndexStore>,
        watermarker: Arc<dyn Watermarker>,
    ) -> Self {
        Self {
            tiers,
            index,
            watermarker,
            archived: AtomicU64::new(0),
            failed: AtomicU64::new(0),
        }
    }

    pub fn stats(&self) -> ArchiveStats {
        ArchiveStats {
            archived: self.archived.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }

    /// Store both renditions in both tiers, then insert the index row.
    ///
    /// The row is only inserted once all four writes succeeded.
    #[tracing::instrument(
        skip(self, message),
        fields(camera_id = %message.headers.camera_id, filename = %message.headers.filename)
    )]
    pub async fn archive(&self, message: &ImageMessage) -> Result<ImageIndexEntry, ArchiveError> {
        let headers = &message.headers;
        if !is_valid_camera_id(&headers.camera_id) {
            return Err(ArchiveError::InvalidHeaders(format!(
                "camera_id '{}' is not valid",
                headers.camera_id
            )));
        }
        let ingested_at = headers.ingested_at().ok_or_else(|| {
            ArchiveError::InvalidHeaders(format!("timestamp '{}' is not valid", headers.timestamp))
        })?;

        let keys = ArchiveKeys::new(&headers.camera_id, ingested_at);
        let original = message.body.clone();

        self.tiers
            .local
            .upload_with_key(&keys.original_local, original.clone(), JPEG_CONTENT_TYPE)
            .await?;
        self.tiers
            .object
            .upload_with_key(&keys.original_object, original.clone(), JPEG_CONTENT_TYPE)
            .await?;

        let watermarked = self.watermarker.apply(&headers.camera_id, original)?;

        self.tiers
            .local
            .upload_with_key(&keys.watermarked_local, watermarked.clone(), JPEG_CONTENT_TYPE)
            .await?;
        self.tiers
            .object
            .upload_with_key(&keys.watermarked_object, watermarked, JPEG_CONTENT_TYPE)
            .await?;

        let entry = self
            .index
            .insert(NewImageIndexEntry {
                camera_id: headers.camera_id.clone(),
                original_local_path: Some(keys.original_local),
                watermarked_local_path: Some(keys.watermarked_local),
                original_object_key: Some(keys.original_object),
                watermarked_object_key: Some(keys.watermarked_object),
                ingested_at,
            })
            .await?;

        tracing::debug!(entry_id = entry.id, "Image archived");
        Ok(entry)
    }

    /// Consume `receiver` until it closes or `cancel` fires. A message already being
    /// archived is finished before the loop exits.
    pub fn start(
        self: Arc<Self>,
        mut receiver: mpsc::Receiver<ImageMessage>,
        cancel: CancellationToken,
    ) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                let message = tokio::select! {
                    _ = cancel.cancelled() => break,
                    message = receiver.recv() => match message {
                        Some(message) => message,
                        None => break,
                    },
                };

                match self.archive(&message).await {
                    Ok(_) => {
                        self.archived.fetch_add(1, Ordering::Relaxed);
                    }
                    Err(e) => {
                        self.failed.fetch_add(1, Ordering::Relaxed);
                        tracing::error!(
                            error = %e,
                            camera_id = %message.headers.camera_id,
                            filename = %message.headers.filename,
                            "Failed to archive image"
                        );
                    }
                }
            }
            tracing::info!("Archive consumer stopped");
        })
    }
}
