//! FTP relay consumer: forwards each fanned-out image to the camera's FTP target.
//!
//! The remote path is `{target_dir}/{folder}/{filename}`. A camera record may override the
//! folder (`ftp_target_folder`) and the filename (`ftp_target_filename`); otherwise the
//! camera id and the message filename are used.

use crate::cache::CredentialCache;
use bytes::Bytes;
use camgate_core::models::{CameraRecord, ImageMessage};
use camgate_storage::{Storage, StorageError};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("invalid remote path: {0}")]
    InvalidPath(String),

    #[error("transfer failed: {0}")]
    Transfer(String),
}

impl From<StorageError> for RelayError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::InvalidKey(key) => RelayError::InvalidPath(key),
            other => RelayError::Transfer(other.to_string()),
        }
    }
}

/// Destination of relayed images.
#[async_trait::async_trait]
pub trait FtpClient: Send + Sync {
    /// Write `data` at `remote_path`, creating parent directories and replacing old bytes.
    async fn put(&self, remote_path: &str, data: Bytes) -> Result<(), RelayError>;
}

/// Relay target backed by a storage directory that the FTP server publishes.
pub struct StorageFtpClient {
    storage: Arc<dyn Storage>,
}

impl StorageFtpClient {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }
}

#[async_trait::async_trait]
impl FtpClient for StorageFtpClient {
    async fn put(&self, remote_path: &str, data: Bytes) -> Result<(), RelayError> {
        self.storage
            .upload_with_key(remote_path, data, "image/jpeg")
            .await?;
        Ok(())
    }
}

fn non_empty(value: Option<&String>) -> Option<&str> {
    value.map(|v| v.trim().trim_matches('/')).filter(|v| !v.is_empty())
}

/// Resolve where an image of `camera_id` lands on the FTP server.
pub fn remote_path(
    target_dir: &str,
    camera_id: &str,
    camera: Option<&CameraRecord>,
    filename: &str,
) -> Result<String, RelayError> {
    let folder = camera
        .and_then(|c| non_empty(c.ftp_target_folder.as_ref()))
        .unwrap_or(camera_id);
    let name = camera
        .and_then(|c| non_empty(c.ftp_target_filename.as_ref()))
        .unwrap_or(filename);

    let parts: Vec<&str> = [target_dir.trim().trim_matches('/'), folder, name]
        .into_iter()
        .filter(|p| !p.is_empty())
        .collect();
    let path = parts.join("/");

    let unsafe_segment = path
        .split('/')
        .any(|segment| segment.is_empty() || segment == "." || segment == "..");
    if unsafe_segment || path.contains('\\') {
        return Err(RelayError::InvalidPath(path));
    }
    Ok(path)
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RelayStats {
    pub relayed: u64,
    pub failed: u64,
}

pub struct FtpRelayConsumer {
    cache: Arc<CredentialCache>,
    client: Arc<dyn FtpClient>,
    target_dir: String,
    relayed: AtomicU64,
    failed: AtomicU64,
}

impl FtpRelayConsumer {
    pub fn new(
        cache: Arc<CredentialCache>,
        client: Arc<dyn FtpClient>,
        target_dir: impl Into<String>,
    ) -> Self {
        Self {
            cache,
            client,
            target_dir: target_dir.into(),
            relayed: AtomicU64::new(0),
            failed: AtomicU64::new(0),
        }
    }

    pub fn stats(&self) -> RelayStats {
        RelayStats {
            relayed: self.relayed.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }

    /// Forward one image. Returns the remote path it was written to.
    #[tracing::instrument(
        skip(self, message),
        fields(camera_id = %message.headers.camera_id, filename = %message.headers.filename)
    )]
    pub async fn relay(&self, message: &ImageMessage) -> Result<String, RelayError> {
        let headers = &message.headers;
        let snapshot = self.cache.current();
        let path = remote_path(
            &self.target_dir,
            &headers.camera_id,
            snapshot.camera(&headers.camera_id),
            &headers.filename,
        )?;

        self.client.put(&path, message.body.clone()).await?;
        tracing::debug!(remote_path = %path, "Image relayed to FTP");
        Ok(path)
    }

    /// Consume `receiver` until it closes or `cancel` fires.
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

                match self.relay(&message).await {
                    Ok(_) => {
                        self.relayed.fetch_add(1, Ordering::Relaxed);
                    }
                    Err(e) => {
                        self.failed.fetch_add(1, Ordering::Relaxed);
                        tracing::error!(
                            error = %e,
                            camera_id = %message.headers.camera_id,
                            filename = %message.headers.filename,
                            "Push to FTP failed"
                        );
                    }
                }
            }
            tracing::info!("FTP relay consumer stopped");
        })
    }
}
