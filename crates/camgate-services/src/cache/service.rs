use camgate_core::config::CredentialConfig;
use camgate_core::models::{CredentialSnapshot, SnapshotSource};
use camgate_core::DirectoryError;
use camgate_db::CameraDirectory;
use chrono::Utc;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Point-in-time view of the cache for readiness and metrics.
#[derive(Debug, Clone, Serialize)]
pub struct CacheStats {
    pub loaded: bool,
    pub camera_count: usize,
    pub source: SnapshotSource,
    pub refresh_success: u64,
    pub refresh_failure: u64,
}

/// Single-writer cell holding the published credential snapshot.
///
/// Until the directory loads successfully, readers get the deterministic fallback built
/// from static configuration. A failed or empty refresh leaves the published snapshot as is.
pub struct CredentialCache {
    directory: Arc<dyn CameraDirectory>,
    config: CredentialConfig,
    sender: watch::Sender<Arc<CredentialSnapshot>>,
    loaded: AtomicBool,
    refresh_success: AtomicU64,
    refresh_failure: AtomicU64,
}

impl CredentialCache {
    pub fn new(directory: Arc<dyn CameraDirectory>, config: CredentialConfig) -> Self {
        let fallback = Arc::new(config.fallback_snapshot());
        let (sender, _) = watch::channel(fallback);
        Self {
            directory,
            config,
            sender,
            loaded: AtomicBool::new(false),
            refresh_success: AtomicU64::new(0),
            refresh_failure: AtomicU64::new(0),
        }
    }

    /// Latest published snapshot.
    pub fn current(&self) -> Arc<CredentialSnapshot> {
        self.sender.borrow().clone()
    }

    /// Receiver notified on every successful refresh.
    pub fn subscribe(&self) -> watch::Receiver<Arc<CredentialSnapshot>> {
        self.sender.subscribe()
    }

    pub fn has_loaded(&self) -> bool {
        self.loaded.load(Ordering::Acquire)
    }

    pub fn stats(&self) -> CacheStats {
        let snapshot = self.current();
        CacheStats {
            loaded: self.has_loaded(),
            camera_count: snapshot.camera_count(),
            source: snapshot.source(),
            refresh_success: self.refresh_success.load(Ordering::Relaxed),
            refresh_failure: self.refresh_failure.load(Ordering::Relaxed),
        }
    }

    /// Fetch the directory and publish a new snapshot. Returns the number of cameras loaded.
    #[tracing::instrument(skip(self), fields(cache.operation = "refresh"))]
    pub async fn refresh(&self) -> Result<usize, DirectoryError> {
        let result = self.directory.fetch_cameras().await.and_then(|cameras| {
            if cameras.is_empty() {
                Err(DirectoryError::EmptyResult)
            } else {
                Ok(cameras)
            }
        });

        let cameras = match result {
            Ok(cameras) => cameras,
            Err(e) => {
                self.refresh_failure.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(
                    error = %e,
                    fallback = !self.has_loaded(),
                    "Credential refresh failed, keeping previous snapshot"
                );
                return Err(e);
            }
        };

        let snapshot = CredentialSnapshot::new(
            cameras,
            self.config.scripted_networks.clone(),
            self.config.regions.clone(),
            SnapshotSource::Directory {
                loaded_at: Utc::now(),
            },
        );
        let count = snapshot.camera_count();

        self.sender.send_replace(Arc::new(snapshot));
        self.loaded.store(true, Ordering::Release);
        self.refresh_success.fetch_add(1, Ordering::Relaxed);

        tracing::debug!(camera_count = count, "Credential snapshot published");
        Ok(count)
    }

    /// Start the refresh loop. The first refresh runs immediately.
    /// Returns a JoinHandle for graceful shutdown
    pub fn start(self: Arc<Self>, cancel: CancellationToken) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut refresh_interval = interval(self.config.refresh_interval);
            refresh_interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        tracing::info!("Credential refresh loop stopped");
                        break;
                    }
                    _ = refresh_interval.tick() => {
                        // Errors are logged in refresh() and retried next tick.
                        let _ = self.refresh().await;
                    }
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use camgate_core::models::{CameraRecord, NetworkPattern};
    use camgate_db::test_utils::MockCameraDirectory;
    use std::collections::{BTreeMap, HashMap};
    use std::time::Duration;

    fn camera(id: &str) -> CameraRecord {
        CameraRecord {
            id: id.to_string(),
            region: "north".to_string(),
            expected_network: None,
            ftp_target_folder: None,
            ftp_target_filename: None,
        }
    }

    fn config() -> CredentialConfig {
        let mut camera_ip_mapping = BTreeMap::new();
        camera_ip_mapping.insert(
            "static-1".to_string(),
            "203.0.113.5".parse::<NetworkPattern>().unwrap(),
        );
        CredentialConfig {
            refresh_interval: Duration::from_millis(20),
            camera_ip_mapping,
            default_region: "default".to_string(),
            regions: HashMap::new(),
            scripted_networks: BTreeMap::new(),
            scripted_region: "Scripted".to_string(),
        }
    }

    #[tokio::test]
    async fn test_current_before_load_is_static_fallback() {
        let directory = Arc::new(MockCameraDirectory::default());
        let cache = CredentialCache::new(directory, config());

        let snapshot = cache.current();
        assert!(snapshot.is_fallback());
        assert!(!cache.has_loaded());
        assert_eq!(snapshot.camera("static-1").unwrap().region, "default");
    }

    #[tokio::test]
    async fn test_refresh_publishes_directory_snapshot() {
        let directory = Arc::new(MockCameraDirectory::new(vec![camera("12"), camera("13")]));
        let cache = CredentialCache::new(directory, config());

        assert_eq!(cache.refresh().await.unwrap(), 2);
        let snapshot = cache.current();
        assert!(!snapshot.is_fallback());
        assert!(snapshot.camera("12").is_some());
        assert!(snapshot.camera("static-1").is_none());
        assert_eq!(cache.stats().refresh_success, 1);
    }

    #[tokio::test]
    async fn test_empty_refresh_never_clobbers_snapshot() {
        let directory = Arc::new(MockCameraDirectory::new(vec![camera("12")]));
        let cache = CredentialCache::new(directory.clone(), config());
        cache.refresh().await.unwrap();
        let before = cache.current();

        directory.set_cameras(Vec::new());
        assert!(matches!(
            cache.refresh().await,
            Err(DirectoryError::EmptyResult)
        ));

        let after = cache.current();
        assert!(Arc::ptr_eq(&before, &after));
        assert!(after.camera("12").is_some());
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_fallback_and_counts() {
        let directory = Arc::new(MockCameraDirectory::new(vec![camera("12")]));
        directory.set_unreachable(true);
        let cache = CredentialCache::new(directory, config());

        assert!(matches!(
            cache.refresh().await,
            Err(DirectoryError::Unreachable(_))
        ));
        assert!(cache.current().is_fallback());
        assert_eq!(cache.stats().refresh_failure, 1);
    }

    #[tokio::test]
    async fn test_refresh_loop_loads_and_stops_on_cancel() {
        let directory = Arc::new(MockCameraDirectory::new(vec![camera("12")]));
        let cache = Arc::new(CredentialCache::new(directory.clone(), config()));
        let mut updates = cache.subscribe();
        let cancel = CancellationToken::new();

        let handle = cache.clone().start(cancel.clone());
        tokio::time::timeout(Duration::from_secs(2), updates.changed())
            .await
            .unwrap()
            .unwrap();
        assert!(cache.has_loaded());

        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .unwrap()
            .unwrap();
        assert!(directory.fetch_count() >= 1);
    }
}
