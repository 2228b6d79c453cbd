use camgate_core::config::RetentionConfig;
use camgate_core::models::StorageTier;
use camgate_core::AppError;
use camgate_db::ImageIndexStore;
use camgate_storage::StorageTiers;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Outcome of one tier pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TierReport {
    /// Rows past the tier threshold still referencing bytes in the tier
    pub candidates: usize,
    /// Rows whose tier columns were nulled
    pub cleared: u64,
    /// Rows kept because at least one delete failed
    pub retained: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CycleReport {
    pub local: TierReport,
    pub object: TierReport,
    pub rows_deleted: u64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RetentionStats {
    pub cycles_completed: u64,
    pub cycles_failed: u64,
}

/// Ages out archived images tier by tier, then garbage collects rows referencing nothing.
pub struct RetentionService {
    index: Arc<dyn ImageIndexStore>,
    tiers: StorageTiers,
    config: RetentionConfig,
    cycles_completed: AtomicU64,
    cycles_failed: AtomicU64,
}

impl RetentionService {
    pub fn new(
        index: Arc<dyn ImageIndexStore>,
        tiers: StorageTiers,
        config: RetentionConfig,
    ) -> Self {
        Self {
            index,
            tiers,
            config,
            cycles_completed: AtomicU64::new(0),
            cycles_failed: AtomicU64::new(0),
        }
    }

    pub fn stats(&self) -> RetentionStats {
        RetentionStats {
            cycles_completed: self.cycles_completed.load(Ordering::Relaxed),
            cycles_failed: self.cycles_failed.load(Ordering::Relaxed),
        }
    }

    fn cutoff(&self, tier: StorageTier, now: DateTime<Utc>) -> DateTime<Utc> {
        match tier {
            StorageTier::Local => now - self.config.local_max_age,
            StorageTier::Object => now - self.config.object_max_age,
        }
    }

    /// Start the retention loop.
    /// Returns a JoinHandle for graceful shutdown
    pub fn start(self: Arc<Self>, cancel: CancellationToken) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut retention_interval = interval(self.config.interval);
            retention_interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        tracing::info!("Retention loop stopped");
                        break;
                    }
                    _ = retention_interval.tick() => {
                        if let Err(e) = self.run_cycle().await {
                            tracing::error!(error = %e, "Retention cycle aborted");
                        }
                    }
                }
            }
        })
    }

    pub async fn run_cycle(&self) -> Result<CycleReport, AppError> {
        self.run_cycle_at(Utc::now()).await
    }

    /// Local pass, then object pass, then GC. Any index store failure aborts the cycle.
    #[tracing::instrument(skip(self), fields(retention.operation = "cycle"))]
    pub async fn run_cycle_at(&self, now: DateTime<Utc>) -> Result<CycleReport, AppError> {
        let result = self.cycle(now).await;
        match &result {
            Ok(report) => {
                self.cycles_completed.fetch_add(1, Ordering::Relaxed);
                if report.local.cleared > 0 || report.object.cleared > 0 || report.rows_deleted > 0
                {
                    tracing::info!(
                        local_cleared = report.local.cleared,
                        local_retained = report.local.retained,
                        object_cleared = report.object.cleared,
                        object_retained = report.object.retained,
                        rows_deleted = report.rows_deleted,
                        "Retention cycle completed"
                    );
                }
            }
            Err(_) => {
                self.cycles_failed.fetch_add(1, Ordering::Relaxed);
            }
        }
        result
    }

    async fn cycle(&self, now: DateTime<Utc>) -> Result<CycleReport, AppError> {
        let local = self.purge_tier(StorageTier::Local, now).await?;
        let object = self.purge_tier(StorageTier::Object, now).await?;
        let rows_deleted = self.index.delete_dereferenced().await?;
        Ok(CycleReport {
            local,
            object,
            rows_deleted,
        })
    }

    /// Delete expired bytes from one tier and null the references of fully deleted rows.
    #[tracing::instrument(skip(self), fields(retention.tier = %tier))]
    async fn purge_tier(
        &self,
        tier: StorageTier,
        now: DateTime<Utc>,
    ) -> Result<TierReport, AppError> {
        let cutoff = self.cutoff(tier, now);
        let expired = self.index.select_expired(tier, cutoff).await?;
        let storage = self.tiers.tier(tier);

        let mut cleared_ids = Vec::with_capacity(expired.len());
        let mut retained = 0;

        for entry in &expired {
            let mut all_deleted = true;
            for key in entry.tier_keys(tier) {
                if let Err(e) = storage.delete(key).await {
                    all_deleted = false;
                    tracing::warn!(
                        error = %e,
                        entry_id = entry.id,
                        camera_id = %entry.camera_id,
                        key = %key,
                        "Failed to delete expired image, will retry next cycle"
                    );
                }
            }
            if all_deleted {
                cleared_ids.push(entry.id);
            } else {
                retained += 1;
            }
        }

        let cleared = self.index.clear_tier(tier, &cleared_ids, cutoff).await?;

        Ok(TierReport {
            candidates: expired.len(),
            cleared,
            retained,
        })
    }

    /// Rows each tier pass would touch at `now`, without deleting anything.
    pub async fn candidates_at(&self, now: DateTime<Utc>) -> Result<(usize, usize), AppError> {
        let local = self
            .index
            .select_expired(StorageTier::Local, self.cutoff(StorageTier::Local, now))
            .await?;
        let object = self
            .index
            .select_expired(StorageTier::Object, self.cutoff(StorageTier::Object, now))
            .await?;
        Ok((local.len(), object.len()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use camgate_core::models::NewImageIndexEntry;
    use camgate_db::test_utils::MockImageIndex;
    use camgate_storage::{
        DeleteOutcome, LocalStorage, S3Storage, Storage, StorageBackend, StorageError,
        StorageResult,
    };
    use chrono::Duration;
    use object_store::memory::InMemory;
    use std::collections::HashSet;
    use std::sync::Mutex;

    /// Delegating storage that fails deletes for selected keys.
    struct FlakyStorage {
        inner: Arc<dyn Storage>,
        failing: Mutex<HashSet<String>>,
    }

    impl FlakyStorage {
        fn new(inner: Arc<dyn Storage>) -> Self {
            Self {
                inner,
                failing: Mutex::new(HashSet::new()),
            }
        }

        fn fail(&self, key: &str) {
            self.failing.lock().unwrap().insert(key.to_string());
        }

        fn heal(&self) {
            self.failing.lock().unwrap().clear();
        }
    }

    #[async_trait::async_trait]
    impl Storage for FlakyStorage {
        async fn upload_with_key(&self, key: &str, data: Bytes, ct: &str) -> StorageResult<()> {
            self.inner.upload_with_key(key, data, ct).await
        }

        async fn download(&self, key: &str) -> StorageResult<Bytes> {
            self.inner.download(key).await
        }

        async fn delete(&self, key: &str) -> StorageResult<DeleteOutcome> {
            if self.failing.lock().unwrap().contains(key) {
                return Err(StorageError::DeleteFailed("transient".to_string()));
            }
            self.inner.delete(key).await
        }

        async fn exists(&self, key: &str) -> StorageResult<bool> {
            self.inner.exists(key).await
        }

        fn backend_type(&self) -> StorageBackend {
            self.inner.backend_type()
        }
    }

    struct Fixture {
        _dir: tempfile::TempDir,
        index: Arc<MockImageIndex>,
        local: Arc<FlakyStorage>,
        object: Arc<dyn Storage>,
        service: RetentionService,
    }

    async fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let local = Arc::new(FlakyStorage::new(Arc::new(
            LocalStorage::new(dir.path()).await.unwrap(),
        )));
        let object: Arc<dyn Storage> =
            Arc::new(S3Storage::from_store(Arc::new(InMemory::new()), "archive"));
        let index = Arc::new(MockImageIndex::new());
        let config = RetentionConfig {
            enabled: true,
            interval: std::time::Duration::from_millis(10),
            local_max_age: Duration::hours(24),
            object_max_age: Duration::days(30),
        };
        let service = RetentionService::new(
            index.clone(),
            StorageTiers::new(local.clone(), object.clone()),
            config,
        );
        Fixture {
            _dir: dir,
            index,
            local,
            object,
            service,
        }
    }

    /// Store an image of `age` in both tiers and index it.
    async fn seed(f: &Fixture, camera_id: &str, now: DateTime<Utc>, age: Duration) -> i64 {
        let at = now - age;
        let millis = at.timestamp_millis();
        let entry = NewImageIndexEntry {
            camera_id: camera_id.to_string(),
            original_local_path: Some(format!("originals/{}/{}.jpg", camera_id, millis)),
            watermarked_local_path: Some(format!("watermarked/{}/{}.jpg", camera_id, millis)),
            original_object_key: Some(format!("{}/{}.jpg", camera_id, millis)),
            watermarked_object_key: Some(format!("watermarked/{}/{}.jpg", camera_id, millis)),
            ingested_at: at,
        };
        for key in [&entry.original_local_path, &entry.watermarked_local_path] {
            f.local
                .upload_with_key(key.as_deref().unwrap(), Bytes::from_static(b"x"), "image/jpeg")
                .await
                .unwrap();
        }
        for key in [&entry.original_object_key, &entry.watermarked_object_key] {
            f.object
                .upload_with_key(key.as_deref().unwrap(), Bytes::from_static(b"x"), "image/jpeg")
                .await
                .unwrap();
        }
        f.index.insert(entry).await.unwrap().id
    }

    #[tokio::test]
    async fn test_forty_hour_image_loses_local_tier_only() {
        let f = fixture().await;
        let now = Utc::now();
        let id = seed(&f, "12", now, Duration::hours(40)).await;
        let before = f.index.get(id).unwrap();

        let report = f.service.run_cycle_at(now).await.unwrap();
        assert_eq!(report.local.cleared, 1);
        assert_eq!(report.object.candidates, 0);
        assert_eq!(report.rows_deleted, 0);

        let after = f.index.get(id).unwrap();
        assert!(after.original_local_path.is_none());
        assert!(after.watermarked_local_path.is_none());
        assert_eq!(after.original_object_key, before.original_object_key);
        assert!(!f
            .local
            .exists(before.original_local_path.as_deref().unwrap())
            .await
            .unwrap());
        assert!(f
            .object
            .exists(before.original_object_key.as_deref().unwrap())
            .await
            .unwrap());

        // Just past 30 days the object tier ages out as well and the row is collected.
        let later = now + Duration::days(30) - Duration::hours(39);
        let report = f.service.run_cycle_at(later).await.unwrap();
        assert_eq!(report.object.cleared, 1);
        assert_eq!(report.rows_deleted, 1);
        assert!(f.index.get(id).is_none());
    }

    #[tokio::test]
    async fn test_cycle_is_idempotent() {
        let f = fixture().await;
        let now = Utc::now();
        seed(&f, "12", now, Duration::hours(40)).await;
        seed(&f, "12", now, Duration::days(31)).await;
        seed(&f, "12", now, Duration::hours(1)).await;

        let first = f.service.run_cycle_at(now).await.unwrap();
        assert_eq!(first.local.cleared, 2);
        assert_eq!(first.object.cleared, 1);
        assert_eq!(first.rows_deleted, 1);
        let state = f.index.entries();

        let second = f.service.run_cycle_at(now).await.unwrap();
        assert_eq!(second, CycleReport::default());
        assert_eq!(f.index.entries(), state);
    }

    #[tokio::test]
    async fn test_gc_removed_row_never_reappears() {
        let f = fixture().await;
        let now = Utc::now();
        let id = seed(&f, "12", now, Duration::days(45)).await;

        assert_eq!(f.service.run_cycle_at(now).await.unwrap().rows_deleted, 1);
        for _ in 0..3 {
            f.service.run_cycle_at(now).await.unwrap();
            assert!(f.index.get(id).is_none());
        }
        assert!(f.index.entries().iter().all(|e| !e.is_dereferenced()));
    }

    #[tokio::test]
    async fn test_transient_delete_failure_keeps_row_for_retry() {
        let f = fixture().await;
        let now = Utc::now();
        let id = seed(&f, "12", now, Duration::hours(40)).await;
        let entry = f.index.get(id).unwrap();
        f.local.fail(entry.watermarked_local_path.as_deref().unwrap());

        let report = f.service.run_cycle_at(now).await.unwrap();
        assert_eq!(report.local.retained, 1);
        assert_eq!(report.local.cleared, 0);
        // The original was deleted, but the row keeps both local references.
        assert_eq!(f.index.get(id).unwrap().original_local_path, entry.original_local_path);

        f.local.heal();
        let report = f.service.run_cycle_at(now).await.unwrap();
        assert_eq!(report.local.cleared, 1);
        assert!(f.index.get(id).unwrap().watermarked_local_path.is_none());
    }

    #[tokio::test]
    async fn test_index_failure_aborts_cycle() {
        let f = fixture().await;
        let now = Utc::now();
        let id = seed(&f, "12", now, Duration::hours(40)).await;
        let entry = f.index.get(id).unwrap();
        f.index.set_failing(true);

        assert!(f.service.run_cycle_at(now).await.is_err());
        assert_eq!(f.service.stats().cycles_failed, 1);
        assert!(f
            .local
            .exists(entry.original_local_path.as_deref().unwrap())
            .await
            .unwrap());

        f.index.set_failing(false);
        assert_eq!(f.service.run_cycle_at(now).await.unwrap().local.cleared, 1);
    }

    #[tokio::test]
    async fn test_rows_written_after_cutoff_are_untouched() {
        let f = fixture().await;
        let now = Utc::now();
        let id = seed(&f, "12", now, Duration::hours(23)).await;

        let report = f.service.run_cycle_at(now).await.unwrap();
        assert_eq!(report, CycleReport::default());
        assert!(f.index.get(id).unwrap().is_fully_populated());
        assert_eq!(f.service.candidates_at(now).await.unwrap(), (0, 0));
    }

    #[tokio::test]
    async fn test_loop_stops_on_cancel() {
        let f = fixture().await;
        let service = Arc::new(f.service);
        let cancel = CancellationToken::new();
        let handle = service.clone().start(cancel.clone());

        tokio::time::sleep(std::time::Duration::from_millis(30)).await;
        cancel.cancel();
        handle.await.unwrap();
        assert!(service.stats().cycles_completed >= 1);
    }
}
