//! In-memory repository implementations for testing
//!
//! These mocks allow testing the cache, the retention engine and the API without a database.

use crate::{CameraDirectory, ImageIndexStore};
use camgate_core::models::{CameraRecord, ImageIndexEntry, NewImageIndexEntry, StorageTier};
use camgate_core::{AppError, DirectoryError};
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Scripted camera directory: returns whatever the test last configured.
#[derive(Clone, Default)]
pub struct MockCameraDirectory {
    cameras: Arc<Mutex<Vec<CameraRecord>>>,
    unreachable: Arc<AtomicBool>,
    fetches: Arc<AtomicUsize>,
}

impl MockCameraDirectory {
    pub fn new(cameras: Vec<CameraRecord>) -> Self {
        let directory = Self::default();
        directory.set_cameras(cameras);
        directory
    }

    pub fn set_cameras(&self, cameras: Vec<CameraRecord>) {
        *self.cameras.lock().unwrap() = cameras;
    }

    pub fn set_unreachable(&self, unreachable: bool) {
        self.unreachable.store(unreachable, Ordering::SeqCst);
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl CameraDirectory for MockCameraDirectory {
    async fn fetch_cameras(&self) -> Result<Vec<CameraRecord>, DirectoryError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if self.unreachable.load(Ordering::SeqCst) {
            return Err(DirectoryError::Unreachable("mock directory offline".to_string()));
        }
        let cameras = self.cameras.lock().unwrap().clone();
        if cameras.is_empty() {
            return Err(DirectoryError::EmptyResult);
        }
        Ok(cameras)
    }
}

/// Image index held in a vector, with a switch to simulate store outages.
#[derive(Clone, Default)]
pub struct MockImageIndex {
    entries: Arc<Mutex<Vec<ImageIndexEntry>>>,
    next_id: Arc<Mutex<i64>>,
    failing: Arc<AtomicBool>,
}

impl MockImageIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call fail with a database-style error.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn entries(&self) -> Vec<ImageIndexEntry> {
        self.entries.lock().unwrap().clone()
    }

    pub fn get(&self, id: i64) -> Option<ImageIndexEntry> {
        self.entries
            .lock()
            .unwrap()
            .iter()
            .find(|e| e.id == id)
            .cloned()
    }

    fn check(&self) -> Result<(), AppError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(AppError::Internal("mock index store offline".to_string()));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl ImageIndexStore for MockImageIndex {
    async fn insert(&self, entry: NewImageIndexEntry) -> Result<ImageIndexEntry, AppError> {
        self.check()?;
        let id = {
            let mut next = self.next_id.lock().unwrap();
            *next += 1;
            *next
        };
        let stored = ImageIndexEntry {
            id,
            camera_id: entry.camera_id,
            original_local_path: entry.original_local_path,
            watermarked_local_path: entry.watermarked_local_path,
            original_object_key: entry.original_object_key,
            watermarked_object_key: entry.watermarked_object_key,
            ingested_at: entry.ingested_at,
        };
        self.entries.lock().unwrap().push(stored.clone());
        Ok(stored)
    }

    async fn select_expired(
        &self,
        tier: StorageTier,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<ImageIndexEntry>, AppError> {
        self.check()?;
        let mut rows: Vec<ImageIndexEntry> = self
            .entries
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.ingested_at < cutoff && !e.tier_keys(tier).is_empty())
            .cloned()
            .collect();
        rows.sort_by_key(|e| e.ingested_at);
        Ok(rows)
    }

    async fn clear_tier(
        &self,
        tier: StorageTier,
        ids: &[i64],
        cutoff: DateTime<Utc>,
    ) -> Result<u64, AppError> {
        self.check()?;
        let mut cleared = 0;
        for entry in self.entries.lock().unwrap().iter_mut() {
            if ids.contains(&entry.id) && entry.ingested_at < cutoff {
                entry.clear_tier(tier);
                cleared += 1;
            }
        }
        Ok(cleared)
    }

    async fn delete_dereferenced(&self) -> Result<u64, AppError> {
        self.check()?;
        let mut entries = self.entries.lock().unwrap();
        let before = entries.len();
        entries.retain(|e| !e.is_dereferenced());
        Ok((before - entries.len()) as u64)
    }

    async fn list_window(
        &self,
        camera_id: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<ImageIndexEntry>, AppError> {
        self.check()?;
        let mut rows: Vec<ImageIndexEntry> = self
            .entries
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.camera_id == camera_id && e.ingested_at >= since)
            .filter(|e| e.is_fully_populated())
            .cloned()
            .collect();
        rows.sort_by_key(|e| e.ingested_at);
        Ok(rows)
    }

    async fn latest(
        &self,
        camera_id: &str,
        since: DateTime<Utc>,
    ) -> Result<Option<ImageIndexEntry>, AppError> {
        Ok(self.list_window(camera_id, since).await?.pop())
    }

    async fn ping(&self) -> Result<(), AppError> {
        self.check()
    }
}
