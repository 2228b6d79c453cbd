use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

/// One of the two physical storage backends holding image bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageTier {
    Local,
    Object,
}

impl fmt::Display for StorageTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageTier::Local => write!(f, "local"),
            StorageTier::Object => write!(f, "object"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageIndexEntry {
    pub id: i64,
    pub camera_id: String,
    pub original_local_path: Option<String>,
    pub watermarked_local_path: Option<String>,
    pub original_object_key: Option<String>,
    pub watermarked_object_key: Option<String>,
    pub ingested_at: DateTime<Utc>,
}

impl ImageIndexEntry {
    /// Non-null references held for `tier`, original first.
    pub fn tier_keys(&self, tier: StorageTier) -> Vec<&str> {
        let (original, watermarked) = match tier {
            StorageTier::Local => (&self.original_local_path, &self.watermarked_local_path),
            StorageTier::Object => (&self.original_object_key, &self.watermarked_object_key),
        };
        [original, watermarked]
            .into_iter()
            .filter_map(|key| key.as_deref())
            .collect()
    }

    pub fn clear_tier(&mut self, tier: StorageTier) {
        match tier {
            StorageTier::Local => {
                self.original_local_path = None;
                self.watermarked_local_path = None;
            }
            StorageTier::Object => {
                self.original_object_key = None;
                self.watermarked_object_key = None;
            }
        }
    }

    /// All four references are gone; the row must be garbage collected.
    pub fn is_dereferenced(&self) -> bool {
        self.original_local_path.is_none()
            && self.watermarked_local_path.is_none()
            && self.original_object_key.is_none()
            && self.watermarked_object_key.is_none()
    }

    /// Eligible for the public replay path.
    pub fn is_fully_populated(&self) -> bool {
        self.original_local_path.is_some()
            && self.watermarked_local_path.is_some()
            && self.original_object_key.is_some()
            && self.watermarked_object_key.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewImageIndexEntry {
    pub camera_id: String,
    pub original_local_path: Option<String>,
    pub watermarked_local_path: Option<String>,
    pub original_object_key: Option<String>,
    pub watermarked_object_key: Option<String>,
    pub ingested_at: DateTime<Utc>,
}
