//! Camera directory records and the immutable credential snapshot built from them.

use super::network::NetworkPattern;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::net::IpAddr;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CameraRecord {
    pub id: String,
    pub region: String,
    /// `None` means the IP check is skipped for this camera.
    pub expected_network: Option<NetworkPattern>,
    pub ftp_target_folder: Option<String>,
    pub ftp_target_filename: Option<String>,
}

#[derive(Clone, PartialEq, Eq, Serialize, serde::Deserialize)]
pub struct RegionCredential {
    pub region: String,
    pub username: String,
    #[serde(skip_serializing)]
    pub password: String,
}

impl fmt::Debug for RegionCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegionCredential")
            .field("region", &self.region)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Where a snapshot came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SnapshotSource {
    Directory { loaded_at: DateTime<Utc> },
    StaticFallback,
}

/// Fully constructed view of the credential directory. Never mutated after creation.
#[derive(Debug, Clone, Serialize)]
pub struct CredentialSnapshot {
    cameras: HashMap<String, CameraRecord>,
    scripted_networks: BTreeMap<String, Vec<NetworkPattern>>,
    regions: HashMap<String, RegionCredential>,
    source: SnapshotSource,
}

impl CredentialSnapshot {
    pub fn new(
        cameras: Vec<CameraRecord>,
        scripted_networks: BTreeMap<String, Vec<NetworkPattern>>,
        regions: HashMap<String, RegionCredential>,
        source: SnapshotSource,
    ) -> Self {
        let cameras = cameras
            .into_iter()
            .map(|camera| (camera.id.clone(), camera))
            .collect();
        Self {
            cameras,
            scripted_networks,
            regions,
            source,
        }
    }

    /// Deterministic snapshot built from the static camera-id to IP mapping.
    ///
    /// Every mapped camera is assigned `default_region` and pinned to its mapped address.
    pub fn static_fallback(
        camera_ip_mapping: &BTreeMap<String, NetworkPattern>,
        default_region: &str,
        scripted_networks: BTreeMap<String, Vec<NetworkPattern>>,
        regions: HashMap<String, RegionCredential>,
    ) -> Self {
        let cameras = camera_ip_mapping
            .iter()
            .map(|(id, network)| CameraRecord {
                id: id.clone(),
                region: default_region.to_string(),
                expected_network: Some(network.clone()),
                ftp_target_folder: None,
                ftp_target_filename: None,
            })
            .collect();
        Self::new(
            cameras,
            scripted_networks,
            regions,
            SnapshotSource::StaticFallback,
        )
    }

    pub fn camera(&self, camera_id: &str) -> Option<&CameraRecord> {
        self.cameras.get(camera_id)
    }

    pub fn region(&self, region: &str) -> Option<&RegionCredential> {
        self.regions.get(region)
    }

    /// Name of the first scripted network (in name order) whose patterns match `ip`.
    pub fn scripted_network_for(&self, ip: IpAddr) -> Option<&str> {
        self.scripted_networks
            .iter()
            .find(|(_, patterns)| patterns.iter().any(|p| p.matches(ip)))
            .map(|(name, _)| name.as_str())
    }

    pub fn cameras(&self) -> impl Iterator<Item = &CameraRecord> {
        self.cameras.values()
    }

    pub fn camera_count(&self) -> usize {
        self.cameras.len()
    }

    pub fn source(&self) -> SnapshotSource {
        self.source
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self.source, SnapshotSource::StaticFallback)
    }
}
