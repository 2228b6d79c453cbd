//! Domain models shared by the gateway, the archiver and the retention engine.

pub mod auth;
pub mod camera;
pub mod image;
pub mod message;
pub mod network;

pub use auth::{AcceptedUpload, AuthDecision, AuthRejection, BasicCredentials, UploadRequestMeta};
pub use camera::{CameraRecord, CredentialSnapshot, RegionCredential, SnapshotSource};
pub use image::{ImageIndexEntry, NewImageIndexEntry, StorageTier};
pub use message::{ImageHeaders, ImageMessage};
pub use network::{NetworkPattern, NetworkPatternError};
