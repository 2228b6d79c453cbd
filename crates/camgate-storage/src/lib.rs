//! Camgate Storage Library
//!
//! Storage abstraction for the two archive tiers: a local filesystem tier and an object
//! storage tier. Both are plain key to bytes stores with delete-by-key.
//!
//! # Storage key format
//!
//! Keys are relative, `/`-separated paths built by the archiver, for example
//! `originals/{camera_id}/{millis}.jpg`. Keys must not contain `..` or a leading `/`.

pub mod factory;
#[cfg(feature = "storage-local")]
pub mod local;
#[cfg(feature = "storage-s3")]
pub mod s3;
pub mod traits;

// Re-export commonly used types
pub use camgate_core::StorageBackend;
pub use factory::{create_directory_storage, create_storage_tiers, StorageTiers};
#[cfg(feature = "storage-local")]
pub use local::LocalStorage;
#[cfg(feature = "storage-s3")]
pub use s3::S3Storage;
pub use traits::{DeleteOutcome, Storage, StorageError, StorageResult};
