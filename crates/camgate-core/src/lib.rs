//! Camgate Core Library
//!
//! Domain models, error types, configuration and validation shared by the upload
//! gateway, the archiver, the retention engine and the operator tools.

pub mod config;
pub mod constants;
pub mod error;
pub mod models;
pub mod storage_types;
pub mod validation;

// Re-export commonly used types
pub use config::{BaseConfig, Config, GatewayConfig, RejectionPolicy};
pub use error::{AppError, DirectoryError, ErrorMetadata, LogLevel, PublishError};
pub use storage_types::StorageBackend;
