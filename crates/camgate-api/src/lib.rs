//! Camgate API Library
//!
//! This crate provides the HTTP gateway: the camera auth engine, upload and read handlers,
//! and application setup.

// Module declarations
mod handlers;
pub mod setup;
mod telemetry;
mod utils;

// Public modules
pub mod auth;
pub mod error;
pub mod state;

// Re-exports
pub use auth::{AuthEngine, AuthMetrics, AuthMetricsSnapshot};
pub use error::{ErrorResponse, HttpAppError};
pub use utils::forwarded::{client_ip, forwarded_proto};
