//! Database repositories for data access layer
//!
//! `CameraDirectoryRepository` feeds the credential cache; `ImageIndexRepository` backs the
//! archiver, the retention engine and the read API. Both sit behind traits so services can be
//! tested without Postgres.

pub mod camera;
pub mod image_index;

pub use camera::{CameraDirectory, CameraDirectoryRepository, CameraRow};
pub use image_index::{ImageIndexRepository, ImageIndexRow, ImageIndexStore};
