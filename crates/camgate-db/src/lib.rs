//! Camgate Database Library
//!
//! Postgres repositories for the camera directory and the image index.

pub mod db;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use db::*;
