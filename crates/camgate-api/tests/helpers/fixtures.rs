//! Cameras, credentials and payloads shared by the integration tests.

use bytes::Bytes;
use camgate_core::models::{CameraRecord, NewImageIndexEntry};
use chrono::{DateTime, Utc};

/// `Basic base64("cam:secret")`, the "north" region credential.
pub const NORTH_AUTH: &str = "Basic Y2FtOnNlY3JldA==";
/// `Basic base64("svc:token")`, the "Scripted" region credential.
pub const SCRIPTED_AUTH: &str = "Basic c3ZjOnRva2Vu";
/// `Basic base64("cam:wrong")`.
pub const WRONG_AUTH: &str = "Basic Y2FtOndyb25n";

fn camera(id: &str, expected_network: Option<&str>) -> CameraRecord {
    CameraRecord {
        id: id.to_string(),
        region: "north".to_string(),
        expected_network: expected_network.map(|n| n.parse().unwrap()),
        ftp_target_folder: None,
        ftp_target_filename: None,
    }
}

pub fn cameras() -> Vec<CameraRecord> {
    vec![
        camera("12", Some("203.0.113.5")),
        camera("99", Some("203.0.113.99")),
        camera("open", None),
    ]
}

pub fn content_disposition(filename: &str) -> String {
    format!("attachment; filename=\"{}\"", filename)
}

/// Smallest byte string the gateway accepts as JPEG.
pub fn jpeg() -> Bytes {
    Bytes::from_static(b"\xFF\xD8\xFF\xE0\x00\x10JFIF\x00\xFF\xD9")
}

pub fn png() -> Bytes {
    Bytes::from_static(b"\x89PNG\r\n\x1a\n\x00\x00\x00\x0dIHDR")
}

pub fn indexed(camera_id: &str, ingested_at: DateTime<Utc>) -> NewImageIndexEntry {
    let millis = ingested_at.timestamp_millis();
    NewImageIndexEntry {
        camera_id: camera_id.to_string(),
        original_local_path: Some(format!("originals/{}/{}.jpg", camera_id, millis)),
        watermarked_local_path: Some(format!("watermarked/{}/{}.jpg", camera_id, millis)),
        original_object_key: Some(format!("{}/{}.jpg", camera_id, millis)),
        watermarked_object_key: Some(format!("watermarked/{}/{}.jpg", camera_id, millis)),
        ingested_at,
    }
}
