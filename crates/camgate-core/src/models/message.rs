//! Fan-out message carrying one accepted image.

use bytes::Bytes;
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use uuid::Uuid;

pub const HEADER_CAMERA_ID: &str = "camera_id";
pub const HEADER_FILENAME: &str = "filename";
pub const HEADER_TIMESTAMP: &str = "timestamp";

/// Fixed-width UTC timestamp, `YYYYMMDDHHMMSSmmm`.
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.format("%Y%m%d%H%M%S%3f").to_string()
}

pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if raw.len() != 17 || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let seconds = NaiveDateTime::parse_from_str(&raw[..14], "%Y%m%d%H%M%S").ok()?;
    let millis: i64 = raw[14..].parse().ok()?;
    let naive = seconds.checked_add_signed(chrono::Duration::milliseconds(millis))?;
    Some(Utc.from_utc_datetime(&naive))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageHeaders {
    pub camera_id: String,
    /// Unique per image: `{camera_id}_{timestamp}_{uuid8}.jpg`.
    pub filename: String,
    pub timestamp: String,
}

impl ImageHeaders {
    pub fn new(camera_id: &str, at: DateTime<Utc>) -> Self {
        let timestamp = format_timestamp(at);
        let suffix = Uuid::new_v4().simple().to_string();
        let filename = format!("{}_{}_{}.jpg", camera_id, timestamp, &suffix[..8]);
        Self {
            camera_id: camera_id.to_string(),
            filename,
            timestamp,
        }
    }

    pub fn as_pairs(&self) -> [(&'static str, &str); 3] {
        [
            (HEADER_CAMERA_ID, self.camera_id.as_str()),
            (HEADER_FILENAME, self.filename.as_str()),
            (HEADER_TIMESTAMP, self.timestamp.as_str()),
        ]
    }

    pub fn ingested_at(&self) -> Option<DateTime<Utc>> {
        parse_timestamp(&self.timestamp)
    }
}

#[derive(Debug, Clone)]
pub struct ImageMessage {
    pub headers: ImageHeaders,
    pub body: Bytes,
    pub persistent: bool,
}

impl ImageMessage {
    pub fn new(camera_id: &str, at: DateTime<Utc>, body: Bytes) -> Self {
        Self {
            headers: ImageHeaders::new(camera_id, at),
            body,
            persistent: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamp_is_fixed_width() {
        let at = Utc.with_ymd_and_hms(2026, 3, 4, 5, 6, 7).unwrap()
            + chrono::Duration::milliseconds(8);
        assert_eq!(format_timestamp(at), "20260304050607008");
        assert_eq!(parse_timestamp("20260304050607008"), Some(at));
    }

    #[test]
    fn test_parse_timestamp_rejects_garbage() {
        assert_eq!(parse_timestamp("2026030405060700"), None);
        assert_eq!(parse_timestamp("2026030405060700x"), None);
        assert_eq!(parse_timestamp("20261304050607008"), None);
    }

    #[test]
    fn test_filenames_are_unique_per_image() {
        let at = Utc::now();
        let a = ImageHeaders::new("12", at);
        let b = ImageHeaders::new("12", at);
        assert_ne!(a.filename, b.filename);
        assert!(a.filename.starts_with(&format!("12_{}_", a.timestamp)));
        assert!(a.filename.ends_with(".jpg"));
        assert_eq!(a.filename.len(), "12_".len() + 17 + 1 + 8 + ".jpg".len());
    }

    #[test]
    fn test_messages_are_persistent() {
        let message = ImageMessage::new("12", Utc::now(), Bytes::from_static(b"\xFF\xD8\xFF"));
        assert!(message.persistent);
        assert_eq!(message.headers.as_pairs()[0], (HEADER_CAMERA_ID, "12"));
    }
}
