//! Input validation shared by the upload and read paths.

use crate::constants::MAX_CAMERA_ID_LEN;

/// Check a camera id against the allow-listed character set and length bound.
pub fn is_valid_camera_id(id: &str) -> bool {
    !id.is_empty()
        && id.len() <= MAX_CAMERA_ID_LEN
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// Derive the camera id from an upload filename: the last path component with its
/// extension removed. Returns `None` when the remaining stem is not a valid id.
pub fn camera_id_from_filename(filename: &str) -> Option<&str> {
    let name = filename
        .trim()
        .trim_matches('"')
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default();

    let stem = match name.rfind('.') {
        Some(0) => return None,
        Some(idx) => &name[..idx],
        None => name,
    };

    is_valid_camera_id(stem).then_some(stem)
}

/// JPEG streams start with the SOI marker followed by another marker byte.
pub fn is_jpeg(data: &[u8]) -> bool {
    data.len() >= 3 && data[0] == 0xFF && data[1] == 0xD8 && data[2] == 0xFF
}
