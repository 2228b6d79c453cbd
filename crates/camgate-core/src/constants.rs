/// HTTP path prefix for every gateway route.
pub const API_PREFIX: &str = "/api";

/// Region whose credential authorizes uploads from scripted networks.
pub const DEFAULT_SCRIPTED_REGION: &str = "Scripted";

pub const MAX_CAMERA_ID_LEN: usize = 64;

/// Replay window for `/replay/{camera_id}`.
pub const REPLAY_WINDOW_HOURS: i64 = 24;

/// Window for `/timelapse/{camera_id}`.
pub const TIMELAPSE_WINDOW_DAYS: i64 = 30;

/// Key prefixes under the local tier.
pub const LOCAL_ORIGINALS_PREFIX: &str = "originals";
pub const WATERMARKED_PREFIX: &str = "watermarked";
