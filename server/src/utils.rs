use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Current wall-clock time in milliseconds.
pub fn get_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::from_secs(0))
        .as_millis() as u64
}

/// HP as sent on the wire: rounded up so a living unit never shows 0.
pub fn wire_hp(hp: f32) -> u32 {
    hp.max(0.0).ceil() as u32
}
