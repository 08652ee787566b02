use std::time::{SystemTime, UNIX_EPOCH};

/// Seconds-since-epoch as used throughout the external contract (§3, §6).
pub fn now_secs() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs_f64()
}
