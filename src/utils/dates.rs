//! Date and time utilities

use chrono::Utc;

/// Current UTC time as fractional Unix seconds
pub fn utc_now_secs() -> f64 {
    Utc::now().timestamp_micros() as f64 / 1_000_000.0
}

/// Format seconds as "mm:ss"
pub fn format_clock(seconds: f32) -> String {
    let total = (seconds.max(0.0) + 0.0001).floor() as u64;
    format!("{:02}:{:02}", total / 60, total % 60)
}
