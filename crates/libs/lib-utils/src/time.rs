//! # Time Utilities

use chrono::Utc;

/// Milliseconds since the Unix epoch, the timestamp format used in signed challenges.
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}
