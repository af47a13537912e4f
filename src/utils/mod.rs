//! Small shared helpers.
//!
//! This module provides:
//! - Error message sanitization and truncation
//! - Char-boundary-safe truncation for captured HTML
//! - Millisecond conversion for durations

pub mod sanitize;

pub use sanitize::{truncate_error, truncate_to_char_boundary};

/// Converts a duration to whole milliseconds, saturating at `u64::MAX`.
pub fn duration_to_ms(duration: std::time::Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
