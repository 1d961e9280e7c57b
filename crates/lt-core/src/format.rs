//! Readout formatting

use crate::time::finite_or_zero;

const MS_PER_SECOND: u64 = 1000;
const MS_PER_MINUTE: u64 = 60 * MS_PER_SECOND;
const MS_PER_HOUR: u64 = 60 * MS_PER_MINUTE;

/// Split elapsed milliseconds into (hours, minutes, seconds, millis).
///
/// Every component truncates; negative and non-finite input counts as zero.
pub fn split_elapsed(ms: f64) -> (u64, u64, u64, u64) {
    let total = finite_or_zero(ms).max(0.0) as u64;
    let hours = total / MS_PER_HOUR;
    let minutes = (total % MS_PER_HOUR) / MS_PER_MINUTE;
    let seconds = (total % MS_PER_MINUTE) / MS_PER_SECOND;
    let millis = total % MS_PER_SECOND;
    (hours, minutes, seconds, millis)
}

/// Duration readout as `HH:MM:SS.mmm`
pub fn format_elapsed(ms: f64) -> String {
    let (h, m, s, millis) = split_elapsed(ms);
    format!("{:02}:{:02}:{:02}.{:03}", h, m, s, millis)
}

/// Ruler label as `MM:SS`, minutes wrap at the hour
pub fn format_ruler_label(seconds: u64) -> String {
    format!("{:02}:{:02}", (seconds / 60) % 60, seconds % 60)
}
