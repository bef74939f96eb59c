//! Time arithmetic and timestamp formatting.
//!
//! Two clock domains meet here: the wrapping `u32` millisecond tick of
//! the monotonic timer (which wraps roughly every 49.7 days of uptime),
//! and the signed epoch-second wall clock obtained via SNTP. Every
//! monotonic comparison in the crate goes through [`elapsed_ms`] so the
//! wraparound is handled in exactly one place.

use core::fmt::Write as _;

use chrono::{DateTime, SecondsFormat, Utc};

/// Wraparound-safe milliseconds elapsed between two monotonic stamps.
pub fn elapsed_ms(now_ms: u32, since_ms: u32) -> u32 {
    now_ms.wrapping_sub(since_ms)
}

/// Parse an ISO-8601 timestamp with optional fractional seconds and a
/// `Z` or `±HH:MM` offset into an absolute epoch second.
///
/// Returns `None` on any parse failure; callers degrade the affected
/// time-derived field to absent rather than propagating an error.
pub fn parse_timestamp(text: &str) -> Option<i64> {
    DateTime::parse_from_rfc3339(text)
        .map(|dt| dt.timestamp())
        .ok()
}

/// Format an epoch second as UTC ISO-8601 (`...Z`, second precision).
pub fn format_timestamp(epoch: i64) -> String {
    match DateTime::<Utc>::from_timestamp(epoch, 0) {
        Some(dt) => dt.to_rfc3339_opts(SecondsFormat::Secs, true),
        None => String::new(),
    }
}

/// Start (inclusive) and end (inclusive) epoch bounds of the local
/// calendar day containing `epoch`, for a timezone offset in minutes.
pub fn local_day_bounds(epoch: i64, tz_offset_minutes: i32) -> (i64, i64) {
    let offset = i64::from(tz_offset_minutes) * 60;
    let local_day = (epoch + offset).div_euclid(86_400);
    let start = local_day * 86_400 - offset;
    (start, start + 86_400 - 1)
}

/// Local `HH:MM` rendering of an epoch second.
pub fn local_hhmm(epoch: i64, tz_offset_minutes: i32) -> heapless::String<8> {
    let offset = i64::from(tz_offset_minutes) * 60;
    let local = epoch + offset;
    let hour = local.div_euclid(3600).rem_euclid(24);
    let minute = local.div_euclid(60).rem_euclid(60);
    let mut out = heapless::String::new();
    let _ = write!(out, "{hour:02}:{minute:02}");
    out
}

/// Compact relative rendering of `then` against `now`: "3m", "4h05m",
/// "2d". Sub-minute gaps render as "now".
pub fn fmt_relative(now_epoch: i64, then_epoch: i64) -> heapless::String<12> {
    let mut out = heapless::String::new();
    let secs = (now_epoch - then_epoch).abs();
    if secs < 60 {
        let _ = out.push_str("now");
    } else if secs < 3600 {
        let _ = write!(out, "{}m", secs / 60);
    } else if secs < 86_400 {
        let _ = write!(out, "{}h{:02}m", secs / 3600, (secs % 3600) / 60);
    } else {
        let _ = write!(out, "{}d", secs / 86_400);
    }
    out
}
