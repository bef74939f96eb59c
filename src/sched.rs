//! Dose-scheduling policy.
//!
//! Pure functions over epochs and [`Settings`] - no state, no I/O, so
//! the whole policy is host-testable. The daily dosing window is
//! `[windowStartHour:00, windowEndHour:00]` local time, converted to
//! absolute epoch bounds through the timezone offset.

use crate::settings::Settings;
use crate::timeutil::local_day_bounds;

/// Why a submission is currently disallowed.
///
/// Exactly one reason is ever reported; the first matching rule wins.
/// Before-window and interval-unexpired are deliberately collapsed into
/// the single `TooSoon` variant - downstream display logic does not
/// disambiguate them.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DenyReason {
    /// Daily unit cap reached.
    Limit,
    /// Too early: before the window, or the interval has not elapsed.
    TooSoon,
    /// After the window end for today.
    TooLate,
}

impl DenyReason {
    /// Short display label for the warning screen.
    pub fn label(&self) -> &'static str {
        match self {
            DenyReason::Limit => "DAILY LIMIT",
            DenyReason::TooSoon => "TOO SOON",
            DenyReason::TooLate => "TOO LATE",
        }
    }
}

/// Absolute epoch bounds of today's dosing window.
pub fn dosing_window(now_epoch: i64, settings: &Settings) -> (i64, i64) {
    let (day_start, _) = local_day_bounds(now_epoch, settings.timezone_offset_minutes);
    (
        day_start + settings.window_start_hour * 3600,
        day_start + settings.window_end_hour * 3600,
    )
}

/// Next permitted dose time, or `None` when no further dose is allowed
/// today (cap reached, window missed, or the interval lands past the
/// window end).
pub fn next_dose_time(
    now_epoch: i64,
    last_dose_epoch: Option<i64>,
    today_qty: u32,
    settings: &Settings,
) -> Option<i64> {
    if today_qty >= settings.max_doses_per_day {
        return None;
    }

    let (window_start, window_end) = dosing_window(now_epoch, settings);

    if today_qty == 0 {
        // First dose of the day: due at window start, or missed outright.
        return (now_epoch < window_start).then_some(window_start);
    }

    let last = last_dose_epoch?;
    let next = (last + settings.interval_secs()).max(window_start);
    (next <= window_end).then_some(next)
}

/// Whether a submission right now is allowed, and if not, why.
///
/// Rule order: cap beats the time checks, then before-window, then
/// after-window, then the unexpired interval.
pub fn check_submission(
    now_epoch: i64,
    last_dose_epoch: Option<i64>,
    today_qty: u32,
    settings: &Settings,
) -> Option<DenyReason> {
    if today_qty >= settings.max_doses_per_day {
        return Some(DenyReason::Limit);
    }

    let (window_start, window_end) = dosing_window(now_epoch, settings);
    if now_epoch < window_start {
        return Some(DenyReason::TooSoon);
    }
    if now_epoch > window_end {
        return Some(DenyReason::TooLate);
    }

    if let Some(last) = last_dose_epoch {
        if now_epoch < last + settings.interval_secs() {
            return Some(DenyReason::TooSoon);
        }
    }

    None
}
