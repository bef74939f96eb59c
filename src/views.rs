//! View selection and summary rendering for Display mode.
//!
//! Five views over the cached remote state. The Error view is only
//! offered while the sticky error indicator is latched. A press cycles
//! through the available list (wrapping); after 10 s without manual
//! cycling the default view is recomputed - the countdown when the next
//! dose is known and near, the status otherwise.

use core::fmt::Write as _;

use crate::config::{NEXT_DOSE_LOOKAHEAD_SECS, VIEW_AUTO_SELECT_MS};
use crate::platform::{Align, Frame, Line, LINE_CHARS};
use crate::remote::records::{DailySummary, DoseRecord, StatusEvent};
use crate::timeutil::{elapsed_ms, fmt_relative, local_hhmm};

/// A summary the display can show.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum View {
    Status,
    NextDoseCountdown,
    LastDose,
    DailyTotal,
    Error,
}

/// Views currently offered, in cycling order.
pub fn available(error_active: bool) -> heapless::Vec<View, 5> {
    let mut views: heapless::Vec<View, 5> = heapless::Vec::new();
    let _ = views.push(View::Status);
    let _ = views.push(View::NextDoseCountdown);
    let _ = views.push(View::LastDose);
    let _ = views.push(View::DailyTotal);
    if error_active {
        let _ = views.push(View::Error);
    }
    views
}

/// Chooses which summary is shown, combining manual cycling with
/// inactivity-based auto-selection.
pub struct ViewSelector {
    current: View,
    last_cycle_ms: u32,
}

impl ViewSelector {
    pub const fn new() -> Self {
        Self {
            current: View::Status,
            last_cycle_ms: 0,
        }
    }

    pub fn current(&self) -> View {
        self.current
    }

    /// Manual cycling: advance to the next available view, wrapping.
    pub fn cycle(&mut self, error_active: bool, now_ms: u32) {
        let views = available(error_active);
        let index = views.iter().position(|v| *v == self.current);
        self.current = match index {
            Some(i) => views[(i + 1) % views.len()],
            // Current view no longer offered (error cleared): restart.
            None => View::Status,
        };
        self.last_cycle_ms = now_ms;
    }

    /// Automatic selection after the manual-cycling timeout.
    pub fn auto_select(&mut self, now_ms: u32, now_epoch: Option<i64>, next_dose: Option<i64>) {
        if elapsed_ms(now_ms, self.last_cycle_ms) < VIEW_AUTO_SELECT_MS {
            return;
        }
        self.current = default_view(now_epoch, next_dose);
    }
}

impl Default for ViewSelector {
    fn default() -> Self {
        Self::new()
    }
}

/// Default view: the countdown when the next dose is known and within
/// the lookahead (an overdue dose stays within it), else the status.
fn default_view(now_epoch: Option<i64>, next_dose: Option<i64>) -> View {
    match (now_epoch, next_dose) {
        (Some(now), Some(next)) if next - now <= NEXT_DOSE_LOOKAHEAD_SECS => {
            View::NextDoseCountdown
        }
        _ => View::Status,
    }
}

/// Read-only slice of loop state the renderers consume.
pub struct Snapshot<'a> {
    pub last_dose: Option<&'a DoseRecord>,
    pub summary: Option<&'a DailySummary>,
    pub status: Option<&'a StatusEvent>,
    pub next_dose: Option<i64>,
    pub now_epoch: Option<i64>,
    pub tz_offset_minutes: i32,
    pub online: bool,
}

/// Render one view into a display frame.
pub fn render(view: View, snap: &Snapshot<'_>) -> Frame {
    match view {
        View::Status => render_status(snap),
        View::NextDoseCountdown => render_countdown(snap),
        View::LastDose => render_last_dose(snap),
        View::DailyTotal => render_daily_total(snap),
        View::Error => render_error(snap),
    }
}

fn render_status(snap: &Snapshot<'_>) -> Frame {
    let mut lines: heapless::Vec<Line, 4> = heapless::Vec::new();
    let _ = lines.push(Line::new("status", Align::Center));
    match snap.status {
        Some(event) => {
            let _ = lines.push(Line::new(event.kind.label(), Align::Center));
            let _ = lines.push(Line::new(&ago(snap, event.epoch), Align::Center));
        }
        None => {
            let _ = lines.push(Line::new("no data", Align::Center));
        }
    }
    Frame::Lines(lines)
}

fn render_countdown(snap: &Snapshot<'_>) -> Frame {
    let mut lines: heapless::Vec<Line, 4> = heapless::Vec::new();
    let _ = lines.push(Line::new("next dose", Align::Center));
    match (snap.next_dose, snap.now_epoch) {
        (Some(next), Some(now)) => {
            let _ = lines.push(Line::new(
                &local_hhmm(next, snap.tz_offset_minutes),
                Align::Center,
            ));
            let mut rel: heapless::String<LINE_CHARS> = heapless::String::new();
            if now >= next {
                let _ = rel.push_str("due now");
            } else {
                let _ = write!(rel, "in {}", fmt_relative(now, next));
            }
            let _ = lines.push(Line::new(&rel, Align::Center));
        }
        _ => {
            let _ = lines.push(Line::new("none today", Align::Center));
        }
    }
    Frame::Lines(lines)
}

fn render_last_dose(snap: &Snapshot<'_>) -> Frame {
    let mut lines: heapless::Vec<Line, 4> = heapless::Vec::new();
    let _ = lines.push(Line::new("last dose", Align::Center));
    match snap.last_dose {
        Some(record) => {
            match record.epoch {
                Some(epoch) => {
                    let _ = lines.push(Line::new(
                        &local_hhmm(epoch, snap.tz_offset_minutes),
                        Align::Center,
                    ));
                }
                None => {
                    let _ = lines.push(Line::new("unknown", Align::Center));
                }
            }
            let mut amount: heapless::String<LINE_CHARS> = heapless::String::new();
            let _ = write!(
                amount,
                "{}x {}{}",
                record.qty,
                trim_amount(record.dose),
                record.dose_unit
            );
            let _ = lines.push(Line::new(&amount, Align::Center));
        }
        None => {
            let _ = lines.push(Line::new("no data", Align::Center));
        }
    }
    Frame::Lines(lines)
}

fn render_daily_total(snap: &Snapshot<'_>) -> Frame {
    let mut lines: heapless::Vec<Line, 4> = heapless::Vec::new();
    let _ = lines.push(Line::new("today", Align::Center));
    match snap.summary {
        Some(summary) => {
            let mut units: heapless::String<LINE_CHARS> = heapless::String::new();
            let _ = write!(units, "{} units", summary.qty_sum);
            let _ = lines.push(Line::new(&units, Align::Center));

            let mut amount: heapless::String<LINE_CHARS> = heapless::String::new();
            let _ = write!(amount, "{}mg", trim_amount(summary.total_amount));
            let _ = lines.push(Line::new(&amount, Align::Center));
        }
        None => {
            let _ = lines.push(Line::new("no data", Align::Center));
        }
    }
    Frame::Lines(lines)
}

fn render_error(snap: &Snapshot<'_>) -> Frame {
    let detail = if snap.online { "retrying" } else { "no config" };
    Frame::lines(&[
        ("store", Align::Center),
        ("OFFLINE", Align::Center),
        (detail, Align::Center),
    ])
}

/// "Nm ago" / "unknown" helper for status timestamps.
fn ago(snap: &Snapshot<'_>, epoch: Option<i64>) -> heapless::String<LINE_CHARS> {
    let mut out: heapless::String<LINE_CHARS> = heapless::String::new();
    match (snap.now_epoch, epoch) {
        (Some(now), Some(then)) => {
            let _ = write!(out, "{} ago", fmt_relative(now, then));
        }
        _ => {
            let _ = out.push_str("unknown");
        }
    }
    out
}

/// Render a dose amount without a trailing ".0".
fn trim_amount(amount: f64) -> heapless::String<12> {
    let mut out: heapless::String<12> = heapless::String::new();
    if (amount - amount.round()).abs() < f64::EPSILON {
        let _ = write!(out, "{}", amount.round() as i64);
    } else {
        let _ = write!(out, "{amount:.1}");
    }
    out
}
