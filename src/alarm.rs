//! Alarm subsystem - decides when the dose reminder should sound and
//! drives the synchronized buzzer/LED/display-invert effect.
//!
//! `active` is recomputed once per tick while in Display mode and is
//! always false in any other mode. The effect toggles all three outputs
//! in lock-step every 250 ms and is forced back to quiescent the moment
//! the alarm deactivates or the mode leaves Display - never left
//! mid-toggle.

use log::debug;

use crate::config::ALARM_TOGGLE_MS;
use crate::platform::Platform;
use crate::sched;
use crate::settings::Settings;
use crate::timeutil::elapsed_ms;

/// Whether the reminder should currently be active.
///
/// Suppression order: post-submission grace period, outside the dosing
/// window, submission currently disallowed. Then zero-doses-today wins
/// as the first trigger checked, before the overdue next-dose check.
pub fn alarm_due(
    now_epoch: i64,
    suppressed_until_epoch: i64,
    last_dose_epoch: Option<i64>,
    today_qty: u32,
    settings: &Settings,
) -> bool {
    if now_epoch < suppressed_until_epoch {
        return false;
    }

    let (window_start, window_end) = sched::dosing_window(now_epoch, settings);
    if now_epoch < window_start || now_epoch > window_end {
        return false;
    }

    if sched::check_submission(now_epoch, last_dose_epoch, today_qty, settings).is_some() {
        return false;
    }

    if today_qty == 0 {
        return true;
    }

    matches!(
        sched::next_dose_time(now_epoch, last_dose_epoch, today_qty, settings),
        Some(next) if now_epoch >= next
    )
}

/// Long-lived alarm state, owned by the main-loop context.
pub struct AlarmController {
    active: bool,
    effect_on: bool,
    last_toggle_ms: u32,
    suppressed_until_epoch: i64,
}

impl AlarmController {
    pub const fn new() -> Self {
        Self {
            active: false,
            effect_on: false,
            last_toggle_ms: 0,
            suppressed_until_epoch: 0,
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Suppress re-evaluation until the given epoch (submission grace).
    pub fn suppress_until(&mut self, epoch: i64) {
        self.suppressed_until_epoch = epoch;
    }

    /// Recompute `active` from policy. Display mode only; without a
    /// synchronized wall clock the alarm stays off.
    pub fn reevaluate(
        &mut self,
        now_epoch: Option<i64>,
        last_dose_epoch: Option<i64>,
        today_qty: u32,
        settings: &Settings,
    ) {
        let due = match now_epoch {
            Some(now) => alarm_due(
                now,
                self.suppressed_until_epoch,
                last_dose_epoch,
                today_qty,
                settings,
            ),
            None => false,
        };
        if due != self.active {
            debug!("alarm {}", if due { "raised" } else { "cleared" });
        }
        self.active = due;
    }

    /// Drive the combined effect for this tick. All three outputs flip
    /// together; deactivation snaps them back to quiescent.
    pub fn drive<P: Platform>(&mut self, now_ms: u32, platform: &mut P) {
        if !self.active {
            if self.effect_on {
                self.apply(false, platform);
            }
            return;
        }

        if elapsed_ms(now_ms, self.last_toggle_ms) >= ALARM_TOGGLE_MS {
            self.last_toggle_ms = now_ms;
            let on = !self.effect_on;
            self.apply(on, platform);
        }
    }

    /// Deactivate and force quiescent output immediately (mode exits,
    /// submit entry).
    pub fn silence<P: Platform>(&mut self, platform: &mut P) {
        self.active = false;
        self.apply(false, platform);
    }

    fn apply<P: Platform>(&mut self, on: bool, platform: &mut P) {
        self.effect_on = on;
        platform.set_led(on);
        platform.set_buzzer(on);
        platform.set_invert(on);
    }
}

impl Default for AlarmController {
    fn default() -> Self {
        Self::new()
    }
}
