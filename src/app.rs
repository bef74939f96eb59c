//! The cooperative main-loop context.
//!
//! One [`App`] owns every piece of mutable loop state (nothing lives
//! in free-floating statics besides the ISR-shared input) and advances
//! it once per ~50 ms tick: drain the decoded input exactly once, run exactly
//! one mode's logic, update the alarm and view selection, and hand back
//! the frame for the display sink. All blocking work (remote calls,
//! flash sequences) happens inside the tick, bounded by timeouts and
//! sub-interval polls.

use log::{info, warn};

use crate::alarm::AlarmController;
use crate::config::{NOTICE_MS, REMOTE_REFRESH_MS, SUBMIT_GRACE_SECS, SUBMIT_IDLE_MS, WARNING_MS};
use crate::input::InputShared;
use crate::modes::machine::{failure_beep, run_confirm_flash, ConfirmOutcome};
use crate::modes::{Mode, SubmitState, WarnState};
use crate::platform::{Align, Frame, Platform};
use crate::remote::{HttpTransport, RemoteStore};
use crate::sched;
use crate::settings::Settings;
use crate::timeutil::{elapsed_ms, local_day_bounds};
use crate::views::{self, Snapshot, ViewSelector};

pub struct App<T> {
    settings: Settings,
    mode: Mode,
    alarm: AlarmController,
    views: ViewSelector,
    store: RemoteStore<T>,
    /// Detent seen last tick; movement is a change of this.
    last_detent: i32,
    last_refresh_ms: u32,
    refreshed_once: bool,
    /// Monotonic stamp of an active "send failed" notice.
    notice_ms: Option<u32>,
}

impl<T: HttpTransport> App<T> {
    pub fn new(settings: Settings, store: RemoteStore<T>) -> Self {
        Self {
            settings,
            mode: Mode::Display,
            alarm: AlarmController::new(),
            views: ViewSelector::new(),
            store,
            last_detent: 0,
            last_refresh_ms: 0,
            refreshed_once: false,
            notice_ms: None,
        }
    }

    pub fn mode(&self) -> &Mode {
        &self.mode
    }

    pub fn alarm(&self) -> &AlarmController {
        &self.alarm
    }

    pub fn store(&self) -> &RemoteStore<T> {
        &self.store
    }

    pub fn current_view(&self) -> views::View {
        self.views.current()
    }

    /// Advance the loop by one tick and produce the frame to render.
    pub fn tick<P: Platform>(&mut self, input: &InputShared, platform: &mut P) -> Frame {
        let now_ms = platform.now_ms();
        let now_epoch = platform.epoch_now();

        let detent = input.detent();
        let moved = detent != self.last_detent;
        self.last_detent = detent;

        // The changed flag is drained exactly once per tick.
        let switch_changed = input.take_switch_changed();
        let pressed = switch_changed && input.is_pressed();

        match self.mode {
            Mode::Display => {
                self.tick_display(moved, pressed, detent, now_ms, now_epoch, platform)
            }
            Mode::Submit(state) => self.tick_submit(
                state,
                moved,
                switch_changed,
                detent,
                now_ms,
                input,
                platform,
            ),
            Mode::Warning(state) => self.tick_warning(state, pressed, detent, now_ms, platform),
        }
    }

    // Display mode: summaries, alarm, and the gateway into Submit.

    fn tick_display<P: Platform>(
        &mut self,
        moved: bool,
        pressed: bool,
        detent: i32,
        now_ms: u32,
        now_epoch: Option<i64>,
        platform: &mut P,
    ) -> Frame {
        if self.store.is_online()
            && (!self.refreshed_once
                || elapsed_ms(now_ms, self.last_refresh_ms) >= REMOTE_REFRESH_MS)
        {
            self.refresh(now_epoch);
            self.last_refresh_ms = now_ms;
            self.refreshed_once = true;
        }

        let (last_epoch, today_qty) = self.dose_state();
        self.alarm
            .reevaluate(now_epoch, last_epoch, today_qty, &self.settings);
        self.alarm.drive(now_ms, platform);

        if moved || pressed {
            if pressed {
                self.views.cycle(self.store.error_active(), now_ms);
            }

            // Without a synchronized clock the schedule cannot be
            // enforced; the attempt proceeds.
            let verdict = now_epoch
                .and_then(|now| sched::check_submission(now, last_epoch, today_qty, &self.settings));

            return match verdict {
                None => {
                    self.alarm.silence(platform);
                    info!("entering submit at detent {detent}");
                    self.mode = Mode::Submit(SubmitState::enter(detent, now_ms));
                    Frame::Numeral(0)
                }
                Some(reason) => {
                    self.alarm.silence(platform);
                    warn!("submission blocked: {reason:?}");
                    self.mode = Mode::Warning(WarnState {
                        reason,
                        entered_ms: now_ms,
                    });
                    warning_frame(reason)
                }
            };
        }

        let next_dose =
            now_epoch.and_then(|now| sched::next_dose_time(now, last_epoch, today_qty, &self.settings));
        self.views.auto_select(now_ms, now_epoch, next_dose);

        if let Some(set_ms) = self.notice_ms {
            if elapsed_ms(now_ms, set_ms) < NOTICE_MS {
                return Frame::lines(&[("send", Align::Center), ("FAILED", Align::Center)]);
            }
            self.notice_ms = None;
        }

        let snapshot = Snapshot {
            last_dose: self.store.last_dose(),
            summary: self.store.summary(),
            status: self.store.status(),
            next_dose,
            now_epoch,
            tz_offset_minutes: self.settings.timezone_offset_minutes,
            online: self.store.is_online(),
        };
        views::render(self.views.current(), &snapshot)
    }

    // Submit mode: quantity dial, abandon, confirm, submit.

    #[allow(clippy::too_many_arguments)]
    fn tick_submit<P: Platform>(
        &mut self,
        mut state: SubmitState,
        moved: bool,
        switch_changed: bool,
        detent: i32,
        now_ms: u32,
        input: &InputShared,
        platform: &mut P,
    ) -> Frame {
        if moved {
            state.quantity = (detent - state.entry_detent).max(0) as u32;
            state.last_input_ms = now_ms;
        }
        if switch_changed {
            state.last_input_ms = now_ms;
        }

        if elapsed_ms(now_ms, state.last_input_ms) >= SUBMIT_IDLE_MS {
            if state.quantity == 0 {
                info!("submit abandoned");
                self.mode = Mode::Display;
                return Frame::Numeral(0);
            }

            match run_confirm_flash(input, platform) {
                ConfirmOutcome::Cancelled => {
                    // The cancelling input was left unconsumed; the next
                    // tick re-processes it against active Submit.
                    state.last_input_ms = platform.now_ms();
                }
                ConfirmOutcome::Confirmed => {
                    let quantity = state.quantity;
                    self.mode = Mode::Display;
                    return self.finish_submission(quantity, platform);
                }
            }
        }

        self.mode = Mode::Submit(state);
        Frame::Numeral(state.quantity)
    }

    fn finish_submission<P: Platform>(&mut self, quantity: u32, platform: &mut P) -> Frame {
        if self.store.submit_dose(quantity, platform) {
            if let Some(now) = platform.epoch_now() {
                self.alarm.suppress_until(now + SUBMIT_GRACE_SECS);
            }
            self.refresh(platform.epoch_now());
            self.last_refresh_ms = platform.now_ms();
            self.refreshed_once = true;
        } else {
            failure_beep(platform);
            self.notice_ms = Some(platform.now_ms());
        }
        Frame::Numeral(quantity)
    }

    // Warning mode: timed notice; a press overrides into Submit.

    fn tick_warning<P: Platform>(
        &mut self,
        state: WarnState,
        pressed: bool,
        detent: i32,
        now_ms: u32,
        platform: &mut P,
    ) -> Frame {
        if pressed {
            info!("warning overridden by press");
            self.mode = Mode::Submit(SubmitState::enter(detent, now_ms));
            self.alarm.silence(platform);
            return Frame::Numeral(0);
        }

        if elapsed_ms(now_ms, state.entered_ms) >= WARNING_MS {
            self.mode = Mode::Display;
        }

        warning_frame(state.reason)
    }

    /// Re-fetch all cached remote state. Day-bounded aggregation needs
    /// a synchronized clock; without one only the unbounded reads run.
    fn refresh(&mut self, now_epoch: Option<i64>) {
        self.store.refresh_status();
        self.store.refresh_last_dose();
        if let Some(now) = now_epoch {
            let (day_start, day_end) =
                local_day_bounds(now, self.settings.timezone_offset_minutes);
            self.store.refresh_summary(day_start, day_end);
        }
    }

    /// Last-dose epoch and today's unit total as the scheduler sees
    /// them: today's aggregate when present, falling back to the
    /// newest cached record for the epoch.
    fn dose_state(&self) -> (Option<i64>, u32) {
        let summary = self.store.summary();
        let today_qty = summary.map_or(0, |s| s.qty_sum);
        let last_epoch = summary
            .and_then(|s| s.last_epoch)
            .or_else(|| self.store.last_dose().and_then(|r| r.epoch));
        (last_epoch, today_qty)
    }
}

fn warning_frame(reason: sched::DenyReason) -> Frame {
    Frame::lines(&[("no dose", Align::Center), (reason.label(), Align::Center)])
}
