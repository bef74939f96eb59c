//! dosewatch control core.
//!
//! Everything that makes decisions lives here and is testable on the
//! host (no hardware required): input decoding, the mode state machine,
//! dose-scheduling policy, the resilient remote-store client, the alarm
//! subsystem, and view selection.
//!
//! Usage: `cargo test` (default features build only this library).
//!
//! The firmware binary (`src/main.rs`, feature `esp`) wires GPIO
//! interrupts, the I²C OLED, Wi-Fi, SNTP, and NVS-persisted settings to
//! this core and runs [`app::App::tick`] every ~50 ms.

pub mod alarm;
pub mod app;
pub mod config;
pub mod error;
pub mod input;
pub mod modes;
pub mod platform;
pub mod remote;
pub mod sched;
pub mod settings;
pub mod timeutil;
pub mod views;

#[cfg(feature = "esp")]
pub mod ui;

#[cfg(feature = "esp")]
pub mod wifi;

// ═══════════════════════════════════════════════════════════════════════════
// Unit Tests - scheduling, time, records, views, alarm policy
// ═══════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::alarm::{alarm_due, AlarmController};
    use super::platform::{Align, Line, Platform};
    use super::remote::records::{summarize, DoseRecord, DoseRow, StatusKind};
    use super::remote::{day_query, last_dose_query, status_query, submit_body};
    use super::sched::{check_submission, dosing_window, next_dose_time, DenyReason};
    use super::settings::Settings;
    use super::timeutil::{
        elapsed_ms, fmt_relative, format_timestamp, local_day_bounds, local_hhmm, parse_timestamp,
    };
    use super::views::{self, available, View, ViewSelector};

    /// 2024-10-04T00:00:00Z - a clean local-midnight fixture for tz 0.
    const DAY: i64 = 1_728_000_000;
    const HOUR: i64 = 3600;

    fn settings() -> Settings {
        Settings::default() // interval 180 min, window 8-22, max 7, tz 0
    }

    // ════════════════════════════════════════════════════════════════════════
    // DoseScheduler Tests
    // ════════════════════════════════════════════════════════════════════════

    #[test]
    fn window_bounds_follow_settings_and_timezone() {
        let s = settings();
        let (start, end) = dosing_window(DAY + 12 * HOUR, &s);
        assert_eq!(start, DAY + 8 * HOUR);
        assert_eq!(end, DAY + 22 * HOUR);

        let mut shifted = s;
        shifted.timezone_offset_minutes = 120;
        let (start, _) = dosing_window(DAY + 12 * HOUR, &shifted);
        // Local midnight moved two hours earlier in absolute terms.
        assert_eq!(start, DAY + 8 * HOUR - 2 * HOUR);
    }

    #[test]
    fn limit_beats_every_time_check() {
        let s = settings();
        // Before the window, after the window, mid-window: always Limit.
        for now in [DAY + HOUR, DAY + 12 * HOUR, DAY + 23 * HOUR] {
            assert_eq!(
                check_submission(now, Some(now - HOUR), 7, &s),
                Some(DenyReason::Limit)
            );
        }
    }

    #[test]
    fn before_window_is_too_soon() {
        let s = settings();
        assert_eq!(
            check_submission(DAY + 7 * HOUR, None, 0, &s),
            Some(DenyReason::TooSoon)
        );
    }

    #[test]
    fn after_window_is_too_late() {
        let s = settings();
        assert_eq!(
            check_submission(DAY + 23 * HOUR, None, 0, &s),
            Some(DenyReason::TooLate)
        );
    }

    #[test]
    fn unexpired_interval_is_too_soon() {
        let s = settings();
        let now = DAY + 12 * HOUR;
        assert_eq!(
            check_submission(now, Some(now - HOUR), 2, &s),
            Some(DenyReason::TooSoon)
        );
    }

    #[test]
    fn expired_interval_is_allowed() {
        let s = settings();
        let now = DAY + 12 * HOUR;
        assert_eq!(check_submission(now, Some(now - 4 * HOUR), 2, &s), None);
    }

    #[test]
    fn first_dose_inside_window_is_allowed() {
        let s = settings();
        assert_eq!(check_submission(DAY + 9 * HOUR, None, 0, &s), None);
    }

    #[test]
    fn window_edges_are_inclusive() {
        let s = settings();
        assert_eq!(check_submission(DAY + 8 * HOUR, None, 0, &s), None);
        assert_eq!(check_submission(DAY + 22 * HOUR, None, 0, &s), None);
    }

    #[test]
    fn interval_boundary_is_allowed() {
        let s = settings();
        let now = DAY + 12 * HOUR;
        let exactly_one_interval_ago = now - s.interval_secs();
        assert_eq!(
            check_submission(now, Some(exactly_one_interval_ago), 1, &s),
            None
        );
    }

    #[test]
    fn first_dose_before_window_is_due_at_window_start() {
        let s = settings();
        assert_eq!(
            next_dose_time(DAY + 6 * HOUR, None, 0, &s),
            Some(DAY + 8 * HOUR)
        );
    }

    #[test]
    fn first_dose_after_window_start_is_missed() {
        let s = settings();
        assert_eq!(next_dose_time(DAY + 9 * HOUR, None, 0, &s), None);
    }

    #[test]
    fn cap_reached_has_no_next_dose() {
        let s = settings();
        assert_eq!(next_dose_time(DAY + 12 * HOUR, Some(DAY + 9 * HOUR), 7, &s), None);
    }

    #[test]
    fn next_dose_is_interval_after_last() {
        let s = settings();
        assert_eq!(
            next_dose_time(DAY + 9 * HOUR, Some(DAY + 8 * HOUR), 1, &s),
            Some(DAY + 11 * HOUR)
        );
    }

    #[test]
    fn next_dose_clamps_up_to_window_start() {
        let s = settings();
        // Last dose long before the window opened.
        assert_eq!(
            next_dose_time(DAY + 8 * HOUR, Some(DAY + 4 * HOUR), 1, &s),
            Some(DAY + 8 * HOUR)
        );
    }

    #[test]
    fn next_dose_past_window_end_is_none() {
        let s = settings();
        assert_eq!(
            next_dose_time(DAY + 21 * HOUR, Some(DAY + 21 * HOUR), 1, &s),
            None
        );
    }

    #[test]
    fn next_dose_without_last_epoch_is_none() {
        let s = settings();
        assert_eq!(next_dose_time(DAY + 12 * HOUR, None, 2, &s), None);
    }

    // ════════════════════════════════════════════════════════════════════════
    // Time Tests
    // ════════════════════════════════════════════════════════════════════════

    #[test]
    fn timestamp_roundtrip_preserves_epoch() {
        for epoch in [0, DAY, DAY + 12 * HOUR + 34 * 60 + 56] {
            let wire = format_timestamp(epoch);
            assert_eq!(parse_timestamp(&wire), Some(epoch), "wire {wire}");
        }
    }

    #[test]
    fn parse_accepts_fractional_seconds_and_offsets() {
        assert_eq!(parse_timestamp("2024-10-04T00:00:00Z"), Some(DAY));
        assert_eq!(parse_timestamp("2024-10-04T00:00:00.123456Z"), Some(DAY));
        assert_eq!(parse_timestamp("2024-10-04T02:00:00+02:00"), Some(DAY));
        assert_eq!(parse_timestamp("2024-10-03T19:30:00-04:30"), Some(DAY));
    }

    #[test]
    fn parse_rejects_garbage() {
        assert_eq!(parse_timestamp(""), None);
        assert_eq!(parse_timestamp("yesterday"), None);
        assert_eq!(parse_timestamp("2024-10-04 00:00:00"), None);
    }

    #[test]
    fn day_bounds_respect_timezone_offset() {
        let (start, end) = local_day_bounds(DAY + 12 * HOUR, 0);
        assert_eq!(start, DAY);
        assert_eq!(end, DAY + 86_400 - 1);

        // UTC+01:00 - local midnight is an hour earlier in absolute terms.
        let (start, _) = local_day_bounds(DAY + 12 * HOUR, 60);
        assert_eq!(start, DAY - HOUR);

        // UTC-05:00.
        let (start, _) = local_day_bounds(DAY + 12 * HOUR, -300);
        assert_eq!(start, DAY + 5 * HOUR);
    }

    #[test]
    fn hhmm_renders_local_time() {
        assert_eq!(local_hhmm(DAY + 12 * HOUR + 34 * 60, 0).as_str(), "12:34");
        assert_eq!(local_hhmm(DAY + 12 * HOUR, -90).as_str(), "10:30");
        assert_eq!(local_hhmm(DAY, 0).as_str(), "00:00");
    }

    #[test]
    fn relative_formatting_scales_with_distance() {
        let now = DAY + 12 * HOUR;
        assert_eq!(fmt_relative(now, now - 30).as_str(), "now");
        assert_eq!(fmt_relative(now, now - 5 * 60).as_str(), "5m");
        assert_eq!(fmt_relative(now, now - 2 * HOUR - 5 * 60).as_str(), "2h05m");
        assert_eq!(fmt_relative(now, now - 3 * 86_400).as_str(), "3d");
    }

    #[test]
    fn elapsed_is_wraparound_safe() {
        assert_eq!(elapsed_ms(10, 5), 5);
        assert_eq!(elapsed_ms(5, u32::MAX - 4), 10);
    }

    // ════════════════════════════════════════════════════════════════════════
    // Settings Tests
    // ════════════════════════════════════════════════════════════════════════

    #[test]
    fn defaults_are_the_hard_coded_fallback() {
        let s = Settings::default();
        assert_eq!(s.dose_interval_minutes, 180);
        assert_eq!(s.window_start_hour, 8);
        assert_eq!(s.window_end_hour, 22);
        assert_eq!(s.max_doses_per_day, 7);
        assert_eq!(s.timezone_offset_minutes, 0);
    }

    #[test]
    fn missing_keys_fall_back_field_by_field() {
        let s = Settings::from_json(r#"{"doseIntervalMinutes": 240}"#).unwrap();
        assert_eq!(s.dose_interval_minutes, 240);
        assert_eq!(s.max_doses_per_day, 7);

        let s = Settings::from_json("{}").unwrap();
        assert_eq!(s, Settings::default());
    }

    #[test]
    fn unparsable_blob_is_an_error() {
        assert!(Settings::from_json("").is_err());
        assert!(Settings::from_json("not json").is_err());
    }

    #[test]
    fn settings_json_roundtrip_uses_camel_case() {
        let s = Settings {
            timezone_offset_minutes: -300,
            ..Settings::default()
        };
        let blob = s.to_json();
        assert!(blob.contains("doseIntervalMinutes"));
        assert!(blob.contains("timezoneOffsetMinutes"));
        assert_eq!(Settings::from_json(&blob).unwrap(), s);
    }

    // ════════════════════════════════════════════════════════════════════════
    // Remote Protocol Tests
    // ════════════════════════════════════════════════════════════════════════

    #[test]
    fn read_queries_select_order_and_limit() {
        assert_eq!(
            last_dose_query(),
            "/stimulants?select=created_at,qty,drug,dose,dose_unit&order=created_at.desc&limit=1"
        );
        assert_eq!(
            status_query(),
            "/daily_log?select=created_at,event_type&order=created_at.desc&limit=1"
        );
    }

    #[test]
    fn day_query_embeds_iso_bounds() {
        let query = day_query(DAY, DAY + 86_400 - 1);
        assert!(query.starts_with("/stimulants?select="));
        assert!(query.contains("created_at=gte.2024-10-04T00:00:00Z"));
        assert!(query.contains("created_at=lte.2024-10-04T23:59:59Z"));
        assert!(query.ends_with("order=created_at.asc"));
    }

    #[test]
    fn submit_body_carries_the_configured_substance() {
        let body: serde_json::Value = serde_json::from_str(&submit_body(2)).unwrap();
        assert_eq!(body["qty"], 2);
        assert_eq!(body["drug"], crate::config::DRUG_NAME);
        assert_eq!(body["dose"], crate::config::DOSE_AMOUNT);
        assert_eq!(body["dose_unit"], crate::config::DOSE_UNIT);
    }

    // ════════════════════════════════════════════════════════════════════════
    // Record Reduction Tests
    // ════════════════════════════════════════════════════════════════════════

    fn row(created_at: &str, qty: i64) -> DoseRow {
        DoseRow {
            created_at: created_at.into(),
            qty,
            drug: "mph".into(),
            dose: 10.0,
            dose_unit: "mg".into(),
        }
    }

    #[test]
    fn summary_aggregates_units_amount_and_newest_epoch() {
        let rows = [
            row("2024-10-04T08:00:00Z", 1),
            row("2024-10-04T12:00:00Z", 2),
        ];
        let summary = summarize(&rows);
        assert_eq!(summary.qty_sum, 3);
        assert_eq!(summary.total_amount, 30.0);
        assert_eq!(summary.last_epoch, Some(DAY + 12 * HOUR));
    }

    #[test]
    fn summary_of_no_rows_is_empty() {
        let summary = summarize(&[]);
        assert_eq!(summary.qty_sum, 0);
        assert_eq!(summary.last_epoch, None);
    }

    #[test]
    fn bad_timestamp_degrades_only_time_fields() {
        let rows = [row("garbage", 2), row("2024-10-04T08:00:00Z", 1)];
        let summary = summarize(&rows);
        // Units and amount still counted; epoch comes from the good row.
        assert_eq!(summary.qty_sum, 3);
        assert_eq!(summary.last_epoch, Some(DAY + 8 * HOUR));

        let record = DoseRecord::from_row(&rows[0]);
        assert_eq!(record.epoch, None);
        assert_eq!(record.qty, 2);
    }

    #[test]
    fn negative_wire_qty_clamps_to_zero() {
        let record = DoseRecord::from_row(&row("2024-10-04T08:00:00Z", -3));
        assert_eq!(record.qty, 0);
    }

    #[test]
    fn status_vocabulary_is_closed() {
        assert_eq!(StatusKind::from_event_type("wake"), StatusKind::Wake);
        assert_eq!(StatusKind::from_event_type("sleep"), StatusKind::Sleep);
        assert_eq!(StatusKind::from_event_type("dose"), StatusKind::Dose);
        assert_eq!(StatusKind::from_event_type("reboot"), StatusKind::Unknown);
        assert_eq!(StatusKind::Unknown.label(), "---");
    }

    // ════════════════════════════════════════════════════════════════════════
    // View Selection Tests
    // ════════════════════════════════════════════════════════════════════════

    #[test]
    fn error_view_is_offered_only_while_latched() {
        assert_eq!(available(false).len(), 4);
        let with_error = available(true);
        assert_eq!(with_error.len(), 5);
        assert_eq!(with_error[4], View::Error);
    }

    #[test]
    fn cycling_wraps_through_available_views() {
        let mut selector = ViewSelector::new();
        assert_eq!(selector.current(), View::Status);
        selector.cycle(false, 0);
        assert_eq!(selector.current(), View::NextDoseCountdown);
        selector.cycle(false, 0);
        selector.cycle(false, 0);
        assert_eq!(selector.current(), View::DailyTotal);
        selector.cycle(false, 0);
        assert_eq!(selector.current(), View::Status);
    }

    #[test]
    fn cycling_off_a_vanished_error_view_restarts() {
        let mut selector = ViewSelector::new();
        for _ in 0..4 {
            selector.cycle(true, 0);
        }
        assert_eq!(selector.current(), View::Error);
        // Error cleared; the stale selection restarts at Status.
        selector.cycle(false, 0);
        assert_eq!(selector.current(), View::Status);
    }

    #[test]
    fn auto_select_waits_out_the_manual_timer() {
        let mut selector = ViewSelector::new();
        selector.cycle(false, 1000); // manual: NextDoseCountdown
        selector.auto_select(5000, Some(DAY + 12 * HOUR), None);
        assert_eq!(selector.current(), View::NextDoseCountdown);

        // Past the 10 s timeout, no near next dose: Status.
        selector.auto_select(11_500, Some(DAY + 12 * HOUR), None);
        assert_eq!(selector.current(), View::Status);
    }

    #[test]
    fn near_or_overdue_next_dose_selects_the_countdown() {
        let now = DAY + 12 * HOUR;
        let mut selector = ViewSelector::new();
        selector.auto_select(20_000, Some(now), Some(now + 30 * 60));
        assert_eq!(selector.current(), View::NextDoseCountdown);

        // Overdue stays inside the lookahead.
        selector.auto_select(40_000, Some(now), Some(now - 10 * 60));
        assert_eq!(selector.current(), View::NextDoseCountdown);

        // Too far out: back to Status.
        selector.auto_select(60_000, Some(now), Some(now + 3 * HOUR));
        assert_eq!(selector.current(), View::Status);
    }

    #[test]
    fn views_render_no_data_fallbacks() {
        let snapshot = views::Snapshot {
            last_dose: None,
            summary: None,
            status: None,
            next_dose: None,
            now_epoch: None,
            tz_offset_minutes: 0,
            online: true,
        };
        for view in [View::Status, View::LastDose, View::DailyTotal] {
            match views::render(view, &snapshot) {
                crate::platform::Frame::Lines(lines) => {
                    assert!(lines.iter().any(|l| l.text.as_str() == "no data"));
                }
                other => panic!("expected lines, got {other:?}"),
            }
        }
    }

    #[test]
    fn display_lines_truncate_to_window_width() {
        let line = Line::new("a line far wider than the panel", Align::Left);
        assert_eq!(line.text.len(), crate::platform::LINE_CHARS);
    }

    // ════════════════════════════════════════════════════════════════════════
    // Alarm Policy Tests
    // ════════════════════════════════════════════════════════════════════════

    #[test]
    fn zero_doses_today_raises_the_alarm() {
        let s = settings();
        assert!(alarm_due(DAY + 9 * HOUR, 0, None, 0, &s));
    }

    #[test]
    fn grace_period_suppresses_the_alarm() {
        let s = settings();
        let now = DAY + 9 * HOUR;
        assert!(!alarm_due(now, now + 60, None, 0, &s));
        assert!(alarm_due(now, now - 1, None, 0, &s));
    }

    #[test]
    fn outside_the_window_stays_silent() {
        let s = settings();
        assert!(!alarm_due(DAY + 7 * HOUR, 0, None, 0, &s));
        assert!(!alarm_due(DAY + 23 * HOUR, 0, None, 0, &s));
    }

    #[test]
    fn overdue_next_dose_raises_the_alarm() {
        let s = settings();
        let now = DAY + 13 * HOUR;
        // Last dose four hours ago, three-hour interval: overdue.
        assert!(alarm_due(now, 0, Some(now - 4 * HOUR), 1, &s));
    }

    #[test]
    fn unexpired_interval_stays_silent() {
        let s = settings();
        let now = DAY + 13 * HOUR;
        assert!(!alarm_due(now, 0, Some(now - HOUR), 1, &s));
    }

    #[test]
    fn cap_reached_stays_silent() {
        let s = settings();
        assert!(!alarm_due(DAY + 13 * HOUR, 0, Some(DAY + 9 * HOUR), 7, &s));
    }

    struct Outputs {
        now_ms: u32,
        led: bool,
        buzzer: bool,
        invert: bool,
    }

    impl Platform for Outputs {
        fn now_ms(&self) -> u32 {
            self.now_ms
        }
        fn epoch_now(&self) -> Option<i64> {
            None
        }
        fn delay_ms(&mut self, ms: u32) {
            self.now_ms = self.now_ms.wrapping_add(ms);
        }
        fn set_led(&mut self, on: bool) {
            self.led = on;
        }
        fn set_buzzer(&mut self, on: bool) {
            self.buzzer = on;
        }
        fn set_invert(&mut self, on: bool) {
            self.invert = on;
        }
    }

    #[test]
    fn alarm_effect_toggles_all_outputs_in_lock_step() {
        let s = settings();
        let mut outputs = Outputs {
            now_ms: 1000,
            led: false,
            buzzer: false,
            invert: false,
        };
        let mut alarm = AlarmController::new();
        alarm.reevaluate(Some(DAY + 9 * HOUR), None, 0, &s);
        assert!(alarm.is_active());

        alarm.drive(1000, &mut outputs);
        assert!(outputs.led && outputs.buzzer && outputs.invert);

        // Inside the toggle period: unchanged.
        alarm.drive(1100, &mut outputs);
        assert!(outputs.led);

        alarm.drive(1300, &mut outputs);
        assert!(!outputs.led && !outputs.buzzer && !outputs.invert);
    }

    #[test]
    fn silencing_forces_quiescent_outputs() {
        let s = settings();
        let mut outputs = Outputs {
            now_ms: 1000,
            led: false,
            buzzer: false,
            invert: false,
        };
        let mut alarm = AlarmController::new();
        alarm.reevaluate(Some(DAY + 9 * HOUR), None, 0, &s);
        alarm.drive(1000, &mut outputs);
        assert!(outputs.buzzer);

        alarm.silence(&mut outputs);
        assert!(!alarm.is_active());
        assert!(!outputs.led && !outputs.buzzer && !outputs.invert);
    }
}
