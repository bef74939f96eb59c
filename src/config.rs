//! Application-wide constants and compile-time configuration.
//!
//! All hardware pin assignments, timing parameters, and remote-store
//! constants live here so they can be tuned in one place. Runtime
//! settings (dose interval, dosing window, daily cap, timezone) live in
//! [`crate::settings`] instead.

// Main loop

/// Polling slice of the cooperative main loop (ms).
pub const TICK_MS: u32 = 50;

// Input

/// Minimum spacing between accepted encoder transitions (ms).
pub const ENCODER_DEBOUNCE_MS: u32 = 2;

/// Press-switch debounce window (ms).
pub const SWITCH_DEBOUNCE_MS: u32 = 50;

// Mode timing

/// Submit-mode inactivity timeout before abandon/confirm (ms).
pub const SUBMIT_IDLE_MS: u32 = 5000;

/// Number of indicator flashes in the submit confirmation sequence.
pub const CONFIRM_FLASHES: u32 = 6;

/// Half-period of one confirmation flash (ms). One flash = on + off.
pub const CONFIRM_HALF_MS: u32 = 250;

/// Input re-poll interval inside busy-wait sub-sequences (ms).
pub const CONFIRM_POLL_MS: u32 = 25;

/// Warning-mode dwell before the automatic return to Display (ms).
pub const WARNING_MS: u32 = 3000;

/// How long the post-submission failure notice stays on screen (ms).
pub const NOTICE_MS: u32 = 1500;

// Alarm

/// Lock-step toggle period of the LED/buzzer/invert alarm effect (ms).
pub const ALARM_TOGGLE_MS: u32 = 250;

/// Alarm re-evaluation is suppressed this long after a successful
/// submission, so a stale remote aggregate cannot re-trigger it (s).
pub const SUBMIT_GRACE_SECS: i64 = 120;

// Views

/// Inactivity before the default view is recomputed automatically (ms).
pub const VIEW_AUTO_SELECT_MS: u32 = 10_000;

/// The countdown view is auto-selected when the next dose falls within
/// this lookahead (s).
pub const NEXT_DOSE_LOOKAHEAD_SECS: i64 = 90 * 60;

// Remote store

/// Cached remote data is re-fetched at this interval in Display mode (ms).
pub const REMOTE_REFRESH_MS: u32 = 30_000;

/// Per-request transport timeout (ms).
pub const REMOTE_TIMEOUT_MS: u32 = 4000;

/// Submission attempts before giving up.
pub const SUBMIT_RETRIES: u32 = 3;

/// Pause between submission attempts (ms).
pub const SUBMIT_RETRY_PAUSE_MS: u32 = 600;

/// Substance identity attached to every submitted dose record.
pub const DRUG_NAME: &str = "mph";

/// Dose strength of one unit.
pub const DOSE_AMOUNT: f64 = 10.0;

/// Unit the dose strength is expressed in.
pub const DOSE_UNIT: &str = "mg";

// Credentials (compile-time, via build.rs / .env)
//
// Any of these resolving to `None` puts the firmware in its offline
// display state: no remote calls are ever attempted.

/// Wi-Fi SSID.
pub const WIFI_SSID: Option<&str> = option_env!("DOSEWATCH_WIFI_SSID");

/// Wi-Fi passphrase.
pub const WIFI_PASS: Option<&str> = option_env!("DOSEWATCH_WIFI_PASS");

/// Base URL of the record store REST interface (no trailing slash).
pub const API_URL: Option<&str> = option_env!("DOSEWATCH_API_URL");

/// API key, sent both as `apikey` and as the bearer token.
pub const API_KEY: Option<&str> = option_env!("DOSEWATCH_API_KEY");

// GPIO pin assignments (ESP32-C3 0.42" OLED board)
//
// These are logical names; the `esp_idf_hal::gpio` pins are selected in
// `main.rs`. Adjust for your wiring.
//
//   Encoder A      → GPIO3
//   Encoder B      → GPIO4
//   Press switch   → GPIO9
//   Status LED     → GPIO8
//   Buzzer         → GPIO10
//   I²C SDA        → GPIO5
//   I²C SCL        → GPIO6

/// Encoder line A pin number (for ISR-side level reads).
pub const PIN_ENC_A: i32 = 3;

/// Encoder line B pin number.
pub const PIN_ENC_B: i32 = 4;

/// Press switch pin number (active-low).
pub const PIN_SWITCH: i32 = 9;

/// I²C bus frequency for the OLED (Hz).
pub const I2C_FREQ_HZ: u32 = 400_000;
