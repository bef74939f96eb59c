//! Runtime settings - dosing policy knobs loaded once at startup.
//!
//! One small JSON object with five integer keys. Missing keys fall back
//! field-by-field to the hard-coded defaults; an unreadable blob falls
//! back wholesale (the firmware then best-effort rewrites it). The
//! struct is read-only for the rest of the process lifetime.

use serde::{Deserialize, Serialize};

/// Dosing policy configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Settings {
    /// Minimum spacing between doses (minutes).
    pub dose_interval_minutes: i64,
    /// First hour of the daily dosing window (local time, 0-23).
    pub window_start_hour: i64,
    /// Last hour of the daily dosing window (local time, 0-24).
    pub window_end_hour: i64,
    /// Unit cap per local calendar day.
    pub max_doses_per_day: u32,
    /// Local offset from UTC (minutes, signed).
    pub timezone_offset_minutes: i32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            dose_interval_minutes: 180,
            window_start_hour: 8,
            window_end_hour: 22,
            max_doses_per_day: 7,
            timezone_offset_minutes: 0,
        }
    }
}

impl Settings {
    /// Parse from a JSON blob. Keys absent from the blob keep their
    /// default value; a blob that is not a JSON object at all is an error
    /// and the caller falls back to [`Settings::default`].
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Serialize for persistence.
    pub fn to_json(&self) -> String {
        // Serialization of a plain integer struct cannot fail.
        serde_json::to_string(self).unwrap_or_default()
    }

    /// Dose interval in seconds.
    pub fn interval_secs(&self) -> i64 {
        self.dose_interval_minutes * 60
    }
}
