//! Resilient client for the remote record store.
//!
//! Three reads (last dose, today's aggregate, current status) and one
//! write (submit dose) over a PostgREST-style JSON interface. Every
//! call is bounded by the transport's timeout; any transport error,
//! non-2xx status, or malformed body returns "no data", latches the
//! sticky error indicator, and leaves the last-known-good cache intact.
//! The indicator clears on the next successful call. Nothing here ever
//! raises a fatal error into the loop.
//!
//! ## Components
//!
//! - **records**: wire row shapes and their reduction to display state
//! - **RemoteStore**: caches + sticky error + retry policy
//! - **esp** (feature `esp`): transport over `EspHttpConnection`

pub mod records;

#[cfg(feature = "esp")]
pub mod esp;

use log::{info, warn};

use crate::config::{DOSE_AMOUNT, DOSE_UNIT, DRUG_NAME, SUBMIT_RETRIES, SUBMIT_RETRY_PAUSE_MS};
use crate::error::TransportError;
use crate::platform::Platform;
use crate::timeutil::format_timestamp;
use self::records::{summarize, DailySummary, DoseRecord, DoseRow, LogRow, StatusEvent};

/// Blocking HTTP seam. The implementation owns the bounded timeout and
/// attaches the `apikey` / bearer header pair to every request.
pub trait HttpTransport {
    /// GET the path+query, returning status code and body.
    fn get(&mut self, path_and_query: &str) -> Result<(u16, String), TransportError>;

    /// POST a JSON body to the path, returning status code and body.
    fn post_json(&mut self, path: &str, body: &str) -> Result<(u16, String), TransportError>;
}

// Query builders (pure; exercised directly by the unit tests)

/// Query for the single most recent dose row.
pub fn last_dose_query() -> &'static str {
    "/stimulants?select=created_at,qty,drug,dose,dose_unit&order=created_at.desc&limit=1"
}

/// Query for all dose rows within today's local epoch bounds.
pub fn day_query(day_start_epoch: i64, day_end_epoch: i64) -> String {
    format!(
        "/stimulants?select=created_at,qty,drug,dose,dose_unit\
         &created_at=gte.{}&created_at=lte.{}&order=created_at.asc",
        format_timestamp(day_start_epoch),
        format_timestamp(day_end_epoch),
    )
}

/// Query for the single most recent status-log row.
pub fn status_query() -> &'static str {
    "/daily_log?select=created_at,event_type&order=created_at.desc&limit=1"
}

/// JSON body for a dose submission.
pub fn submit_body(qty: u32) -> String {
    serde_json::json!({
        "qty": qty,
        "drug": DRUG_NAME,
        "dose": DOSE_AMOUNT,
        "dose_unit": DOSE_UNIT,
    })
    .to_string()
}

/// Caching client. Constructed offline when no credentials are
/// compiled in, in which case no call is ever attempted.
pub struct RemoteStore<T> {
    transport: Option<T>,
    last_dose: Option<DoseRecord>,
    summary: Option<DailySummary>,
    status: Option<StatusEvent>,
    /// Sticky error indicator: latched on failure, cleared on the next
    /// successful call.
    error: bool,
}

impl<T: HttpTransport> RemoteStore<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport: Some(transport),
            last_dose: None,
            summary: None,
            status: None,
            error: false,
        }
    }

    /// Degraded constructor for missing credentials.
    pub fn offline() -> Self {
        Self {
            transport: None,
            last_dose: None,
            summary: None,
            status: None,
            error: false,
        }
    }

    pub fn is_online(&self) -> bool {
        self.transport.is_some()
    }

    pub fn error_active(&self) -> bool {
        self.error
    }

    pub fn last_dose(&self) -> Option<&DoseRecord> {
        self.last_dose.as_ref()
    }

    pub fn summary(&self) -> Option<&DailySummary> {
        self.summary.as_ref()
    }

    pub fn status(&self) -> Option<&StatusEvent> {
        self.status.as_ref()
    }

    /// Re-fetch the most recent dose row.
    pub fn refresh_last_dose(&mut self) {
        if let Some(rows) = self.fetch_rows::<DoseRow>(last_dose_query()) {
            self.last_dose = rows.first().map(DoseRecord::from_row);
        }
    }

    /// Re-fetch and re-aggregate today's dose rows.
    pub fn refresh_summary(&mut self, day_start_epoch: i64, day_end_epoch: i64) {
        let query = day_query(day_start_epoch, day_end_epoch);
        if let Some(rows) = self.fetch_rows::<DoseRow>(&query) {
            self.summary = Some(summarize(&rows));
        }
    }

    /// Re-fetch the most recent status-log row.
    pub fn refresh_status(&mut self) {
        if let Some(rows) = self.fetch_rows::<LogRow>(status_query()) {
            self.status = rows.first().map(StatusEvent::from_row);
        }
    }

    /// Submit a dose of `qty` units, retrying up to [`SUBMIT_RETRIES`]
    /// times with a visible indicator between attempts. Returns whether
    /// the submission landed.
    pub fn submit_dose<P: Platform>(&mut self, qty: u32, platform: &mut P) -> bool {
        let Some(transport) = self.transport.as_mut() else {
            return false;
        };

        let body = submit_body(qty);
        for attempt in 1..=SUBMIT_RETRIES {
            match transport.post_json("/stimulants", &body) {
                Ok((status, _)) if (200..300).contains(&status) => {
                    info!("submitted qty={qty} (attempt {attempt})");
                    self.error = false;
                    return true;
                }
                Ok((status, _)) => warn!("submit attempt {attempt}: status {status}"),
                Err(e) => warn!("submit attempt {attempt}: {e:?}"),
            }

            if attempt < SUBMIT_RETRIES {
                // Brief LED pulse so the retry is visible to the user.
                platform.set_led(true);
                platform.delay_ms(SUBMIT_RETRY_PAUSE_MS / 2);
                platform.set_led(false);
                platform.delay_ms(SUBMIT_RETRY_PAUSE_MS / 2);
            }
        }

        warn!("submission failed after {SUBMIT_RETRIES} attempts");
        self.error = true;
        false
    }

    /// One GET + JSON-array decode with the sticky-error policy.
    fn fetch_rows<R: serde::de::DeserializeOwned>(&mut self, query: &str) -> Option<Vec<R>> {
        let transport = self.transport.as_mut()?;
        let body = match transport.get(query) {
            Ok((status, body)) if (200..300).contains(&status) => body,
            Ok((status, _)) => {
                warn!("fetch {query}: status {status}");
                self.error = true;
                return None;
            }
            Err(e) => {
                warn!("fetch {query}: {e:?}");
                self.error = true;
                return None;
            }
        };

        match serde_json::from_str::<Vec<R>>(&body) {
            Ok(rows) => {
                self.error = false;
                Some(rows)
            }
            Err(e) => {
                warn!("fetch {query}: bad body ({e})");
                self.error = true;
                None
            }
        }
    }
}
