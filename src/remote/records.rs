//! Wire record shapes and their reduction into display state.
//!
//! The record store speaks JSON arrays of rows. Rows are deserialized
//! with serde and immediately reduced to the small fixed shapes the
//! rest of the loop consumes; a row with an unparsable timestamp keeps
//! its other fields and degrades only the time-derived ones to absent.

use serde::Deserialize;

use crate::timeutil::parse_timestamp;

/// One row of the dose table as it appears on the wire.
#[derive(Debug, Clone, Deserialize)]
pub struct DoseRow {
    pub created_at: String,
    pub qty: i64,
    pub drug: String,
    pub dose: f64,
    pub dose_unit: String,
}

/// One row of the status log as it appears on the wire.
#[derive(Debug, Clone, Deserialize)]
pub struct LogRow {
    pub created_at: String,
    pub event_type: String,
}

/// The most recent dose entry, replaced wholesale on each fetch.
#[derive(Debug, Clone, PartialEq)]
pub struct DoseRecord {
    /// Absent when the row's timestamp failed to parse.
    pub epoch: Option<i64>,
    pub qty: u32,
    pub drug: String,
    pub dose: f64,
    pub dose_unit: String,
}

impl DoseRecord {
    pub fn from_row(row: &DoseRow) -> Self {
        Self {
            epoch: parse_timestamp(&row.created_at),
            qty: row.qty.max(0) as u32,
            drug: row.drug.clone(),
            dose: row.dose,
            dose_unit: row.dose_unit.clone(),
        }
    }
}

/// Aggregate over today's dose rows, rebuilt on each fetch and never
/// mutated incrementally.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DailySummary {
    /// Total units taken today.
    pub qty_sum: u32,
    /// Total amount taken today (units x per-unit dose).
    pub total_amount: f64,
    /// Timestamp of the newest row, absent when none parsed.
    pub last_epoch: Option<i64>,
}

/// Reduce today's rows (already day-filtered by the server) into the
/// daily aggregate.
pub fn summarize(rows: &[DoseRow]) -> DailySummary {
    let mut summary = DailySummary::default();
    for row in rows {
        let qty = row.qty.max(0) as u32;
        summary.qty_sum += qty;
        summary.total_amount += f64::from(qty) * row.dose;
        if let Some(epoch) = parse_timestamp(&row.created_at) {
            summary.last_epoch = Some(summary.last_epoch.map_or(epoch, |e: i64| e.max(epoch)));
        }
    }
    summary
}

/// Fixed vocabulary of status-log entries.
///
/// Unmapped input falls back to [`StatusKind::Unknown`] rather than
/// passing a raw string through to the display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    Wake,
    Sleep,
    Dose,
    Unknown,
}

impl StatusKind {
    pub fn from_event_type(event_type: &str) -> Self {
        match event_type {
            "wake" => StatusKind::Wake,
            "sleep" => StatusKind::Sleep,
            "dose" => StatusKind::Dose,
            _ => StatusKind::Unknown,
        }
    }

    /// Short display label.
    pub fn label(&self) -> &'static str {
        match self {
            StatusKind::Wake => "awake",
            StatusKind::Sleep => "asleep",
            StatusKind::Dose => "dosed",
            StatusKind::Unknown => "---",
        }
    }
}

/// Most recent state-transition entry from the status log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusEvent {
    pub kind: StatusKind,
    /// Absent when the row's timestamp failed to parse.
    pub epoch: Option<i64>,
}

impl StatusEvent {
    pub fn from_row(row: &LogRow) -> Self {
        Self {
            kind: StatusKind::from_event_type(&row.event_type),
            epoch: parse_timestamp(&row.created_at),
        }
    }
}
