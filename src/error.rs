//! Unified error type for dosewatch.
//!
//! Nothing in this taxonomy is fatal to the main loop: remote and parse
//! failures are absorbed into cached state plus a visible/audible
//! signal. The firmware binary only bubbles errors during boot.

use core::fmt;

/// Top-level error type used across the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    // Remote store
    /// The transport failed (timeout, connect error, non-2xx status).
    Transport(TransportError),

    /// No connectivity credentials were compiled in; remote calls are
    /// never attempted.
    ConfigMissing,

    /// A dose submission failed after exhausting its retries.
    Submission,

    // Time
    /// Wall-clock time has not been synchronized yet.
    TimeSync,

    /// A record timestamp could not be parsed.
    InvalidTimestamp,

    // Hardware
    /// I²C transaction to the display failed.
    Display,

    /// Settings blob could not be read or written.
    Storage,
}

/// Subset of transport failures we distinguish (kept `Copy`-friendly).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportError {
    /// The request did not complete within the bounded timeout.
    Timeout,
    /// Connection could not be established or broke mid-transfer.
    Connect,
    /// The server answered outside the 2xx range.
    Status(u16),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Transport(TransportError::Timeout) => write!(f, "remote timeout"),
            Error::Transport(TransportError::Connect) => write!(f, "remote connect failed"),
            Error::Transport(TransportError::Status(code)) => {
                write!(f, "remote status {code}")
            }
            Error::ConfigMissing => write!(f, "no connectivity credentials"),
            Error::Submission => write!(f, "submission failed"),
            Error::TimeSync => write!(f, "time not synchronized"),
            Error::InvalidTimestamp => write!(f, "unparsable timestamp"),
            Error::Display => write!(f, "display I/O failed"),
            Error::Storage => write!(f, "settings storage failed"),
        }
    }
}

impl std::error::Error for Error {}

// Convenience conversions

impl From<TransportError> for Error {
    fn from(e: TransportError) -> Self {
        Error::Transport(e)
    }
}
