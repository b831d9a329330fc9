//! Transport errors of the verification channels.

use std::time::Duration;

use gatekeeper_protocol::PayloadError;
use thiserror::Error;

/// Result type alias for channel operations.
pub type Result<T> = std::result::Result<T, TransportError>;

/// Ways a verification exchange can fail.
///
/// The controller turns every one of these into a deny. [`Timeout`] is kept
/// apart so the display and statistics can tell silence from breakage.
///
/// [`Timeout`]: TransportError::Timeout
#[derive(Debug, Error)]
pub enum TransportError {
    /// No decisive answer inside the decision window.
    #[error("No decision after {0}ms")]
    Timeout(u64),

    /// The link is down and could not be used for this attempt.
    #[error("Link not connected: {0}")]
    NotConnected(String),

    /// Request could not be delivered.
    #[error("Connection failed: {0}")]
    Connection(String),

    /// Service answered with a non-success status.
    #[error("Service returned HTTP {0}")]
    HttpStatus(u16),

    /// Service answered with a body we cannot use.
    #[error("Malformed payload: {0}")]
    Payload(#[from] PayloadError),

    /// Detection token could not be written after all attempts.
    #[error("Write failed after {attempts} attempts")]
    WriteFailed { attempts: u32 },

    /// Low-level I/O error on the serial link.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl TransportError {
    pub fn timeout(after: Duration) -> Self {
        Self::Timeout(u64::try_from(after.as_millis()).unwrap_or(u64::MAX))
    }

    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(value: reqwest::Error) -> Self {
        Self::Connection(value.to_string())
    }
}

impl From<serialport::Error> for TransportError {
    fn from(value: serialport::Error) -> Self {
        Self::NotConnected(value.to_string())
    }
}
