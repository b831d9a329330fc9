//! Design defaults for the gate-access controller.
//!
//! This module centralizes every timing constant, wire token and hardware
//! default used across the Gatekeeper workspace. Runtime values live in
//! [`GateConfig`](crate::GateConfig), which starts from these defaults and may
//! override them at startup.
//!
//! # Timing Overview
//!
//! ```text
//! poll ──10ms──> poll ──10ms──> poll ...
//!        │
//!        └─ arrival edge (stable for >= 50ms)
//!              │
//!              ├─ serial: token x5 (20ms backoff), reply polled every 100ms, 5s window
//!              └─ http:   single GET, 60s window
//! ```
//!
//! # Usage
//!
//! ```
//! use gatekeeper_core::constants::*;
//! use std::time::Duration;
//!
//! let window = Duration::from_millis(DEFAULT_DEBOUNCE_MS);
//! assert_eq!(window, Duration::from_millis(50));
//! assert_eq!(SERIAL_DETECTION_TOKEN, "CAR_DETECTED\n");
//! ```

// ============================================================================
// Loop Timing
// ============================================================================

/// Default debounce window in milliseconds.
///
/// A raw presence sample must hold its value for at least this long before it
/// is committed as the stable value.
pub const DEFAULT_DEBOUNCE_MS: u64 = 50;

/// Default polling period of the cooperative loop in milliseconds.
pub const DEFAULT_POLL_PERIOD_MS: u64 = 10;

/// Default settle delay before the barrier is closed after a departure, in milliseconds.
pub const DEFAULT_SETTLE_MS: u64 = 1000;

/// Settle delay honored once at startup after the barrier is forced closed.
pub const STARTUP_SETTLE_MS: u64 = 500;

/// Minimum interval between two reconnection attempts of a dropped link.
pub const DEFAULT_RECONNECT_INTERVAL_MS: u64 = 2000;

/// Bounds accepted for the debounce window and the polling period.
pub const MIN_LOOP_TIMING_MS: u64 = 1;
pub const MAX_LOOP_TIMING_MS: u64 = 1000;

// ============================================================================
// Verification Timeouts
// ============================================================================

/// Default overall decision timeout for the HTTP binding (60 seconds).
pub const DEFAULT_HTTP_TIMEOUT_MS: u64 = 60_000;

/// Default overall decision timeout for the serial binding (5 seconds).
///
/// Measured from the arrival edge, not from the last transmitted byte.
pub const DEFAULT_SERIAL_TIMEOUT_MS: u64 = 5_000;

/// Lower bound for a configured decision timeout.
pub const MIN_DECISION_TIMEOUT_MS: u64 = 100;

/// Upper bound for a configured decision timeout.
pub const MAX_DECISION_TIMEOUT_MS: u64 = 120_000;

// ============================================================================
// Serial Binding
// ============================================================================

/// Token transmitted to the companion device when a vehicle arrives.
pub const SERIAL_DETECTION_TOKEN: &str = "CAR_DETECTED\n";

/// Reply prefix meaning "access granted".
pub const SERIAL_GRANT_PREFIX: &[u8; 2] = b"OK";

/// Reply prefix meaning "access denied".
pub const SERIAL_DENY_PREFIX: &[u8; 2] = b"NO";

/// Number of transmit attempts for the detection token.
pub const SERIAL_TX_ATTEMPTS: u32 = 5;

/// Spacing between two transmit attempts in milliseconds.
pub const SERIAL_TX_BACKOFF_MS: u64 = 20;

/// Per-call timeout of one inbound poll in milliseconds.
pub const SERIAL_RX_POLL_MS: u64 = 100;

/// Default baud rate (8 data bits, no parity, 1 stop bit).
pub const DEFAULT_SERIAL_BAUD: u32 = 115_200;

/// Default serial device on the companion link.
pub const DEFAULT_SERIAL_PORT: &str = "/dev/ttyAMA0";

// ============================================================================
// Radio (HTTP) Binding
// ============================================================================

/// Default recognition endpoint.
pub const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:8000/lpr";

/// Maximum accepted response body length in bytes.
pub const MAX_PAYLOAD_LENGTH: usize = 1024;

// ============================================================================
// Peripherals
// ============================================================================

/// Default presence sensor pin (LM393 digital output).
pub const DEFAULT_SENSOR_PIN: u8 = 4;

/// Default servo control pin.
pub const DEFAULT_SERVO_PIN: u8 = 5;

/// Barrier angle when closed.
pub const DEFAULT_CLOSED_ANGLE: u16 = 0;

/// Barrier angle when open.
pub const DEFAULT_OPEN_ANGLE: u16 = 90;

/// Largest angle a hobby servo accepts.
pub const MAX_SERVO_ANGLE: u16 = 180;

/// Default I2C address of the SSD1306 panel.
pub const DEFAULT_DISPLAY_ADDRESS: u8 = 0x3C;

/// Text lines on a 128x64 panel with a 6x8 font, scaled x2.
pub const DISPLAY_LINES: usize = 4;

/// Characters per line on a 128x64 panel with a 6x8 font, scaled x2.
pub const DISPLAY_COLUMNS: usize = 10;

// ============================================================================
// Display Messages
// ============================================================================

pub const MSG_WELCOME: &str = "Welcome";
pub const MSG_CAR: &str = "CAR";
pub const MSG_CHECKING: &str = "checking";
pub const MSG_ACCEPT: &str = "ACCEPT";
pub const MSG_DENY: &str = "DENY";
pub const MSG_TIMEOUT: &str = "Timeout";
pub const MSG_CLOSING: &str = "Closing";
pub const MSG_READY: &str = "Ready";

// ============================================================================
// History
// ============================================================================

/// Maximum number of state transitions kept in memory.
///
/// A complete grant cycle is four transitions, so 100 entries hold the last
/// 25 vehicles.
pub const MAX_HISTORY_SIZE: usize = 100;
