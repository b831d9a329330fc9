//! Startup configuration for the gate controller.
//!
//! All values are startup-time constants: they are read once, validated, and
//! handed to the controller. Nothing is reconfigured at runtime.
//!
//! # Examples
//!
//! ```
//! use gatekeeper_core::{GateConfig, VerificationBinding};
//! use std::time::Duration;
//!
//! let config = GateConfig::default()
//!     .binding(VerificationBinding::serial("/dev/ttyUSB0", 115_200))
//!     .debounce(Duration::from_millis(30));
//!
//! config.validate().unwrap();
//! assert_eq!(config.decision_timeout(), Duration::from_secs(5));
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::*;
use crate::error::{Error, Result};

/// Prefix shared by every environment variable read by [`GateConfig::from_env`].
pub const ENV_PREFIX: &str = "GATEKEEPER_";

/// Which transport carries verification requests.
///
/// The two bindings are mutually exclusive deployments; exactly one is active.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum VerificationBinding {
    /// Single GET request to the recognition endpoint.
    Http { endpoint: String },

    /// Token/reply exchange with a companion device over a UART.
    Serial { port: String, baud_rate: u32 },
}

impl VerificationBinding {
    pub fn http(endpoint: impl Into<String>) -> Self {
        Self::Http {
            endpoint: endpoint.into(),
        }
    }

    pub fn serial(port: impl Into<String>, baud_rate: u32) -> Self {
        Self::Serial {
            port: port.into(),
            baud_rate,
        }
    }

    /// Decision window used when none is configured explicitly.
    #[must_use]
    pub fn default_timeout(&self) -> Duration {
        match self {
            Self::Http { .. } => Duration::from_millis(DEFAULT_HTTP_TIMEOUT_MS),
            Self::Serial { .. } => Duration::from_millis(DEFAULT_SERIAL_TIMEOUT_MS),
        }
    }
}

impl Default for VerificationBinding {
    fn default() -> Self {
        Self::http(DEFAULT_ENDPOINT)
    }
}

/// Complete controller configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateConfig {
    /// Presence sensor pin.
    pub sensor_pin: u8,

    /// A low raw level means "vehicle present" (LM393 comparator output).
    pub sensor_active_low: bool,

    /// Servo control pin.
    pub servo_pin: u8,

    /// Barrier angle when closed.
    pub closed_angle: u16,

    /// Barrier angle when open.
    pub open_angle: u16,

    /// I2C address of the status panel.
    pub display_address: u8,

    /// Verification transport.
    pub binding: VerificationBinding,

    /// Debounce window of the presence sensor.
    pub debounce: Duration,

    /// Overall decision timeout; `None` selects the binding default.
    pub decision_timeout: Option<Duration>,

    /// Polling period of the cooperative loop.
    pub poll_period: Duration,

    /// Pause between the "closing" screen and the close command.
    pub settle_delay: Duration,

    /// Minimum interval between two link reconnection attempts.
    pub reconnect_interval: Duration,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            sensor_pin: DEFAULT_SENSOR_PIN,
            sensor_active_low: true,
            servo_pin: DEFAULT_SERVO_PIN,
            closed_angle: DEFAULT_CLOSED_ANGLE,
            open_angle: DEFAULT_OPEN_ANGLE,
            display_address: DEFAULT_DISPLAY_ADDRESS,
            binding: VerificationBinding::default(),
            debounce: Duration::from_millis(DEFAULT_DEBOUNCE_MS),
            decision_timeout: None,
            poll_period: Duration::from_millis(DEFAULT_POLL_PERIOD_MS),
            settle_delay: Duration::from_millis(DEFAULT_SETTLE_MS),
            reconnect_interval: Duration::from_millis(DEFAULT_RECONNECT_INTERVAL_MS),
        }
    }
}

impl GateConfig {
    /// Set the verification binding.
    pub fn binding(mut self, binding: VerificationBinding) -> Self {
        self.binding = binding;
        self
    }

    /// Set the debounce window.
    pub fn debounce(mut self, window: Duration) -> Self {
        self.debounce = window;
        self
    }

    /// Override the binding's default decision timeout.
    pub fn decision_timeout_override(mut self, timeout: Duration) -> Self {
        self.decision_timeout = Some(timeout);
        self
    }

    /// Set the polling period.
    pub fn poll_period(mut self, period: Duration) -> Self {
        self.poll_period = period;
        self
    }

    /// Set the settle delay before closing.
    pub fn settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    /// Set the closed and open barrier angles.
    pub fn angles(mut self, closed: u16, open: u16) -> Self {
        self.closed_angle = closed;
        self.open_angle = open;
        self
    }

    /// Set the sensor polarity.
    pub fn sensor_active_low(mut self, active_low: bool) -> Self {
        self.sensor_active_low = active_low;
        self
    }

    /// Effective decision timeout.
    #[must_use]
    pub fn decision_timeout(&self) -> Duration {
        self.decision_timeout
            .unwrap_or_else(|| self.binding.default_timeout())
    }

    /// Check every value against its accepted range.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` describing the first offending value.
    pub fn validate(&self) -> Result<()> {
        check_range("debounce", self.debounce, MIN_LOOP_TIMING_MS, MAX_LOOP_TIMING_MS)?;
        check_range(
            "poll period",
            self.poll_period,
            MIN_LOOP_TIMING_MS,
            MAX_LOOP_TIMING_MS,
        )?;
        check_range(
            "decision timeout",
            self.decision_timeout(),
            MIN_DECISION_TIMEOUT_MS,
            MAX_DECISION_TIMEOUT_MS,
        )?;

        if self.closed_angle > MAX_SERVO_ANGLE || self.open_angle > MAX_SERVO_ANGLE {
            return Err(Error::Config(format!(
                "servo angles must be 0-{MAX_SERVO_ANGLE}, got closed={} open={}",
                self.closed_angle, self.open_angle
            )));
        }
        if self.closed_angle == self.open_angle {
            return Err(Error::Config(
                "open and closed angles must differ".to_string(),
            ));
        }

        match &self.binding {
            VerificationBinding::Http { endpoint } => {
                if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
                    return Err(Error::Config(format!(
                        "endpoint must be an http(s) URL, got '{endpoint}'"
                    )));
                }
            }
            VerificationBinding::Serial { port, baud_rate } => {
                if port.is_empty() {
                    return Err(Error::MissingConfig(format!("{ENV_PREFIX}SERIAL_PORT")));
                }
                if *baud_rate == 0 {
                    return Err(Error::Config("baud rate must be positive".to_string()));
                }
            }
        }

        Ok(())
    }

    /// Load configuration from `GATEKEEPER_*` environment variables.
    ///
    /// Unset variables keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is set to an unparseable value or the
    /// resulting configuration fails [`validate`](Self::validate).
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    ///
    /// Keys are passed without the `GATEKEEPER_` prefix stripped, exactly as
    /// they would appear in the environment.
    ///
    /// # Errors
    ///
    /// Same as [`from_env`](Self::from_env).
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| {
            lookup(&format!("{ENV_PREFIX}{name}"))
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let mut config = Self::default();

        if let Some(v) = get("SENSOR_PIN") {
            config.sensor_pin = parse_number("SENSOR_PIN", &v)?;
        }
        if let Some(v) = get("SENSOR_ACTIVE_LOW") {
            config.sensor_active_low = parse_flag("SENSOR_ACTIVE_LOW", &v)?;
        }
        if let Some(v) = get("SERVO_PIN") {
            config.servo_pin = parse_number("SERVO_PIN", &v)?;
        }
        if let Some(v) = get("SERVO_CLOSED_ANGLE") {
            config.closed_angle = parse_number("SERVO_CLOSED_ANGLE", &v)?;
        }
        if let Some(v) = get("SERVO_OPEN_ANGLE") {
            config.open_angle = parse_number("SERVO_OPEN_ANGLE", &v)?;
        }
        if let Some(v) = get("DISPLAY_ADDRESS") {
            config.display_address = parse_address(&v)?;
        }

        config.binding = match get("BINDING").as_deref() {
            None | Some("http") => VerificationBinding::http(
                get("ENDPOINT").unwrap_or_else(|| DEFAULT_ENDPOINT.to_string()),
            ),
            Some("serial") => {
                let baud_rate = match get("SERIAL_BAUD") {
                    Some(v) => parse_number("SERIAL_BAUD", &v)?,
                    None => DEFAULT_SERIAL_BAUD,
                };
                VerificationBinding::serial(
                    get("SERIAL_PORT").unwrap_or_else(|| DEFAULT_SERIAL_PORT.to_string()),
                    baud_rate,
                )
            }
            Some(other) => {
                return Err(Error::Config(format!(
                    "unknown binding '{other}', expected 'http' or 'serial'"
                )));
            }
        };

        if let Some(v) = get("DEBOUNCE_MS") {
            config.debounce = Duration::from_millis(parse_number("DEBOUNCE_MS", &v)?);
        }
        if let Some(v) = get("DECISION_TIMEOUT_MS") {
            config.decision_timeout =
                Some(Duration::from_millis(parse_number("DECISION_TIMEOUT_MS", &v)?));
        }
        if let Some(v) = get("POLL_MS") {
            config.poll_period = Duration::from_millis(parse_number("POLL_MS", &v)?);
        }
        if let Some(v) = get("SETTLE_MS") {
            config.settle_delay = Duration::from_millis(parse_number("SETTLE_MS", &v)?);
        }

        config.validate()?;
        Ok(config)
    }
}

fn check_range(name: &str, value: Duration, min_ms: u64, max_ms: u64) -> Result<()> {
    let ms = value.as_millis();
    if ms < u128::from(min_ms) || ms > u128::from(max_ms) {
        return Err(Error::Config(format!(
            "{name} must be {min_ms}-{max_ms}ms, got {ms}ms"
        )));
    }
    Ok(())
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .parse()
        .map_err(|_| Error::Config(format!("{ENV_PREFIX}{key}: invalid number '{value}'")))
}

fn parse_flag(key: &str, value: &str) -> Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(Error::Config(format!(
            "{ENV_PREFIX}{key}: invalid flag '{value}'"
        ))),
    }
}

fn parse_address(value: &str) -> Result<u8> {
    let parsed = match value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
    {
        Some(hex) => u8::from_str_radix(hex, 16),
        None => value.parse(),
    };
    parsed.map_err(|_| {
        Error::Config(format!(
            "{ENV_PREFIX}DISPLAY_ADDRESS: invalid address '{value}'"
        ))
    })
}
