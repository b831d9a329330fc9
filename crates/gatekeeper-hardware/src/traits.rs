//! Peripheral capability traits.
//!
//! The controller core never touches pins, PWM timers or I2C buses directly.
//! It sees three capabilities:
//!
//! - [`PresenceInput`]: one raw digital sample per call
//! - [`ServoDriver`]: move the barrier servo to an angle
//! - [`DisplayPanel`]: put a few lines of text on the status panel
//!
//! Driver internals (pixel rendering, PWM waveform generation, bus timing)
//! live behind these traits.
//!
//! All traits use native `async fn` methods (Rust 1.90 + Edition 2024 RPITIT).

#![allow(async_fn_in_trait)]

use crate::error::Result;
use crate::types::DeviceInfo;

/// Raw digital presence input.
///
/// # Object Safety
///
/// Like every trait in this module, `PresenceInput` uses `async fn` and is
/// therefore not object-safe. Use it as a generic parameter:
///
/// ```no_run
/// use gatekeeper_hardware::traits::PresenceInput;
/// use gatekeeper_hardware::Result;
///
/// async fn sample<S: PresenceInput>(sensor: &mut S) -> Result<bool> {
///     sensor.read_raw().await
/// }
/// ```
pub trait PresenceInput: Send {
    /// Read the current raw level of the input pin (`true` = high).
    ///
    /// # Errors
    ///
    /// Returns an error if the pin cannot be read.
    async fn read_raw(&mut self) -> Result<bool>;

    /// Get device information.
    async fn get_info(&self) -> Result<DeviceInfo>;
}

/// Largest angle a hobby servo accepts, in degrees.
pub const MAX_SERVO_ANGLE: u16 = 180;

/// Hobby servo that holds a commanded angle.
///
/// A command is fire-and-forget: the driver returns once the new pulse width
/// is programmed, not when the horn reaches the position.
pub trait ServoDriver: Send {
    /// Command the servo to `angle` degrees.
    ///
    /// # Errors
    ///
    /// Returns an error if the angle is out of range or the PWM output
    /// cannot be updated.
    async fn set_angle(&mut self, angle: u16) -> Result<()>;

    /// Get device information.
    async fn get_info(&self) -> Result<DeviceInfo>;
}

/// Small text panel (SSD1306-class OLED).
pub trait DisplayPanel: Send {
    /// Bring the panel up. Called once at startup.
    ///
    /// # Errors
    ///
    /// Returns an error if the panel does not answer on its bus.
    async fn init(&mut self) -> Result<()>;

    /// Replace the whole screen with `lines`, top to bottom.
    ///
    /// # Errors
    ///
    /// Returns an error if the frame cannot be transferred.
    async fn show(&mut self, lines: &[String]) -> Result<()>;

    /// Get device information.
    async fn get_info(&self) -> Result<DeviceInfo>;
}
