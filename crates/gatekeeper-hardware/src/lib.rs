//! Peripheral abstraction layer for the Gatekeeper barrier controller.
//!
//! The gate talks to three peripherals: a digital presence sensor, a hobby
//! servo that lifts the barrier, and a small text panel. This crate defines
//! one async trait per peripheral so the controller can be driven by real
//! drivers, by log-backed stand-ins on a bench, or by mocks in tests.
//!
//! # Peripheral Traits
//!
//! ```no_run
//! use gatekeeper_hardware::traits::{DisplayPanel, PresenceInput, ServoDriver};
//! use gatekeeper_hardware::Result;
//!
//! async fn open_when_present<S, V, P>(sensor: &mut S, servo: &mut V, panel: &mut P) -> Result<()>
//! where
//!     S: PresenceInput,
//!     V: ServoDriver,
//!     P: DisplayPanel,
//! {
//!     if !sensor.read_raw().await? {
//!         servo.set_angle(90).await?;
//!         panel.show(&["ACCEPT".to_string()]).await?;
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Error Handling
//!
//! All operations return [`Result<T>`][error::Result] with a
//! [`HardwareError`]. The controller treats actuator and panel errors as
//! non-fatal: they are logged and the state machine keeps running.
//!
//! # Implementations
//!
//! - [`mock`]: in-memory peripherals with inspection handles
//! - [`console`]: peripherals that emit `tracing` events
//! - [`devices`]: enum wrappers for picking one at runtime

pub mod console;
pub mod devices;
pub mod error;
pub mod mock;
pub mod traits;
pub mod types;

pub use error::{HardwareError, Result};
pub use traits::{DisplayPanel, MAX_SERVO_ANGLE, PresenceInput, ServoDriver};
pub use types::DeviceInfo;
