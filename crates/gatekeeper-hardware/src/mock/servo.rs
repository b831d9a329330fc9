//! Mock barrier servo.
//!
//! Records every commanded angle so tests can assert on the exact sequence of
//! open/close commands.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crate::{
    HardwareError, Result,
    traits::{MAX_SERVO_ANGLE, ServoDriver},
    types::DeviceInfo,
};

/// Mock servo for testing and development.
///
/// # Examples
///
/// ```
/// use gatekeeper_hardware::mock::MockServo;
/// use gatekeeper_hardware::traits::ServoDriver;
///
/// #[tokio::main]
/// async fn main() -> gatekeeper_hardware::Result<()> {
///     let (mut servo, handle) = MockServo::new();
///     servo.set_angle(90).await?;
///     servo.set_angle(0).await?;
///
///     assert_eq!(handle.commands(), vec![90, 0]);
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct MockServo {
    commands: Arc<Mutex<Vec<u16>>>,
    failing: Arc<AtomicBool>,
    name: String,
}

impl MockServo {
    /// Create a new mock servo with the default name.
    pub fn new() -> (Self, MockServoHandle) {
        Self::with_name("Mock Servo".to_string())
    }

    /// Create a new mock servo with a custom name.
    pub fn with_name(name: String) -> (Self, MockServoHandle) {
        let commands = Arc::new(Mutex::new(Vec::new()));
        let failing = Arc::new(AtomicBool::new(false));

        let servo = Self {
            commands: Arc::clone(&commands),
            failing: Arc::clone(&failing),
            name,
        };
        let handle = MockServoHandle { commands, failing };

        (servo, handle)
    }
}

impl Default for MockServo {
    fn default() -> Self {
        Self::new().0
    }
}

impl ServoDriver for MockServo {
    async fn set_angle(&mut self, angle: u16) -> Result<()> {
        if angle > MAX_SERVO_ANGLE {
            return Err(HardwareError::invalid_command(format!(
                "angle {angle} exceeds {MAX_SERVO_ANGLE}"
            )));
        }
        if self.failing.load(Ordering::Relaxed) {
            return Err(HardwareError::communication("simulated PWM fault"));
        }
        self.commands
            .lock()
            .map_err(|_| HardwareError::communication("command log poisoned"))?
            .push(angle);
        Ok(())
    }

    async fn get_info(&self) -> Result<DeviceInfo> {
        Ok(DeviceInfo::new(self.name.clone(), "Mock Servo v1.0"))
    }
}

/// Handle for inspecting a mock servo.
#[derive(Debug, Clone)]
pub struct MockServoHandle {
    commands: Arc<Mutex<Vec<u16>>>,
    failing: Arc<AtomicBool>,
}

impl MockServoHandle {
    /// Every angle accepted so far, oldest first.
    pub fn commands(&self) -> Vec<u16> {
        self.commands.lock().map(|c| c.clone()).unwrap_or_default()
    }

    /// Most recently accepted angle.
    pub fn last_angle(&self) -> Option<u16> {
        self.commands.lock().ok().and_then(|c| c.last().copied())
    }

    /// Number of times `angle` was commanded.
    pub fn count(&self, angle: u16) -> usize {
        self.commands
            .lock()
            .map(|c| c.iter().filter(|&&a| a == angle).count())
            .unwrap_or(0)
    }

    /// Make subsequent commands fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::Relaxed);
    }
}
