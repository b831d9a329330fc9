//! Enum wrappers for peripheral dispatch.
//!
//! Native `async fn` in traits is not object-safe, so `Box<dyn ServoDriver>`
//! is not an option. The binary picks a concrete variant at startup instead
//! and the controller stays generic over the trait.

use crate::console::{ConsolePanel, ConsoleServo};
use crate::mock::{MockPanel, MockServo};
use crate::traits::{DisplayPanel, ServoDriver};
use crate::{DeviceInfo, Result};

/// Any supported barrier servo.
///
/// # Examples
///
/// ```
/// use gatekeeper_hardware::devices::AnyServo;
/// use gatekeeper_hardware::console::ConsoleServo;
/// use gatekeeper_hardware::traits::ServoDriver;
///
/// #[tokio::main]
/// async fn main() -> gatekeeper_hardware::Result<()> {
///     let mut servo = AnyServo::Console(ConsoleServo::new(5));
///     servo.set_angle(0).await?;
///     Ok(())
/// }
/// ```
#[derive(Debug)]
#[non_exhaustive]
pub enum AnyServo {
    /// In-memory servo for tests.
    Mock(MockServo),
    /// Log-backed servo for bench runs.
    Console(ConsoleServo),
}

impl ServoDriver for AnyServo {
    async fn set_angle(&mut self, angle: u16) -> Result<()> {
        match self {
            Self::Mock(device) => device.set_angle(angle).await,
            Self::Console(device) => device.set_angle(angle).await,
        }
    }

    async fn get_info(&self) -> Result<DeviceInfo> {
        match self {
            Self::Mock(device) => device.get_info().await,
            Self::Console(device) => device.get_info().await,
        }
    }
}

/// Any supported status panel.
#[derive(Debug)]
#[non_exhaustive]
pub enum AnyPanel {
    /// In-memory panel for tests.
    Mock(MockPanel),
    /// Log-backed panel for bench runs.
    Console(ConsolePanel),
}

impl DisplayPanel for AnyPanel {
    async fn init(&mut self) -> Result<()> {
        match self {
            Self::Mock(device) => device.init().await,
            Self::Console(device) => device.init().await,
        }
    }

    async fn show(&mut self, lines: &[String]) -> Result<()> {
        match self {
            Self::Mock(device) => device.show(lines).await,
            Self::Console(device) => device.show(lines).await,
        }
    }

    async fn get_info(&self) -> Result<DeviceInfo> {
        match self {
            Self::Mock(device) => device.get_info().await,
            Self::Console(device) => device.get_info().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_any_servo_dispatches_to_mock() {
        let (servo, handle) = MockServo::new();
        let mut any = AnyServo::Mock(servo);

        any.set_angle(90).await.unwrap();
        assert_eq!(handle.commands(), vec![90]);
        assert_eq!(any.get_info().await.unwrap().model, "Mock Servo v1.0");
    }

    #[tokio::test]
    async fn test_any_panel_dispatches_to_mock() {
        let (panel, handle) = MockPanel::new();
        let mut any = AnyPanel::Mock(panel);

        any.init().await.unwrap();
        any.show(&["Ready".into()]).await.unwrap();
        assert_eq!(handle.last_frame(), Some(vec!["Ready".to_string()]));
    }
}
