//! Log-backed peripherals.
//!
//! Used by the bench binary when no real servo or panel is attached. Every
//! command becomes a structured `tracing` event instead of a PWM pulse or an
//! I2C transfer.

use tracing::info;

use crate::{
    HardwareError, Result,
    traits::{DisplayPanel, MAX_SERVO_ANGLE, ServoDriver},
    types::DeviceInfo,
};

/// Servo that logs each commanded angle.
#[derive(Debug, Clone)]
pub struct ConsoleServo {
    pin: u8,
    angle: Option<u16>,
}

impl ConsoleServo {
    /// Create a console servo labelled with the PWM pin it stands in for.
    pub fn new(pin: u8) -> Self {
        Self { pin, angle: None }
    }

    /// Last commanded angle, if any.
    pub fn angle(&self) -> Option<u16> {
        self.angle
    }
}

impl ServoDriver for ConsoleServo {
    async fn set_angle(&mut self, angle: u16) -> Result<()> {
        if angle > MAX_SERVO_ANGLE {
            return Err(HardwareError::invalid_command(format!(
                "angle {angle} exceeds {MAX_SERVO_ANGLE}"
            )));
        }
        info!(pin = self.pin, angle, "servo");
        self.angle = Some(angle);
        Ok(())
    }

    async fn get_info(&self) -> Result<DeviceInfo> {
        Ok(DeviceInfo::new("Console Servo", "tracing").with_location(format!("pwm {}", self.pin)))
    }
}

/// Text panel that logs each frame on one line, separated by `|`.
#[derive(Debug, Clone)]
pub struct ConsolePanel {
    address: u8,
    initialized: bool,
}

impl ConsolePanel {
    /// Create a console panel labelled with the I2C address it stands in for.
    pub fn new(address: u8) -> Self {
        Self {
            address,
            initialized: false,
        }
    }
}

impl DisplayPanel for ConsolePanel {
    async fn init(&mut self) -> Result<()> {
        info!(address = %format!("{:#04x}", self.address), "panel ready");
        self.initialized = true;
        Ok(())
    }

    async fn show(&mut self, lines: &[String]) -> Result<()> {
        if !self.initialized {
            return Err(HardwareError::disconnected("Console Panel"));
        }
        info!(frame = %lines.join(" | "), "panel");
        Ok(())
    }

    async fn get_info(&self) -> Result<DeviceInfo> {
        Ok(DeviceInfo::new("Console Panel", "tracing")
            .with_location(format!("i2c {:#04x}", self.address)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_console_servo_tracks_angle() {
        let mut servo = ConsoleServo::new(5);
        assert_eq!(servo.angle(), None);

        servo.set_angle(90).await.unwrap();
        assert_eq!(servo.angle(), Some(90));

        assert!(servo.set_angle(200).await.is_err());
        assert_eq!(servo.angle(), Some(90));
    }

    #[tokio::test]
    async fn test_console_panel_requires_init() {
        let mut panel = ConsolePanel::new(0x3C);
        assert!(panel.show(&["Welcome".into()]).await.is_err());

        panel.init().await.unwrap();
        assert!(panel.show(&["Welcome".into()]).await.is_ok());

        let info = panel.get_info().await.unwrap();
        assert_eq!(info.location.as_deref(), Some("i2c 0x3c"));
    }
}
