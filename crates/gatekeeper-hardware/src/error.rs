//! Error types for peripheral operations.
//!
//! Peripheral failures never stop the gate: the controller logs them and keeps
//! going. These types exist so the log says what went wrong.

/// Result type alias for hardware operations.
pub type Result<T> = std::result::Result<T, HardwareError>;

/// Errors that can occur while driving a peripheral.
#[derive(Debug, thiserror::Error)]
pub enum HardwareError {
    /// Device is not connected or has been disconnected.
    #[error("Device disconnected: {device}")]
    Disconnected { device: String },

    /// Device communication error (bus NAK, short write).
    #[error("Communication error: {message}")]
    CommunicationError { message: String },

    /// A command outside the device's range.
    #[error("Invalid command: {message}")]
    InvalidCommand { message: String },

    /// Device initialization failed.
    #[error("Initialization failed: {message}")]
    InitializationFailed { message: String },

    /// Generic I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl HardwareError {
    /// Create a new disconnected error.
    pub fn disconnected(device: impl Into<String>) -> Self {
        Self::Disconnected {
            device: device.into(),
        }
    }

    /// Create a new communication error.
    pub fn communication(message: impl Into<String>) -> Self {
        Self::CommunicationError {
            message: message.into(),
        }
    }

    /// Create a new invalid command error.
    pub fn invalid_command(message: impl Into<String>) -> Self {
        Self::InvalidCommand {
            message: message.into(),
        }
    }

    /// Create a new initialization failed error.
    pub fn initialization_failed(message: impl Into<String>) -> Self {
        Self::InitializationFailed {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disconnected_error() {
        let error = HardwareError::disconnected("SSD1306");
        assert!(matches!(error, HardwareError::Disconnected { .. }));
        assert_eq!(error.to_string(), "Device disconnected: SSD1306");
    }

    #[test]
    fn test_communication_error() {
        let error = HardwareError::communication("I2C NAK at 0x3C");
        assert_eq!(error.to_string(), "Communication error: I2C NAK at 0x3C");
    }

    #[test]
    fn test_invalid_command_error() {
        let error = HardwareError::invalid_command("angle 270 out of range");
        assert_eq!(error.to_string(), "Invalid command: angle 270 out of range");
    }

    #[test]
    fn test_initialization_failed_error() {
        let error = HardwareError::initialization_failed("panel did not answer");
        assert_eq!(
            error.to_string(),
            "Initialization failed: panel did not answer"
        );
    }
}
