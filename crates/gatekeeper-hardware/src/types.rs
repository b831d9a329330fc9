//! Common types shared across peripheral implementations.

use serde::{Deserialize, Serialize};

/// Generic device information.
///
/// Logged once at startup so the field log shows which drivers are wired in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    /// Device name (e.g., "LM393", "SG90").
    pub name: String,

    /// Device model or driver identifier.
    pub model: String,

    /// Bus location (pin number, I2C address), when meaningful.
    pub location: Option<String>,
}

impl DeviceInfo {
    /// Create a new DeviceInfo with required fields.
    pub fn new(name: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            model: model.into(),
            location: None,
        }
    }

    /// Set the bus location.
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }
}

impl std::fmt::Display for DeviceInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.location {
            Some(location) => write!(f, "{} ({}) @ {}", self.name, self.model, location),
            None => write!(f, "{} ({})", self.name, self.model),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_info_display() {
        let info = DeviceInfo::new("SSD1306", "128x64 OLED").with_location("i2c 0x3C");
        assert_eq!(info.to_string(), "SSD1306 (128x64 OLED) @ i2c 0x3C");

        let bare = DeviceInfo::new("SG90", "servo");
        assert_eq!(bare.to_string(), "SG90 (servo)");
    }

    #[test]
    fn test_device_info_serialization() {
        let info = DeviceInfo::new("LM393", "comparator").with_location("gpio 4");
        let json = serde_json::to_string(&info).unwrap();
        let back: DeviceInfo = serde_json::from_str(&json).unwrap();
        assert_eq!(back, info);
    }
}
