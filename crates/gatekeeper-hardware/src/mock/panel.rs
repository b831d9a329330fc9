//! Mock status panel.
//!
//! Keeps every frame it was asked to show. Init and show failures can be
//! injected to check that a broken panel never blocks the gate.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crate::{HardwareError, Result, traits::DisplayPanel, types::DeviceInfo};

/// Mock text panel for testing and development.
///
/// # Examples
///
/// ```
/// use gatekeeper_hardware::mock::MockPanel;
/// use gatekeeper_hardware::traits::DisplayPanel;
///
/// #[tokio::main]
/// async fn main() -> gatekeeper_hardware::Result<()> {
///     let (mut panel, handle) = MockPanel::new();
///     panel.init().await?;
///     panel.show(&["Welcome".to_string()]).await?;
///
///     assert_eq!(handle.last_frame().unwrap(), vec!["Welcome".to_string()]);
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct MockPanel {
    state: Arc<Mutex<PanelState>>,
    failing: Arc<AtomicBool>,
    name: String,
}

#[derive(Debug, Default)]
struct PanelState {
    initialized: bool,
    frames: Vec<Vec<String>>,
}

impl MockPanel {
    /// Create a new mock panel with the default name.
    pub fn new() -> (Self, MockPanelHandle) {
        Self::with_name("Mock Panel".to_string())
    }

    /// Create a new mock panel with a custom name.
    pub fn with_name(name: String) -> (Self, MockPanelHandle) {
        let state = Arc::new(Mutex::new(PanelState::default()));
        let failing = Arc::new(AtomicBool::new(false));

        let panel = Self {
            state: Arc::clone(&state),
            failing: Arc::clone(&failing),
            name,
        };
        let handle = MockPanelHandle { state, failing };

        (panel, handle)
    }

    fn check_failing(&self) -> Result<()> {
        if self.failing.load(Ordering::Relaxed) {
            return Err(HardwareError::communication("simulated I2C NAK"));
        }
        Ok(())
    }
}

impl Default for MockPanel {
    fn default() -> Self {
        Self::new().0
    }
}

impl DisplayPanel for MockPanel {
    async fn init(&mut self) -> Result<()> {
        self.check_failing()?;
        self.state
            .lock()
            .map_err(|_| HardwareError::communication("panel state poisoned"))?
            .initialized = true;
        Ok(())
    }

    async fn show(&mut self, lines: &[String]) -> Result<()> {
        self.check_failing()?;
        let mut state = self
            .state
            .lock()
            .map_err(|_| HardwareError::communication("panel state poisoned"))?;
        if !state.initialized {
            return Err(HardwareError::disconnected(self.name.clone()));
        }
        state.frames.push(lines.to_vec());
        Ok(())
    }

    async fn get_info(&self) -> Result<DeviceInfo> {
        Ok(DeviceInfo::new(self.name.clone(), "Mock Panel v1.0"))
    }
}

/// Handle for inspecting a mock panel.
#[derive(Debug, Clone)]
pub struct MockPanelHandle {
    state: Arc<Mutex<PanelState>>,
    failing: Arc<AtomicBool>,
}

impl MockPanelHandle {
    /// Every frame shown so far, oldest first.
    pub fn frames(&self) -> Vec<Vec<String>> {
        self.state
            .lock()
            .map(|s| s.frames.clone())
            .unwrap_or_default()
    }

    /// The frame currently on screen.
    pub fn last_frame(&self) -> Option<Vec<String>> {
        self.state.lock().ok().and_then(|s| s.frames.last().cloned())
    }

    /// Whether any shown frame contains `text` on some line.
    pub fn has_shown(&self, text: &str) -> bool {
        self.frames()
            .iter()
            .any(|frame| frame.iter().any(|line| line.contains(text)))
    }

    /// Whether `init` succeeded.
    pub fn is_initialized(&self) -> bool {
        self.state.lock().map(|s| s.initialized).unwrap_or(false)
    }

    /// Make subsequent init/show calls fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_panel_records_frames() {
        let (mut panel, handle) = MockPanel::new();
        panel.init().await.unwrap();

        panel.show(&["CAR".into(), "".into()]).await.unwrap();
        panel.show(&["ACCEPT".into()]).await.unwrap();

        assert_eq!(handle.frames().len(), 2);
        assert_eq!(handle.last_frame().unwrap(), vec!["ACCEPT".to_string()]);
        assert!(handle.has_shown("CAR"));
        assert!(!handle.has_shown("DENY"));
    }

    #[tokio::test]
    async fn test_mock_panel_requires_init() {
        let (mut panel, handle) = MockPanel::new();

        let result = panel.show(&["Welcome".into()]).await;
        assert!(matches!(result, Err(HardwareError::Disconnected { .. })));
        assert!(!handle.is_initialized());
    }

    #[tokio::test]
    async fn test_mock_panel_failure() {
        let (mut panel, handle) = MockPanel::new();

        handle.set_failing(true);
        assert!(panel.init().await.is_err());

        handle.set_failing(false);
        panel.init().await.unwrap();
        assert!(handle.is_initialized());
    }
}
