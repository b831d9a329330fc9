//! Status display.
//!
//! Turns controller states into a few short lines for a small OLED panel.
//! Pure presentation: a panel that fails to init or to render is logged and
//! otherwise ignored, it never holds up the gate.
//!
//! # Screens
//!
//! ```text
//! Welcome      CAR          ACCEPT       DENY         Timeout
//!
//!              checking     29A12345     29A12345
//! ```
//!
//! # Character set
//!
//! The panel font is ASCII. Control characters are stripped and lines are
//! cut at the panel width; plate text from the service goes through the same
//! filter.

use gatekeeper_core::constants::{
    DISPLAY_COLUMNS, DISPLAY_LINES, MSG_ACCEPT, MSG_CAR, MSG_CHECKING, MSG_CLOSING, MSG_DENY,
    MSG_READY, MSG_TIMEOUT, MSG_WELCOME,
};
use gatekeeper_core::{Error, Result};
use gatekeeper_hardware::DisplayPanel;
use tracing::{debug, info, warn};

use crate::state_machine::GateState;

/// One full-screen message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Screen {
    Welcome,
    Checking,
    Accept { plate: Option<String> },
    Deny { plate: Option<String> },
    Timeout,
    Closing,
    Ready,
}

impl Screen {
    /// Default screen for a controller state.
    pub fn for_state(state: GateState, plate: Option<&str>) -> Self {
        let plate = plate.map(str::to_string);
        match state {
            GateState::Idle => Screen::Welcome,
            GateState::Checking => Screen::Checking,
            GateState::Granted => Screen::Accept { plate },
            GateState::Denied => Screen::Deny { plate },
            GateState::Closing => Screen::Closing,
        }
    }

    /// Unformatted text lines, top to bottom.
    pub fn text(&self) -> Vec<String> {
        let with_plate = |title: &str, plate: &Option<String>| {
            vec![
                title.to_string(),
                String::new(),
                plate.clone().unwrap_or_default(),
            ]
        };
        match self {
            Screen::Welcome => vec![MSG_WELCOME.to_string()],
            Screen::Checking => vec![MSG_CAR.to_string(), String::new(), MSG_CHECKING.to_string()],
            Screen::Accept { plate } => with_plate(MSG_ACCEPT, plate),
            Screen::Deny { plate } => with_plate(MSG_DENY, plate),
            Screen::Timeout => vec![MSG_TIMEOUT.to_string()],
            Screen::Closing => vec![MSG_CLOSING.to_string()],
            Screen::Ready => vec![MSG_READY.to_string()],
        }
    }
}

/// Renders [`Screen`]s onto a [`DisplayPanel`].
#[derive(Debug)]
pub struct StatusDisplay<P> {
    panel: P,
    max_lines: usize,
    columns: usize,
    lines: Vec<String>,
    screen: Option<Screen>,
    panel_ok: bool,
}

impl<P: DisplayPanel> StatusDisplay<P> {
    /// Display sized for the default panel.
    pub fn new(panel: P) -> Self {
        Self::with_size(panel, DISPLAY_LINES, DISPLAY_COLUMNS)
    }

    pub fn with_size(panel: P, max_lines: usize, columns: usize) -> Self {
        Self {
            panel,
            max_lines,
            columns,
            lines: Vec::new(),
            screen: None,
            panel_ok: false,
        }
    }

    /// Bring the panel up. Failure is logged; rendering is still attempted
    /// on every update in case the panel recovers.
    pub async fn init(&mut self) {
        match self.panel.init().await {
            Ok(()) => {
                self.panel_ok = true;
                if let Ok(info) = self.panel.get_info().await {
                    info!(panel = %info, "Status display ready");
                }
            }
            Err(e) => warn!(error = %e, "Status display init failed"),
        }
    }

    /// Show the default screen for `state`.
    pub async fn show(&mut self, state: GateState, plate: Option<&str>) {
        self.show_screen(Screen::for_state(state, plate)).await;
    }

    /// Show `screen`.
    pub async fn show_screen(&mut self, screen: Screen) {
        self.lines = screen
            .text()
            .iter()
            .take(self.max_lines)
            .map(|line| truncate_text(&sanitize_text(line), self.columns))
            .collect();
        debug!(?screen, "Display update");
        self.screen = Some(screen);

        match self.panel.show(&self.lines).await {
            Ok(()) => {
                if !self.panel_ok {
                    info!("Status display recovered");
                    self.panel_ok = true;
                }
            }
            Err(e) => {
                if self.panel_ok {
                    warn!(error = %e, "Status display render failed");
                    self.panel_ok = false;
                }
            }
        }
    }

    /// Lines of the current screen as rendered.
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// A single rendered line.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidLine` if `index` is past the panel height.
    /// Lines the current screen leaves blank read as `""`.
    pub fn line(&self, index: usize) -> Result<&str> {
        if index >= self.max_lines {
            return Err(Error::InvalidLine {
                line: index,
                max: self.max_lines,
            });
        }
        Ok(self.lines.get(index).map_or("", String::as_str))
    }

    pub fn screen(&self) -> Option<&Screen> {
        self.screen.as_ref()
    }

    /// Whether the last panel operation succeeded.
    pub fn panel_ok(&self) -> bool {
        self.panel_ok
    }
}

/// Truncate text to at most `max_chars` characters.
///
/// ```
/// use gatekeeper_controller::display::truncate_text;
///
/// assert_eq!(truncate_text("29A1234567890", 10), "29A1234567");
/// assert_eq!(truncate_text("DENY", 10), "DENY");
/// ```
pub fn truncate_text(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

/// Keep printable ASCII only and trim surrounding spaces.
fn sanitize_text(text: &str) -> String {
    text.chars()
        .filter(|c| c.is_ascii() && !c.is_ascii_control())
        .collect::<String>()
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use gatekeeper_hardware::mock::MockPanel;
    use rstest::rstest;

    async fn display() -> (StatusDisplay<MockPanel>, gatekeeper_hardware::mock::MockPanelHandle) {
        let (panel, handle) = MockPanel::new();
        let mut display = StatusDisplay::new(panel);
        display.init().await;
        (display, handle)
    }

    #[rstest]
    #[case(GateState::Idle, None, vec!["Welcome"])]
    #[case(GateState::Checking, None, vec!["CAR", "", "checking"])]
    #[case(GateState::Granted, Some("29A12345"), vec!["ACCEPT", "", "29A12345"])]
    #[case(GateState::Denied, Some("51F00001"), vec!["DENY", "", "51F00001"])]
    #[case(GateState::Denied, None, vec!["DENY", "", ""])]
    #[case(GateState::Closing, None, vec!["Closing"])]
    #[tokio::test]
    async fn test_state_screens(
        #[case] state: GateState,
        #[case] plate: Option<&str>,
        #[case] expected: Vec<&str>,
    ) {
        let (mut display, handle) = display().await;
        display.show(state, plate).await;

        assert_eq!(display.lines(), expected.as_slice());
        assert_eq!(
            handle.last_frame().unwrap(),
            expected.iter().map(|s| s.to_string()).collect::<Vec<_>>()
        );
    }

    #[tokio::test]
    async fn test_plate_is_sanitized_and_truncated() {
        let (mut display, _handle) = display().await;
        display
            .show_screen(Screen::Accept {
                plate: Some("  29A\u{7}12345678999\n".to_string()),
            })
            .await;

        assert_eq!(display.line(2).unwrap(), "29A1234567");
    }

    #[tokio::test]
    async fn test_non_ascii_is_dropped() {
        let (mut display, _handle) = display().await;
        display
            .show_screen(Screen::Deny {
                plate: Some("51F·000€01".to_string()),
            })
            .await;

        assert_eq!(display.line(2).unwrap(), "51F00001");
    }

    #[tokio::test]
    async fn test_line_bounds() {
        let (mut display, _handle) = display().await;
        display.show_screen(Screen::Timeout).await;

        assert_eq!(display.line(0).unwrap(), "Timeout");
        assert_eq!(display.line(3).unwrap(), "");
        assert!(matches!(
            display.line(4),
            Err(Error::InvalidLine { line: 4, max: 4 })
        ));
    }

    #[tokio::test]
    async fn test_panel_failure_is_not_fatal() {
        let (panel, handle) = MockPanel::new();
        handle.set_failing(true);
        let mut display = StatusDisplay::new(panel);

        display.init().await;
        display.show_screen(Screen::Ready).await;
        assert!(!display.panel_ok());
        assert_eq!(display.lines(), ["Ready".to_string()]);
        assert_eq!(display.screen(), Some(&Screen::Ready));

        handle.set_failing(false);
        display.init().await;
        display.show_screen(Screen::Welcome).await;
        assert!(display.panel_ok());
        assert_eq!(handle.last_frame().unwrap(), vec!["Welcome".to_string()]);
    }
}
