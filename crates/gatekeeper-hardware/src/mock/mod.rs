//! Mock peripheral implementations for testing and bench runs.
//!
//! Each mock is created together with a handle. The mock is moved into the
//! controller; the handle stays with the test and drives or inspects it.

pub mod panel;
pub mod sensor;
pub mod servo;

// Re-export commonly used types
pub use panel::{MockPanel, MockPanelHandle};
pub use sensor::{MockSensor, MockSensorHandle};
pub use servo::{MockServo, MockServoHandle};
