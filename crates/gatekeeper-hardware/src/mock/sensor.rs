//! Mock presence input.
//!
//! The raw level is published through a `watch` channel so that a test (or
//! the stdin feeder of the bench binary) can flip it at any time while the
//! controller owns the sensor.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use tokio::sync::watch;

use crate::{HardwareError, Result, traits::PresenceInput, types::DeviceInfo};

/// Mock presence input for testing and development.
///
/// # Examples
///
/// ```
/// use gatekeeper_hardware::mock::MockSensor;
/// use gatekeeper_hardware::traits::PresenceInput;
///
/// #[tokio::main]
/// async fn main() -> gatekeeper_hardware::Result<()> {
///     let (mut sensor, handle) = MockSensor::new(true);
///     assert!(sensor.read_raw().await?);
///
///     handle.set_level(false);
///     assert!(!sensor.read_raw().await?);
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct MockSensor {
    level_rx: watch::Receiver<bool>,
    failing: Arc<AtomicBool>,
    reads: Arc<AtomicUsize>,
    name: String,
}

impl MockSensor {
    /// Create a mock input whose raw level starts at `initial_level`.
    pub fn new(initial_level: bool) -> (Self, MockSensorHandle) {
        Self::with_name("Mock Sensor".to_string(), initial_level)
    }

    /// Create a mock input with a custom name.
    pub fn with_name(name: String, initial_level: bool) -> (Self, MockSensorHandle) {
        let (level_tx, level_rx) = watch::channel(initial_level);
        let failing = Arc::new(AtomicBool::new(false));
        let reads = Arc::new(AtomicUsize::new(0));

        let sensor = Self {
            level_rx,
            failing: Arc::clone(&failing),
            reads: Arc::clone(&reads),
            name,
        };
        let handle = MockSensorHandle {
            level_tx: Arc::new(level_tx),
            failing,
            reads,
        };

        (sensor, handle)
    }
}

impl PresenceInput for MockSensor {
    async fn read_raw(&mut self) -> Result<bool> {
        self.reads.fetch_add(1, Ordering::Relaxed);
        if self.failing.load(Ordering::Relaxed) {
            return Err(HardwareError::communication("simulated read fault"));
        }
        Ok(*self.level_rx.borrow())
    }

    async fn get_info(&self) -> Result<DeviceInfo> {
        Ok(DeviceInfo::new(self.name.clone(), "Mock Sensor v1.0"))
    }
}

/// Handle for driving a mock presence input.
#[derive(Debug, Clone)]
pub struct MockSensorHandle {
    level_tx: Arc<watch::Sender<bool>>,
    failing: Arc<AtomicBool>,
    reads: Arc<AtomicUsize>,
}

impl MockSensorHandle {
    /// Set the raw level seen by the next read.
    pub fn set_level(&self, level: bool) {
        self.level_tx.send_replace(level);
    }

    /// Current raw level.
    pub fn level(&self) -> bool {
        *self.level_tx.borrow()
    }

    /// Make subsequent reads fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::Relaxed);
    }

    /// Number of reads performed so far.
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::Relaxed)
    }
}
