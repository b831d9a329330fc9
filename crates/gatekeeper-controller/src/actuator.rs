//! Barrier actuator.
//!
//! Two fixed positions, no feedback. A command is fire-and-forget: the
//! physical travel time is covered by the controller's settle delays, and a
//! failed command is logged without blocking the state machine.

use gatekeeper_hardware::ServoDriver;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Last commanded barrier position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BarrierPosition {
    Closed,
    Open,
}

/// Maps open/close onto two servo angles.
#[derive(Debug)]
pub struct Actuator<D> {
    driver: D,
    closed_angle: u16,
    open_angle: u16,
    position: Option<BarrierPosition>,
    failures: u64,
}

impl<D: ServoDriver> Actuator<D> {
    pub fn new(driver: D, closed_angle: u16, open_angle: u16) -> Self {
        Self {
            driver,
            closed_angle,
            open_angle,
            position: None,
            failures: 0,
        }
    }

    pub async fn open(&mut self) {
        self.command(BarrierPosition::Open).await;
    }

    pub async fn close(&mut self) {
        self.command(BarrierPosition::Closed).await;
    }

    /// Last commanded position; `None` before the first command. Reflects the
    /// intent even if the driver reported a failure.
    pub fn position(&self) -> Option<BarrierPosition> {
        self.position
    }

    /// Number of commands the driver rejected.
    pub fn failures(&self) -> u64 {
        self.failures
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    async fn command(&mut self, position: BarrierPosition) {
        let angle = match position {
            BarrierPosition::Closed => self.closed_angle,
            BarrierPosition::Open => self.open_angle,
        };
        self.position = Some(position);

        match self.driver.set_angle(angle).await {
            Ok(()) => info!(?position, angle, "Barrier commanded"),
            Err(e) => {
                self.failures += 1;
                warn!(?position, angle, error = %e, "Barrier command failed");
            }
        }
    }
}
