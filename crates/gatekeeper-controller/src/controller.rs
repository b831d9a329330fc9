//! The gate controller loop.
//!
//! ```text
//!            arrival                 grant
//!   Idle ─────────────> Checking ─────────────> Granted
//!    ^                     │                       │ departure
//!    │       deny/timeout  v                       v
//!    └─────────────────  Denied         Closing <──┘
//!    ^                                     │
//!    └─────────────────────────────────────┘
//! ```
//!
//! One verification attempt at a time. While it is in flight the sensor keeps
//! being polled on the loop period so the debouncer stays current; arrival
//! edges seen meanwhile are counted and dropped. The attempt is abandoned at
//! its deadline by dropping its future, so `Checking` always resolves within
//! the decision timeout.
//!
//! Peripheral and transport failures never leave this module as errors: the
//! barrier fails closed and the loop goes on. Only an illegal state
//! transition (a bug) is reported, and `run_until` recovers from it with a
//! reset.

use std::future::Future;
use std::time::Duration;

use gatekeeper_core::constants::STARTUP_SETTLE_MS;
use gatekeeper_core::{Decision, DenyReason, GateConfig, PresenceEdge, Result, VerificationRequest};
use gatekeeper_hardware::{DisplayPanel, PresenceInput, ServoDriver};
use gatekeeper_network::{TransportError, VerificationChannel};
use serde::{Deserialize, Serialize};
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::actuator::Actuator;
use crate::debounce::DebouncedSensor;
use crate::display::{Screen, StatusDisplay};
use crate::state_machine::{GateState, StateMachine};

/// Running counters, reset only on restart.
///
/// Every attempt ends in exactly one of `grants`, `denials`, `timeouts` or
/// `transport_failures`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControllerStats {
    pub attempts: u64,
    pub grants: u64,
    /// Explicit denies from the service.
    pub denials: u64,
    pub timeouts: u64,
    pub transport_failures: u64,
    /// Arrival edges dropped because an attempt was already in flight.
    pub ignored_arrivals: u64,
}

/// Owns the four gate components and sequences them.
#[derive(Debug)]
pub struct GateController<S, C, V, P> {
    sensor: DebouncedSensor<S>,
    channel: C,
    actuator: Actuator<V>,
    display: StatusDisplay<P>,
    machine: StateMachine,
    decision_timeout: Duration,
    poll_period: Duration,
    settle_delay: Duration,
    link_up: Option<bool>,
    stats: ControllerStats,
}

impl<S, C, V, P> GateController<S, C, V, P>
where
    S: PresenceInput,
    C: VerificationChannel,
    V: ServoDriver,
    P: DisplayPanel,
{
    /// Assemble a controller. Nothing touches the hardware until
    /// [`initialize`](Self::initialize).
    ///
    /// # Errors
    ///
    /// Returns an error if `config` fails validation.
    pub fn new(config: &GateConfig, sensor: S, channel: C, servo: V, panel: P) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            sensor: DebouncedSensor::new(sensor, config.debounce, config.sensor_active_low),
            channel,
            actuator: Actuator::new(servo, config.closed_angle, config.open_angle),
            display: StatusDisplay::new(panel),
            machine: StateMachine::new(),
            decision_timeout: config.decision_timeout(),
            poll_period: config.poll_period,
            settle_delay: config.settle_delay,
            link_up: None,
            stats: ControllerStats::default(),
        })
    }

    /// Startup sequence: welcome screen, barrier forced closed, settle, seed
    /// the sensor. The barrier's previous physical position is not trusted.
    pub async fn initialize(&mut self) {
        self.display.init().await;
        self.display.show(GateState::Idle, None).await;
        self.actuator.close().await;
        tokio::time::sleep(Duration::from_millis(STARTUP_SETTLE_MS)).await;
        self.sensor.initialize().await;
        self.refresh_link().await;

        info!(
            channel = self.channel.name(),
            timeout_ms = self.decision_timeout.as_millis() as u64,
            poll_ms = self.poll_period.as_millis() as u64,
            "Gate controller ready"
        );
    }

    /// One loop cycle: maintain the link, poll the sensor, act on an edge.
    ///
    /// An arrival in `Idle` runs the whole verification attempt before this
    /// returns; a departure in `Granted` runs the whole closing sequence.
    ///
    /// # Errors
    ///
    /// Only on an illegal state transition.
    pub async fn step(&mut self) -> Result<()> {
        self.refresh_link().await;

        let Some(edge) = self.sensor.poll().await else {
            return Ok(());
        };

        match (self.machine.current_state(), edge) {
            (GateState::Idle, PresenceEdge::Arrival) => self.verify().await,
            (GateState::Idle, PresenceEdge::Departure) => {
                // Release a held deny/timeout screen.
                if self.display.screen() != Some(&Screen::Welcome) {
                    self.display.show(GateState::Idle, None).await;
                }
                Ok(())
            }
            (GateState::Granted, PresenceEdge::Departure) => self.close_barrier().await,
            (state, edge) => {
                debug!(%state, %edge, "Edge ignored");
                Ok(())
            }
        }
    }

    /// Run cycles every poll period until `shutdown` resolves, then close
    /// the barrier. Returns the final statistics.
    pub async fn run_until<F>(&mut self, shutdown: F) -> ControllerStats
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let mut ticker = tokio::time::interval(self.poll_period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                () = &mut shutdown => break,
                _ = ticker.tick() => {
                    if let Err(e) = self.step().await {
                        error!(error = %e, "Controller fault, resetting");
                        self.reset().await;
                    }
                }
            }
        }

        self.actuator.close().await;
        info!(
            attempts = self.stats.attempts,
            grants = self.stats.grants,
            denials = self.stats.denials,
            timeouts = self.stats.timeouts,
            transport_failures = self.stats.transport_failures,
            ignored_arrivals = self.stats.ignored_arrivals,
            "Gate controller stopped"
        );
        self.stats
    }

    /// Force the initial condition: `Idle`, barrier closed, welcome screen.
    pub async fn reset(&mut self) {
        let transition = self.machine.reset();
        info!(from = %transition.from, "Controller reset");
        self.actuator.close().await;
        self.display.show(GateState::Idle, None).await;
    }

    pub fn state(&self) -> GateState {
        self.machine.current_state()
    }

    pub fn stats(&self) -> ControllerStats {
        self.stats
    }

    pub fn machine(&self) -> &StateMachine {
        &self.machine
    }

    pub fn display(&self) -> &StatusDisplay<P> {
        &self.display
    }

    pub fn actuator(&self) -> &Actuator<V> {
        &self.actuator
    }

    pub fn sensor(&self) -> &DebouncedSensor<S> {
        &self.sensor
    }

    pub fn channel(&self) -> &C {
        &self.channel
    }

    async fn refresh_link(&mut self) {
        let up = self.channel.maintain_link().await;
        if self.link_up != Some(up) {
            if up {
                info!(channel = self.channel.name(), "Verification link up");
            } else {
                warn!(channel = self.channel.name(), "Verification link down");
            }
            self.link_up = Some(up);
        }
    }

    async fn verify(&mut self) -> Result<()> {
        let request = VerificationRequest::new();
        self.machine.transition_to(GateState::Checking)?;
        self.machine.set_timeout(self.decision_timeout);
        self.display.show(GateState::Checking, None).await;
        self.stats.attempts += 1;
        info!(
            attempt_id = %request.attempt_id,
            channel = self.channel.name(),
            "Vehicle arrived, verifying"
        );

        let started = Instant::now();
        let decision = match self.await_decision(&request).await {
            Some(Ok(result)) => Decision::from_result(result),
            Some(Err(e)) if e.is_timeout() => Decision::timeout(),
            Some(Err(e)) => Decision::transport_failure(e.to_string()),
            None => {
                warn!(attempt_id = %request.attempt_id, "Decision deadline reached, abandoning attempt");
                Decision::timeout()
            }
        };

        self.apply_decision(&request, decision, started.elapsed()).await
    }

    /// Drive the channel until it answers or the timeout armed on the
    /// machine runs out, polling the sensor meanwhile. `None` means the
    /// deadline won.
    async fn await_decision(
        &mut self,
        request: &VerificationRequest,
    ) -> Option<std::result::Result<gatekeeper_core::VerificationResult, TransportError>> {
        let timeout = self.machine.time_remaining().unwrap_or_default();
        let now = Instant::now();
        let deadline = now + timeout;

        let attempt = self.channel.request_decision(request, timeout);
        tokio::pin!(attempt);
        let expiry = tokio::time::sleep_until(deadline);
        tokio::pin!(expiry);
        let mut ticker = tokio::time::interval_at(now + self.poll_period, self.poll_period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                result = &mut attempt => return Some(result),
                () = &mut expiry => return None,
                _ = ticker.tick() => match self.sensor.poll().await {
                    Some(PresenceEdge::Arrival) => {
                        self.stats.ignored_arrivals += 1;
                        debug!(attempt_id = %request.attempt_id, "Arrival ignored, attempt in flight");
                    }
                    Some(PresenceEdge::Departure) => {
                        debug!(attempt_id = %request.attempt_id, "Vehicle left during verification");
                    }
                    None => {}
                },
            }
        }
    }

    async fn apply_decision(
        &mut self,
        request: &VerificationRequest,
        decision: Decision,
        elapsed: Duration,
    ) -> Result<()> {
        let plate = decision.plate().map(str::to_string);
        let elapsed_ms = elapsed.as_millis() as u64;

        match decision {
            Decision::Granted { .. } => {
                self.machine.transition_to(GateState::Granted)?;
                self.actuator.open().await;
                self.display.show(GateState::Granted, plate.as_deref()).await;
                self.stats.grants += 1;
                info!(
                    attempt_id = %request.attempt_id,
                    plate = plate.as_deref().unwrap_or(""),
                    elapsed_ms,
                    "Access granted"
                );

                if !self.sensor.is_present() {
                    info!(attempt_id = %request.attempt_id, "Vehicle already gone, closing");
                    self.close_barrier().await?;
                }
            }
            Decision::Denied { reason, .. } => {
                self.machine.transition_to(GateState::Denied)?;
                let screen = match &reason {
                    DenyReason::Rejected => {
                        self.stats.denials += 1;
                        Screen::Deny { plate: plate.clone() }
                    }
                    DenyReason::Timeout => {
                        self.stats.timeouts += 1;
                        Screen::Timeout
                    }
                    DenyReason::Transport(_) => {
                        self.stats.transport_failures += 1;
                        Screen::Deny { plate: plate.clone() }
                    }
                };
                self.display.show_screen(screen).await;
                info!(
                    attempt_id = %request.attempt_id,
                    plate = plate.as_deref().unwrap_or(""),
                    %reason,
                    elapsed_ms,
                    "Access denied"
                );
                self.machine.transition_to(GateState::Idle)?;

                // The departure was consumed mid-attempt; nothing will release the screen.
                if !self.sensor.is_present() {
                    self.display.show(GateState::Idle, None).await;
                }
            }
        }
        Ok(())
    }

    /// Granted → Closing → Idle. No position feedback exists, so the
    /// sequence completes whether or not the servo accepted the command.
    async fn close_barrier(&mut self) -> Result<()> {
        self.machine.transition_to(GateState::Closing)?;
        self.display.show(GateState::Closing, None).await;
        tokio::time::sleep(self.settle_delay).await;
        self.actuator.close().await;

        self.machine.transition_to(GateState::Idle)?;
        self.display.show_screen(Screen::Ready).await;
        info!("Barrier closed");
        Ok(())
    }
}
