//! Gate state machine.
//!
//! Tracks which phase of the access flow the gate is in and rejects any
//! transition the flow does not allow. Every accepted transition is kept in a
//! bounded history for diagnostics.
//!
//! # States
//!
//! - `Idle`: barrier closed, waiting for a vehicle
//! - `Checking`: verification request in flight
//! - `Granted`: barrier open, waiting for the vehicle to pass
//! - `Denied`: momentary, display-only; immediately followed by `Idle`
//! - `Closing`: close commanded, about to return to `Idle`
//!
//! # Valid Transitions
//!
//! - Idle → Checking → Granted/Denied
//! - Granted → Closing → Idle
//! - Denied → Idle
//!
//! # Examples
//!
//! ```
//! use gatekeeper_controller::{GateState, StateMachine};
//!
//! let mut machine = StateMachine::new();
//! machine.transition_to(GateState::Checking).unwrap();
//! machine.transition_to(GateState::Denied).unwrap();
//! machine.transition_to(GateState::Idle).unwrap();
//!
//! assert!(machine.transition_to(GateState::Closing).is_err());
//! assert_eq!(machine.history().len(), 3);
//! ```

use std::collections::VecDeque;
use std::fmt;
use std::time::Duration;

use gatekeeper_core::constants::MAX_HISTORY_SIZE;
use gatekeeper_core::{Error, Result};
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

/// Phase of the access flow. Exactly one is active at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateState {
    Idle,
    Checking,
    Granted,
    Denied,
    Closing,
}

impl fmt::Display for GateState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            GateState::Idle => "Idle",
            GateState::Checking => "Checking",
            GateState::Granted => "Granted",
            GateState::Denied => "Denied",
            GateState::Closing => "Closing",
        };
        write!(f, "{name}")
    }
}

impl GateState {
    /// Whether the flow allows moving from `self` to `target`.
    pub fn can_transition_to(&self, target: &GateState) -> bool {
        matches!(
            (self, target),
            (GateState::Idle, GateState::Checking)
                | (GateState::Checking, GateState::Granted | GateState::Denied)
                | (GateState::Granted, GateState::Closing)
                | (GateState::Denied, GateState::Idle)
                | (GateState::Closing, GateState::Idle)
        )
    }

    /// Whether the barrier is commanded open in this state.
    pub fn barrier_open(&self) -> bool {
        matches!(self, GateState::Granted)
    }
}

/// Record of one accepted transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateTransition {
    pub from: GateState,
    pub to: GateState,

    /// Monotonic time of the transition (not serialized).
    #[serde(skip, default = "Instant::now")]
    pub timestamp: Instant,
}

impl StateTransition {
    pub fn new(from: GateState, to: GateState) -> Self {
        Self {
            from,
            to,
            timestamp: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.timestamp.elapsed()
    }
}

/// Transition-validating state holder with a bounded history.
#[derive(Debug)]
pub struct StateMachine {
    current_state: GateState,
    state_entered_at: Instant,
    history: VecDeque<StateTransition>,
    current_timeout: Option<Duration>,
}

impl StateMachine {
    /// Create a machine in `Idle`.
    pub fn new() -> Self {
        Self::builder().build()
    }

    pub fn builder() -> StateMachineBuilder {
        StateMachineBuilder::default()
    }

    pub fn current_state(&self) -> GateState {
        self.current_state
    }

    pub fn time_in_current_state(&self) -> Duration {
        self.state_entered_at.elapsed()
    }

    /// Arm a timeout for the current state. Cleared by the next transition.
    pub fn set_timeout(&mut self, timeout: Duration) {
        self.current_timeout = Some(timeout);
    }

    pub fn has_timed_out(&self) -> bool {
        self.current_timeout
            .is_some_and(|timeout| self.time_in_current_state() >= timeout)
    }

    /// Time left before the armed timeout, `None` if unarmed or overrun.
    pub fn time_remaining(&self) -> Option<Duration> {
        self.current_timeout
            .and_then(|timeout| timeout.checked_sub(self.time_in_current_state()))
    }

    pub fn history(&self) -> &VecDeque<StateTransition> {
        &self.history
    }

    /// Move to `new_state`.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidStateTransition` if the flow does not allow
    /// it; the machine is left unchanged.
    pub fn transition_to(&mut self, new_state: GateState) -> Result<StateTransition> {
        if !self.current_state.can_transition_to(&new_state) {
            return Err(Error::InvalidStateTransition {
                from: self.current_state.to_string(),
                to: new_state.to_string(),
            });
        }

        let transition = StateTransition::new(self.current_state, new_state);
        self.apply(transition.clone());
        Ok(transition)
    }

    /// Force the machine back to `Idle` from any state.
    pub fn reset(&mut self) -> StateTransition {
        let transition = StateTransition::new(self.current_state, GateState::Idle);
        self.apply(transition.clone());
        transition
    }

    fn apply(&mut self, transition: StateTransition) {
        self.current_state = transition.to;
        self.state_entered_at = transition.timestamp;
        self.current_timeout = None;

        self.history.push_back(transition);
        if self.history.len() > MAX_HISTORY_SIZE {
            self.history.pop_front();
        }
    }
}

impl Default for StateMachine {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug)]
pub struct StateMachineBuilder {
    initial_state: GateState,
    timeout: Option<Duration>,
}

impl StateMachineBuilder {
    pub fn with_initial_state(mut self, state: GateState) -> Self {
        self.initial_state = state;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn build(self) -> StateMachine {
        StateMachine {
            current_state: self.initial_state,
            state_entered_at: Instant::now(),
            history: VecDeque::with_capacity(MAX_HISTORY_SIZE),
            current_timeout: self.timeout,
        }
    }
}

impl Default for StateMachineBuilder {
    fn default() -> Self {
        Self {
            initial_state: GateState::Idle,
            timeout: None,
        }
    }
}
