//! Gate controller for the Gatekeeper barrier.
//!
//! Ties the presence sensor, the verification channel, the barrier servo and
//! the status panel together in a single cooperative loop.
//!
//! # Components
//!
//! - **debounce**: stable presence edges out of a chattering raw input
//! - **state_machine**: the access flow and its legal transitions
//! - **actuator**: open/close onto two servo angles
//! - **display**: status screens for the panel
//! - **controller**: the loop that sequences all of the above
//!
//! The barrier fails closed: only an explicit grant from the verification
//! service ever opens it.

pub mod actuator;
pub mod controller;
pub mod debounce;
pub mod display;
pub mod state_machine;

pub use actuator::{Actuator, BarrierPosition};
pub use controller::{ControllerStats, GateController};
pub use debounce::{DebouncedSensor, Debouncer};
pub use display::{Screen, StatusDisplay};
pub use state_machine::{GateState, StateMachine, StateMachineBuilder, StateTransition};
