//! Verification transports for the Gatekeeper barrier controller.
//!
//! The controller asks one question per vehicle: may it enter? This crate
//! carries that question to the verification service over one of two
//! mutually exclusive bindings.
//!
//! # Components
//!
//! - **HttpChannel**: single GET to the recognition endpoint, JSON-ish answer
//! - **SerialChannel**: detection token out, `OK`/`NO` back, over a UART
//! - **AnyChannel**: picks one of the above from [`GateConfig`](gatekeeper_core::GateConfig)
//! - **mock**: scripted channel and in-memory serial link for tests
//!
//! Every failure surfaces as a [`TransportError`]; deciding what it means for
//! the barrier is left to the controller.

mod channel;
mod dispatch;
mod error;
mod http;
mod link;
pub mod mock;
mod serial;

pub use channel::VerificationChannel;
pub use dispatch::AnyChannel;
pub use error::{Result, TransportError};
pub use http::HttpChannel;
pub use link::{SerialLink, SerialPortLink};
pub use serial::SerialChannel;
