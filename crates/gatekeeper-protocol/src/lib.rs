//! Wire formats spoken with the verification service.
//!
//! Nothing here performs I/O. The network crate moves bytes; this crate turns
//! them into [`VerificationResult`](gatekeeper_core::VerificationResult)s or
//! grant/deny decisions.

pub mod error;
pub mod payload;
pub mod serial;

pub use error::{PayloadError, Result};
pub use payload::parse_payload;
pub use serial::{ReplyScanner, classify_prefix, detection_token};
