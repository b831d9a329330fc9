//! The verification capability shared by every transport.

#![allow(async_fn_in_trait)]

use std::time::Duration;

use gatekeeper_core::{VerificationRequest, VerificationResult};

use crate::error::Result;

/// Asks the external verification service whether a vehicle may enter.
///
/// Implementations perform one exchange per call and must give up on their
/// own once `timeout` has elapsed. The controller additionally drops the
/// future at its deadline, so implementations must be cancel-safe: no state
/// may be left half-updated across an `.await`.
///
/// # Examples
///
/// ```no_run
/// use gatekeeper_core::VerificationRequest;
/// use gatekeeper_network::{HttpChannel, VerificationChannel};
/// use std::time::Duration;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let mut channel = HttpChannel::new("http://192.168.1.20:8000/lpr")?;
/// let result = channel
///     .request_decision(&VerificationRequest::new(), Duration::from_secs(60))
///     .await?;
/// println!("granted: {}", result.granted);
/// # Ok(())
/// # }
/// ```
pub trait VerificationChannel: Send {
    /// Run one verification exchange.
    ///
    /// # Errors
    ///
    /// Returns a [`TransportError`](crate::TransportError) on link failure,
    /// malformed answer, or timeout. An explicit deny is `Ok` with
    /// `granted = false`.
    async fn request_decision(
        &mut self,
        request: &VerificationRequest,
        timeout: Duration,
    ) -> Result<VerificationResult>;

    /// Keep the underlying link up. Called once per loop cycle; must return
    /// quickly. Returns whether the link is currently usable.
    async fn maintain_link(&mut self) -> bool;

    /// Short transport name for logs.
    fn name(&self) -> &'static str;
}
