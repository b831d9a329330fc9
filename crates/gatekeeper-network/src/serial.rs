//! Serial binding of the verification channel.
//!
//! The gate controller only announces the vehicle; a companion device runs
//! recognition and answers with a two-byte verdict.
//!
//! # Exchange
//!
//! 1. Flush stale inbound bytes, so an old reply cannot decide this attempt.
//! 2. Write the detection token, up to [`SERIAL_TX_ATTEMPTS`] times with
//!    [`SERIAL_TX_BACKOFF_MS`] between tries, until the write succeeds.
//! 3. Poll the link in [`SERIAL_RX_POLL_MS`] slices, feeding a
//!    [`ReplyScanner`], until `OK`/`NO` arrives or the window closes.
//!
//! The decision window is measured from the start of the call, which the
//! controller issues on the arrival edge.

use std::time::Duration;

use gatekeeper_core::constants::{SERIAL_RX_POLL_MS, SERIAL_TX_ATTEMPTS, SERIAL_TX_BACKOFF_MS};
use gatekeeper_core::{VerificationRequest, VerificationResult};
use gatekeeper_protocol::{ReplyScanner, detection_token};
use tokio::time::Instant;
use tracing::{debug, info, trace, warn};

use crate::channel::VerificationChannel;
use crate::error::{Result, TransportError};
use crate::link::SerialLink;

const READ_CHUNK: usize = 64;

/// Verification over a token/reply serial exchange.
#[derive(Debug)]
pub struct SerialChannel<L> {
    link: L,
    reconnect_interval: Duration,
    last_reconnect: Option<Instant>,
    was_open: bool,
}

impl<L: SerialLink> SerialChannel<L> {
    /// Wrap `link`. Reconnection is attempted at most once per
    /// `reconnect_interval`.
    pub fn new(link: L, reconnect_interval: Duration) -> Self {
        let was_open = link.is_open();
        Self {
            link,
            reconnect_interval,
            last_reconnect: None,
            was_open,
        }
    }

    pub fn link(&self) -> &L {
        &self.link
    }

    async fn transmit(&mut self, request: &VerificationRequest) -> Result<()> {
        let token = detection_token();
        for attempt in 1..=SERIAL_TX_ATTEMPTS {
            match self.link.write_all(token).await {
                Ok(()) => {
                    debug!(attempt_id = %request.attempt_id, attempt, "Detection token sent");
                    return Ok(());
                }
                Err(e) => {
                    warn!(attempt_id = %request.attempt_id, attempt, error = %e, "Token write failed");
                    if attempt < SERIAL_TX_ATTEMPTS {
                        tokio::time::sleep(Duration::from_millis(SERIAL_TX_BACKOFF_MS)).await;
                    }
                }
            }
        }
        Err(TransportError::WriteFailed {
            attempts: SERIAL_TX_ATTEMPTS,
        })
    }

    async fn await_reply(
        &mut self,
        request: &VerificationRequest,
        deadline: Instant,
        timeout: Duration,
    ) -> Result<VerificationResult> {
        let mut scanner = ReplyScanner::new();
        let mut buf = [0u8; READ_CHUNK];
        let poll = Duration::from_millis(SERIAL_RX_POLL_MS);

        loop {
            let now = Instant::now();
            if now >= deadline {
                return Err(TransportError::timeout(timeout));
            }
            let slice = poll.min(deadline - now);

            let n = self.link.read(&mut buf, slice).await?;
            if n == 0 {
                continue;
            }
            trace!(attempt_id = %request.attempt_id, bytes = n, "Reply bytes");

            if let Some(granted) = scanner.feed(&buf[..n]) {
                if scanner.ignored() > 0 {
                    debug!(
                        attempt_id = %request.attempt_id,
                        ignored = scanner.ignored(),
                        "Skipped non-decisive replies"
                    );
                }
                return Ok(if granted {
                    VerificationResult::granted(None)
                } else {
                    VerificationResult::denied(None)
                });
            }
        }
    }
}

impl<L: SerialLink> VerificationChannel for SerialChannel<L> {
    async fn request_decision(
        &mut self,
        request: &VerificationRequest,
        timeout: Duration,
    ) -> Result<VerificationResult> {
        let deadline = Instant::now() + timeout;
        info!(
            attempt_id = %request.attempt_id,
            timeout_ms = timeout.as_millis() as u64,
            "Announcing vehicle on serial link"
        );

        if !self.link.is_open() {
            return Err(TransportError::NotConnected("serial link down".to_string()));
        }

        if let Err(e) = self.link.clear_input().await {
            warn!(attempt_id = %request.attempt_id, error = %e, "Could not flush inbound bytes");
        }

        self.transmit(request).await?;
        self.await_reply(request, deadline, timeout).await
    }

    async fn maintain_link(&mut self) -> bool {
        let open = self.link.is_open();
        if open {
            self.was_open = true;
            return true;
        }
        if self.was_open {
            warn!("Serial link lost");
            self.was_open = false;
        }

        let due = self
            .last_reconnect
            .is_none_or(|at| at.elapsed() >= self.reconnect_interval);
        if !due {
            return false;
        }
        self.last_reconnect = Some(Instant::now());

        match self.link.reopen().await {
            Ok(()) => {
                info!("Serial link connected");
                self.was_open = true;
                true
            }
            Err(e) => {
                debug!(error = %e, "Serial reconnect failed");
                false
            }
        }
    }

    fn name(&self) -> &'static str {
        "serial"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockSerialLink;

    fn channel(link: MockSerialLink) -> SerialChannel<MockSerialLink> {
        SerialChannel::new(link, Duration::from_secs(2))
    }

    #[tokio::test(start_paused = true)]
    async fn test_grant_reply() {
        let (link, handle) = MockSerialLink::new();
        handle.reply_on_write(b"OK\n");
        let mut channel = channel(link);

        let result = channel
            .request_decision(&VerificationRequest::new(), Duration::from_secs(5))
            .await
            .unwrap();

        assert!(result.granted);
        assert_eq!(handle.written(), vec![b"CAR_DETECTED\n".to_vec()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_deny_reply_with_suffix() {
        let (link, handle) = MockSerialLink::new();
        handle.reply_on_write(b"NOxx");
        let mut channel = channel(link);

        let result = channel
            .request_decision(&VerificationRequest::new(), Duration::from_secs(5))
            .await
            .unwrap();

        assert!(!result.granted);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_input_is_flushed() {
        let (link, handle) = MockSerialLink::new();
        handle.push_inbound(b"OK\n");
        let mut channel = channel(link);

        let start = Instant::now();
        let result = channel
            .request_decision(&VerificationRequest::new(), Duration::from_secs(5))
            .await;

        assert!(matches!(result, Err(TransportError::Timeout(5000))));
        assert!(start.elapsed() >= Duration::from_secs(5));
        assert_eq!(handle.clears(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ignored_reply_then_decision() {
        let (link, handle) = MockSerialLink::new();
        handle.reply_on_write(b"WAIT\n");
        let mut channel = channel(link);

        let feeder = handle.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(1500)).await;
            feeder.push_inbound(b"OK\n");
        });

        let start = Instant::now();
        let result = channel
            .request_decision(&VerificationRequest::new(), Duration::from_secs(5))
            .await
            .unwrap();

        assert!(result.granted);
        assert!(start.elapsed() >= Duration::from_millis(1500));
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn test_write_retries_then_succeeds() {
        let (link, handle) = MockSerialLink::new();
        handle.fail_writes(3);
        handle.reply_on_write(b"OK\n");
        let mut channel = channel(link);

        let start = Instant::now();
        let result = channel
            .request_decision(&VerificationRequest::new(), Duration::from_secs(5))
            .await
            .unwrap();

        assert!(result.granted);
        assert_eq!(handle.write_attempts(), 4);
        assert!(start.elapsed() >= Duration::from_millis(3 * SERIAL_TX_BACKOFF_MS));
    }

    #[tokio::test(start_paused = true)]
    async fn test_write_gives_up_after_five_attempts() {
        let (link, handle) = MockSerialLink::new();
        handle.fail_writes(10);
        let mut channel = channel(link);

        let result = channel
            .request_decision(&VerificationRequest::new(), Duration::from_secs(5))
            .await;

        assert!(matches!(result, Err(TransportError::WriteFailed { attempts: 5 })));
        assert_eq!(handle.write_attempts(), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_closed_link_fails_immediately() {
        let (link, handle) = MockSerialLink::new();
        handle.set_open(false);
        let mut channel = channel(link);

        let result = channel
            .request_decision(&VerificationRequest::new(), Duration::from_secs(5))
            .await;

        assert!(matches!(result, Err(TransportError::NotConnected(_))));
        assert_eq!(handle.write_attempts(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reconnect_is_rate_limited() {
        let (link, handle) = MockSerialLink::new();
        handle.set_open(false);
        handle.set_reopen_succeeds(false);
        let mut channel = channel(link);

        assert!(!channel.maintain_link().await);
        assert!(!channel.maintain_link().await);
        assert_eq!(handle.reopens(), 1);

        tokio::time::advance(Duration::from_secs(2)).await;
        handle.set_reopen_succeeds(true);
        assert!(channel.maintain_link().await);
        assert_eq!(handle.reopens(), 2);

        assert!(channel.maintain_link().await);
        assert_eq!(handle.reopens(), 2);
    }
}
