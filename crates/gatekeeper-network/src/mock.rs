//! Mock channel and mock serial link for tests and bench runs.
//!
//! Both follow the same pattern as the peripheral mocks: the mock is moved
//! into its owner and a cloneable handle scripts and inspects it.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use gatekeeper_core::{VerificationRequest, VerificationResult};
use tokio::sync::mpsc;

use crate::channel::VerificationChannel;
use crate::error::{Result, TransportError};
use crate::link::SerialLink;

/// Scripted answer of a [`MockChannel`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockReply {
    Grant(Option<String>),
    Deny(Option<String>),
    /// Transport failure with the given detail.
    Fail(String),
    /// Never answers; the call ends at its timeout.
    Silent,
}

#[derive(Debug)]
struct ChannelState {
    replies: VecDeque<(Duration, MockReply)>,
    timeouts: Vec<Duration>,
    link_up: bool,
}

/// Verification channel that plays back scripted replies.
///
/// With an empty script every request is denied.
///
/// # Examples
///
/// ```
/// use gatekeeper_core::VerificationRequest;
/// use gatekeeper_network::mock::{MockChannel, MockReply};
/// use gatekeeper_network::VerificationChannel;
/// use std::time::Duration;
///
/// #[tokio::main]
/// async fn main() {
///     let (mut channel, handle) = MockChannel::new();
///     handle.push(MockReply::Grant(Some("29A12345".into())));
///
///     let result = channel
///         .request_decision(&VerificationRequest::new(), Duration::from_secs(1))
///         .await
///         .unwrap();
///     assert!(result.granted);
///     assert_eq!(handle.requests(), 1);
/// }
/// ```
#[derive(Debug)]
pub struct MockChannel {
    state: Arc<Mutex<ChannelState>>,
    counters: Arc<ChannelCounters>,
}

#[derive(Debug, Default)]
struct ChannelCounters {
    requests: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    link_checks: AtomicUsize,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Decrements the in-flight counter when a request future completes or is
/// dropped at the controller's deadline.
struct InFlight<'a>(&'a ChannelCounters);

impl<'a> InFlight<'a> {
    fn enter(counters: &'a ChannelCounters) -> Self {
        let now = counters.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        counters.max_in_flight.fetch_max(now, Ordering::SeqCst);
        Self(counters)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

impl MockChannel {
    pub fn new() -> (Self, MockChannelHandle) {
        let state = Arc::new(Mutex::new(ChannelState {
            replies: VecDeque::new(),
            timeouts: Vec::new(),
            link_up: true,
        }));
        let counters = Arc::new(ChannelCounters::default());

        let channel = Self {
            state: Arc::clone(&state),
            counters: Arc::clone(&counters),
        };
        (channel, MockChannelHandle { state, counters })
    }
}

impl VerificationChannel for MockChannel {
    async fn request_decision(
        &mut self,
        _request: &VerificationRequest,
        timeout: Duration,
    ) -> Result<VerificationResult> {
        self.counters.requests.fetch_add(1, Ordering::SeqCst);
        let _guard = InFlight::enter(&self.counters);

        let (delay, reply) = {
            let mut state = lock(&self.state);
            state.timeouts.push(timeout);
            state
                .replies
                .pop_front()
                .unwrap_or((Duration::ZERO, MockReply::Deny(None)))
        };

        let answer = async move {
            if reply == MockReply::Silent {
                std::future::pending::<()>().await;
            }
            tokio::time::sleep(delay).await;
            match reply {
                MockReply::Grant(plate) => Ok(VerificationResult::granted(plate)),
                MockReply::Deny(plate) => Ok(VerificationResult::denied(plate)),
                MockReply::Fail(detail) => Err(TransportError::Connection(detail)),
                MockReply::Silent => Err(TransportError::timeout(timeout)),
            }
        };

        tokio::time::timeout(timeout, answer)
            .await
            .unwrap_or_else(|_| Err(TransportError::timeout(timeout)))
    }

    async fn maintain_link(&mut self) -> bool {
        self.counters.link_checks.fetch_add(1, Ordering::SeqCst);
        lock(&self.state).link_up
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

/// Handle for scripting a [`MockChannel`].
#[derive(Debug, Clone)]
pub struct MockChannelHandle {
    state: Arc<Mutex<ChannelState>>,
    counters: Arc<ChannelCounters>,
}

impl MockChannelHandle {
    /// Queue an immediate reply.
    pub fn push(&self, reply: MockReply) {
        self.push_after(Duration::ZERO, reply);
    }

    /// Queue a reply delivered `delay` after the request.
    pub fn push_after(&self, delay: Duration, reply: MockReply) {
        lock(&self.state).replies.push_back((delay, reply));
    }

    /// Requests issued so far.
    pub fn requests(&self) -> usize {
        self.counters.requests.load(Ordering::SeqCst)
    }

    /// Largest number of requests that were ever outstanding together.
    pub fn max_in_flight(&self) -> usize {
        self.counters.max_in_flight.load(Ordering::SeqCst)
    }

    /// Timeout passed with each request.
    pub fn timeouts(&self) -> Vec<Duration> {
        lock(&self.state).timeouts.clone()
    }

    pub fn link_checks(&self) -> usize {
        self.counters.link_checks.load(Ordering::SeqCst)
    }

    pub fn set_link_up(&self, up: bool) {
        lock(&self.state).link_up = up;
    }
}

#[derive(Debug)]
struct LinkState {
    open: bool,
    reopen_succeeds: bool,
    fail_writes: usize,
    write_attempts: usize,
    written: Vec<Vec<u8>>,
    replies: VecDeque<Vec<u8>>,
    clears: usize,
    reopens: usize,
}

/// In-memory serial link.
///
/// Inbound bytes are pushed by the handle, either directly or as a scripted
/// reply released by the next successful write.
#[derive(Debug)]
pub struct MockSerialLink {
    state: Arc<Mutex<LinkState>>,
    inbound_tx: mpsc::UnboundedSender<Vec<u8>>,
    inbound_rx: mpsc::UnboundedReceiver<Vec<u8>>,
    pending: Vec<u8>,
}

impl MockSerialLink {
    /// Create an open link.
    pub fn new() -> (Self, MockSerialLinkHandle) {
        let state = Arc::new(Mutex::new(LinkState {
            open: true,
            reopen_succeeds: true,
            fail_writes: 0,
            write_attempts: 0,
            written: Vec::new(),
            replies: VecDeque::new(),
            clears: 0,
            reopens: 0,
        }));
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();

        let handle = MockSerialLinkHandle {
            state: Arc::clone(&state),
            inbound_tx: inbound_tx.clone(),
        };
        let link = Self {
            state,
            inbound_tx,
            inbound_rx,
            pending: Vec::new(),
        };
        (link, handle)
    }

    fn drain_pending(&mut self, buf: &mut [u8]) -> usize {
        let n = self.pending.len().min(buf.len());
        buf[..n].copy_from_slice(&self.pending[..n]);
        self.pending.drain(..n);
        n
    }
}

impl SerialLink for MockSerialLink {
    async fn write_all(&mut self, bytes: &[u8]) -> Result<()> {
        let reply = {
            let mut state = lock(&self.state);
            state.write_attempts += 1;
            if !state.open {
                return Err(TransportError::NotConnected("mock link closed".into()));
            }
            if state.fail_writes > 0 {
                state.fail_writes -= 1;
                return Err(TransportError::Io(std::io::Error::other("simulated write fault")));
            }
            state.written.push(bytes.to_vec());
            state.replies.pop_front()
        };

        if let Some(reply) = reply {
            // The receiver lives in `self`, so the send cannot fail.
            let _ = self.inbound_tx.send(reply);
        }
        Ok(())
    }

    async fn read(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize> {
        if !self.pending.is_empty() {
            return Ok(self.drain_pending(buf));
        }
        match tokio::time::timeout(timeout, self.inbound_rx.recv()).await {
            Ok(Some(bytes)) => {
                self.pending = bytes;
                Ok(self.drain_pending(buf))
            }
            Ok(None) | Err(_) => Ok(0),
        }
    }

    async fn clear_input(&mut self) -> Result<()> {
        lock(&self.state).clears += 1;
        self.pending.clear();
        while self.inbound_rx.try_recv().is_ok() {}
        Ok(())
    }

    fn is_open(&self) -> bool {
        lock(&self.state).open
    }

    async fn reopen(&mut self) -> Result<()> {
        let mut state = lock(&self.state);
        state.reopens += 1;
        if state.reopen_succeeds {
            state.open = true;
            Ok(())
        } else {
            Err(TransportError::NotConnected("mock reopen refused".into()))
        }
    }
}

/// Handle for scripting a [`MockSerialLink`].
#[derive(Debug, Clone)]
pub struct MockSerialLinkHandle {
    state: Arc<Mutex<LinkState>>,
    inbound_tx: mpsc::UnboundedSender<Vec<u8>>,
}

impl MockSerialLinkHandle {
    /// Make bytes available to the next read.
    pub fn push_inbound(&self, bytes: &[u8]) {
        let _ = self.inbound_tx.send(bytes.to_vec());
    }

    /// Release `bytes` as soon as the next write succeeds.
    pub fn reply_on_write(&self, bytes: &[u8]) {
        lock(&self.state).replies.push_back(bytes.to_vec());
    }

    /// Fail the next `count` writes.
    pub fn fail_writes(&self, count: usize) {
        lock(&self.state).fail_writes = count;
    }

    pub fn set_open(&self, open: bool) {
        lock(&self.state).open = open;
    }

    pub fn set_reopen_succeeds(&self, succeeds: bool) {
        lock(&self.state).reopen_succeeds = succeeds;
    }

    /// Successful writes, oldest first.
    pub fn written(&self) -> Vec<Vec<u8>> {
        lock(&self.state).written.clone()
    }

    pub fn write_attempts(&self) -> usize {
        lock(&self.state).write_attempts
    }

    pub fn clears(&self) -> usize {
        lock(&self.state).clears
    }

    pub fn reopens(&self) -> usize {
        lock(&self.state).reopens
    }
}
