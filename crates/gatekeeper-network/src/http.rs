//! HTTP binding of the verification channel.
//!
//! One GET per arrival, no body. The recognition service captures the image
//! itself and answers with a small status object (see
//! [`gatekeeper_protocol::payload`]).
//!
//! ```text
//! GateController ──> HttpChannel ──(GET /lpr)──> recognition service
//!                        │
//!                        └─> parse_payload (bounded, fail closed)
//! ```
//!
//! No retries: a failed request is a deny and the driver simply arrives again.

use std::time::Duration;

use gatekeeper_core::constants::MAX_PAYLOAD_LENGTH;
use gatekeeper_core::{VerificationRequest, VerificationResult};
use gatekeeper_protocol::{PayloadError, parse_payload};
use tracing::{debug, info, warn};

use crate::channel::VerificationChannel;
use crate::error::{Result, TransportError};

/// Verification over a single HTTP GET.
#[derive(Debug, Clone)]
pub struct HttpChannel {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpChannel {
    /// Create a channel for `endpoint` (e.g. `http://10.0.0.2:8000/lpr`).
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(endpoint: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .pool_max_idle_per_host(0)
            .no_proxy()
            .build()?;
        let endpoint = endpoint.into();
        debug!(%endpoint, "Creating HTTP verification channel");

        Ok(Self { client, endpoint })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn exchange(&self, timeout: Duration) -> Result<VerificationResult> {
        let response = self
            .client
            .get(&self.endpoint)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| classify(e, timeout))?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::HttpStatus(status.as_u16()));
        }

        let body = read_bounded(response, timeout).await?;
        Ok(parse_payload(&body)?)
    }
}

/// Collect the body, giving up as soon as it outgrows a valid payload.
async fn read_bounded(mut response: reqwest::Response, timeout: Duration) -> Result<Vec<u8>> {
    let too_long = |len: usize| PayloadError::TooLong { len, max: MAX_PAYLOAD_LENGTH };

    if let Some(len) = response.content_length()
        && len > MAX_PAYLOAD_LENGTH as u64
    {
        return Err(too_long(usize::try_from(len).unwrap_or(usize::MAX)).into());
    }

    let mut body = Vec::new();
    while let Some(chunk) = response.chunk().await.map_err(|e| classify(e, timeout))? {
        if body.len() + chunk.len() > MAX_PAYLOAD_LENGTH {
            return Err(too_long(body.len() + chunk.len()).into());
        }
        body.extend_from_slice(&chunk);
    }
    Ok(body)
}

fn classify(error: reqwest::Error, timeout: Duration) -> TransportError {
    if error.is_timeout() {
        TransportError::timeout(timeout)
    } else {
        error.into()
    }
}

impl VerificationChannel for HttpChannel {
    async fn request_decision(
        &mut self,
        request: &VerificationRequest,
        timeout: Duration,
    ) -> Result<VerificationResult> {
        info!(
            attempt_id = %request.attempt_id,
            endpoint = %self.endpoint,
            timeout_ms = timeout.as_millis() as u64,
            "Requesting decision"
        );

        match self.exchange(timeout).await {
            Ok(result) => {
                debug!(
                    attempt_id = %request.attempt_id,
                    granted = result.granted,
                    plate = result.plate().unwrap_or(""),
                    "Service answered"
                );
                Ok(result)
            }
            Err(e) => {
                warn!(attempt_id = %request.attempt_id, error = %e, "Verification request failed");
                Err(e)
            }
        }
    }

    async fn maintain_link(&mut self) -> bool {
        true
    }

    fn name(&self) -> &'static str {
        "http"
    }
}
