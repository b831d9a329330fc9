//! Runtime selection of the verification binding.
//!
//! [`VerificationChannel`] uses native `async fn` and cannot be boxed, so the
//! binary builds an [`AnyChannel`] from the configuration and the controller
//! stays generic.

use std::time::Duration;

use gatekeeper_core::{GateConfig, VerificationBinding, VerificationRequest, VerificationResult};
use tracing::info;

use crate::channel::VerificationChannel;
use crate::error::Result;
use crate::http::HttpChannel;
use crate::link::SerialPortLink;
use crate::serial::SerialChannel;

/// Any supported verification binding.
#[derive(Debug)]
#[non_exhaustive]
pub enum AnyChannel {
    Http(HttpChannel),
    Serial(SerialChannel<SerialPortLink>),
}

impl AnyChannel {
    /// Build the binding selected by `config`. The serial port is not opened
    /// here; the first link maintenance cycle does that.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn from_config(config: &GateConfig) -> Result<Self> {
        let channel = match &config.binding {
            VerificationBinding::Http { endpoint } => Self::Http(HttpChannel::new(endpoint.clone())?),
            VerificationBinding::Serial { port, baud_rate } => Self::Serial(SerialChannel::new(
                SerialPortLink::new(port.clone(), *baud_rate),
                config.reconnect_interval,
            )),
        };
        info!(binding = channel.name(), "Verification channel selected");
        Ok(channel)
    }
}

impl VerificationChannel for AnyChannel {
    async fn request_decision(
        &mut self,
        request: &VerificationRequest,
        timeout: Duration,
    ) -> Result<VerificationResult> {
        match self {
            Self::Http(channel) => channel.request_decision(request, timeout).await,
            Self::Serial(channel) => channel.request_decision(request, timeout).await,
        }
    }

    async fn maintain_link(&mut self) -> bool {
        match self {
            Self::Http(channel) => channel.maintain_link().await,
            Self::Serial(channel) => channel.maintain_link().await,
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Self::Http(channel) => channel.name(),
            Self::Serial(channel) => channel.name(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_config_http() {
        let config = GateConfig::default();
        let channel = AnyChannel::from_config(&config).unwrap();
        assert_eq!(channel.name(), "http");
    }

    #[test]
    fn test_from_config_serial() {
        let config =
            GateConfig::default().binding(VerificationBinding::serial("/dev/ttyUSB0", 115_200));
        let channel = AnyChannel::from_config(&config).unwrap();
        assert_eq!(channel.name(), "serial");
        assert!(matches!(channel, AnyChannel::Serial(ref c) if c.link().path() == "/dev/ttyUSB0"));
    }
}
