//! Byte link underneath the serial binding.
//!
//! [`SerialLink`] is the seam between the serial exchange logic and the
//! actual UART. [`SerialPortLink`] drives a real port through the
//! `serialport` crate; its blocking calls run on Tokio's blocking pool.

#![allow(async_fn_in_trait)]

use std::io::{ErrorKind, Read, Write};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serialport::{ClearBuffer, DataBits, Parity, SerialPort, StopBits};
use tracing::{debug, warn};

use crate::error::{Result, TransportError};

/// A byte-oriented duplex link.
pub trait SerialLink: Send {
    /// Write all of `bytes`. Success means the transport accepted them, not
    /// that the peer read them.
    async fn write_all(&mut self, bytes: &[u8]) -> Result<()>;

    /// Read whatever arrives within `timeout`. Returns `Ok(0)` when nothing
    /// arrived.
    async fn read(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize>;

    /// Drop any bytes already buffered on the inbound side.
    async fn clear_input(&mut self) -> Result<()>;

    fn is_open(&self) -> bool;

    /// Try to (re)open the link.
    async fn reopen(&mut self) -> Result<()>;
}

type SharedPort = Arc<Mutex<Box<dyn SerialPort>>>;

/// UART link, 8N1 at a fixed baud rate.
pub struct SerialPortLink {
    path: String,
    baud_rate: u32,
    port: Option<SharedPort>,
}

impl std::fmt::Debug for SerialPortLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialPortLink")
            .field("path", &self.path)
            .field("baud_rate", &self.baud_rate)
            .field("open", &self.port.is_some())
            .finish()
    }
}

impl SerialPortLink {
    /// Create a link for `path`. The port is not opened until [`reopen`] is
    /// called, so a missing device at startup is not fatal.
    ///
    /// [`reopen`]: SerialLink::reopen
    pub fn new(path: impl Into<String>, baud_rate: u32) -> Self {
        Self {
            path: path.into(),
            baud_rate,
            port: None,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    fn shared(&self) -> Result<SharedPort> {
        self.port
            .clone()
            .ok_or_else(|| TransportError::NotConnected(self.path.clone()))
    }

    /// Run a blocking port operation off the async runtime. Any I/O error
    /// other than a read timeout closes the link so that link maintenance
    /// reopens it.
    async fn blocking<T, F>(&mut self, op: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut dyn SerialPort) -> std::io::Result<T> + Send + 'static,
    {
        let port = self.shared()?;
        let outcome = tokio::task::spawn_blocking(move || {
            let mut guard = port
                .lock()
                .map_err(|_| std::io::Error::other("serial port lock poisoned"))?;
            op(&mut **guard)
        })
        .await
        .map_err(|e| TransportError::Io(std::io::Error::other(e)))?;

        match outcome {
            Ok(value) => Ok(value),
            Err(e) => {
                warn!(path = %self.path, error = %e, "Serial link error, closing");
                self.port = None;
                Err(e.into())
            }
        }
    }
}

impl SerialLink for SerialPortLink {
    async fn write_all(&mut self, bytes: &[u8]) -> Result<()> {
        let bytes = bytes.to_vec();
        self.blocking(move |port| {
            port.write_all(&bytes)?;
            port.flush()
        })
        .await
    }

    async fn read(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize> {
        let capacity = buf.len();
        let chunk = self
            .blocking(move |port| {
                port.set_timeout(timeout)?;
                let mut chunk = vec![0u8; capacity];
                match port.read(&mut chunk) {
                    Ok(n) => {
                        chunk.truncate(n);
                        Ok(chunk)
                    }
                    Err(e) if e.kind() == ErrorKind::TimedOut => Ok(Vec::new()),
                    Err(e) => Err(e),
                }
            })
            .await?;

        buf[..chunk.len()].copy_from_slice(&chunk);
        Ok(chunk.len())
    }

    async fn clear_input(&mut self) -> Result<()> {
        self.blocking(|port| port.clear(ClearBuffer::Input).map_err(std::io::Error::from))
            .await
    }

    fn is_open(&self) -> bool {
        self.port.is_some()
    }

    async fn reopen(&mut self) -> Result<()> {
        self.port = None;
        let path = self.path.clone();
        let baud_rate = self.baud_rate;

        let port = tokio::task::spawn_blocking(move || {
            serialport::new(path, baud_rate)
                .data_bits(DataBits::Eight)
                .parity(Parity::None)
                .stop_bits(StopBits::One)
                .timeout(Duration::from_millis(10))
                .open()
        })
        .await
        .map_err(|e| TransportError::Io(std::io::Error::other(e)))??;

        debug!(path = %self.path, baud_rate, "Serial port opened");
        self.port = Some(Arc::new(Mutex::new(port)));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unopened_link_reports_not_connected() {
        let mut link = SerialPortLink::new("/dev/does-not-exist", 115_200);
        assert!(!link.is_open());

        let result = link.write_all(b"CAR_DETECTED\n").await;
        assert!(matches!(result, Err(TransportError::NotConnected(_))));

        let mut buf = [0u8; 8];
        let result = link.read(&mut buf, Duration::from_millis(10)).await;
        assert!(matches!(result, Err(TransportError::NotConnected(_))));
    }

    #[tokio::test]
    async fn test_reopen_missing_device_fails() {
        let mut link = SerialPortLink::new("/dev/does-not-exist", 115_200);
        assert!(link.reopen().await.is_err());
        assert!(!link.is_open());
    }
}
