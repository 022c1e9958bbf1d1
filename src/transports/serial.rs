//! Serial port transport

use serialport::SerialPort;
use std::io::{ErrorKind, Read, Write};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::transport::Transport;
use crate::{HarnessConfig, HarnessError, Result};

/// Names of the serial ports currently present on the system
pub fn available_ports() -> Vec<String> {
    match serialport::available_ports() {
        Ok(ports) => ports.into_iter().map(|port| port.port_name).collect(),
        Err(e) => {
            warn!("Failed to enumerate serial ports: {}", e);
            Vec::new()
        }
    }
}

/// Transport over a serial port (8N1)
///
/// Reads block for at most the read timeout, so a poll with nothing on the
/// line costs about a millisecond. Writes temporarily switch the port to the
/// write timeout.
pub struct SerialTransport {
    port: Option<Box<dyn SerialPort>>,
    name: String,
    read_timeout: Duration,
    write_timeout: Duration,
}

impl SerialTransport {
    /// Open the named port with the configured baud rate and timeouts.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::TransportUnavailable`] with the list of present
    /// ports when the port does not exist or cannot be opened.
    pub fn open(name: &str, config: &HarnessConfig) -> Result<Self> {
        let available = available_ports();
        if !available.iter().any(|port| port == name) {
            return Err(HarnessError::transport_unavailable(name, available));
        }

        let port = serialport::new(name, config.baud_rate)
            .timeout(config.read_timeout())
            .open()
            .map_err(|e| HarnessError::TransportUnavailable {
                port: name.to_string(),
                available,
                source: Some(Box::new(e)),
            })?;

        info!("Connected to {} at {} baud", name, config.baud_rate);

        Ok(Self {
            port: Some(port),
            name: name.to_string(),
            read_timeout: config.read_timeout(),
            write_timeout: config.write_timeout(),
        })
    }

    fn port(&mut self) -> Result<&mut Box<dyn SerialPort>> {
        self.port.as_mut().ok_or(HarnessError::TransportClosed)
    }
}

#[async_trait::async_trait]
impl Transport for SerialTransport {
    async fn read_available(&mut self, buf: &mut [u8]) -> Result<usize> {
        let port = self.port()?;

        // Take everything already buffered, or wait for a single byte
        let waiting = port.bytes_to_read().map_err(|e| HarnessError::transport("poll", e.into()))?;
        let wanted = (waiting as usize).max(1).min(buf.len());

        match port.read(&mut buf[..wanted]) {
            Ok(n) => Ok(n),
            Err(e) if e.kind() == ErrorKind::TimedOut => Ok(0),
            Err(e) if e.kind() == ErrorKind::Interrupted => Ok(0),
            Err(e) => Err(HarnessError::transport("read", e)),
        }
    }

    async fn write_all(&mut self, bytes: &[u8]) -> Result<()> {
        let (read_timeout, write_timeout) = (self.read_timeout, self.write_timeout);
        let port = self.port()?;

        port.set_timeout(write_timeout).map_err(|e| HarnessError::transport("configure", e.into()))?;
        let written = port.write_all(bytes).and_then(|()| port.flush());
        port.set_timeout(read_timeout).map_err(|e| HarnessError::transport("configure", e.into()))?;

        match written {
            Ok(()) => Ok(()),
            Err(e) if matches!(e.kind(), ErrorKind::TimedOut | ErrorKind::WriteZero) => {
                Err(HarnessError::WriteTimeout { duration: write_timeout })
            }
            Err(e) => Err(HarnessError::transport("write", e)),
        }
    }

    fn close(&mut self) -> Result<()> {
        match self.port.take() {
            Some(mut port) => {
                debug!("Closing serial port {}", self.name);
                // The port itself is released on drop, even if the flush fails
                port.flush().map_err(|e| HarnessError::transport("close", e))
            }
            None => Ok(()),
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}
