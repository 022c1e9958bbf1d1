//! Transport trait for the byte stream to the flight computer

use crate::Result;

/// Byte-stream link to the device under test
///
/// Transports abstract over the physical link (serial port, recorded
/// capture) and own their timing. The session calls them from a single
/// control flow, so implementations need no internal locking.
#[async_trait::async_trait]
pub trait Transport: Send {
    /// Read whatever bytes are available into `buf`
    ///
    /// Must return promptly. Returns:
    /// - `Ok(n)` with `n > 0` - bytes were read
    /// - `Ok(0)` - nothing arrived within the poll window
    /// - `Err(e)` - the link failed or was closed
    async fn read_available(&mut self, buf: &mut [u8]) -> Result<usize>;

    /// Write a complete frame
    ///
    /// A write that cannot complete within the transport's write timeout is
    /// an error, never a silent drop.
    async fn write_all(&mut self, bytes: &[u8]) -> Result<()>;

    /// Release the link. Called exactly once when the session ends.
    fn close(&mut self) -> Result<()>;

    /// Human-readable endpoint name for logs
    fn name(&self) -> &str;
}
