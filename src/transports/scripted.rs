//! Scripted transport for dry runs and tests
//!
//! Replays a fixed sequence of inbound chunks and records everything the
//! session writes. Once the script is exhausted the next read reports
//! [`HarnessError::TransportClosed`], which ends the session like a pulled
//! cable would.

use std::collections::VecDeque;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, info};

use crate::transport::Transport;
use crate::{HarnessError, Result};

/// One scripted read result
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Chunk {
    /// Bytes returned by a read
    Data(Vec<u8>),

    /// A read that times out with nothing
    Idle,

    /// A read that fails
    Fail,
}

/// Shared view of the bytes written to a [`ScriptedTransport`]
#[derive(Debug, Clone, Default)]
pub struct WriteLog {
    frames: Arc<Mutex<Vec<Vec<u8>>>>,
    closed: Arc<Mutex<bool>>,
}

impl WriteLog {
    /// Each write, in order
    pub fn frames(&self) -> Vec<Vec<u8>> {
        self.frames.lock().map(|frames| frames.clone()).unwrap_or_default()
    }

    /// Each write decoded as text, in order
    pub fn frames_as_text(&self) -> Vec<String> {
        self.frames().iter().map(|frame| String::from_utf8_lossy(frame).into_owned()).collect()
    }

    /// Whether the transport was closed
    pub fn is_closed(&self) -> bool {
        self.closed.lock().map(|closed| *closed).unwrap_or(false)
    }
}

/// Transport that replays scripted reads
#[derive(Debug)]
pub struct ScriptedTransport {
    name: String,
    script: VecDeque<Chunk>,
    writes: WriteLog,
    fail_writes_after: Option<usize>,
    write_timeout: Duration,
    fail_close: bool,
    closed: bool,
}

impl ScriptedTransport {
    /// Replay `chunks` in order
    pub fn new<I>(chunks: I) -> Self
    where
        I: IntoIterator<Item = Chunk>,
    {
        Self {
            name: "<scripted>".to_string(),
            script: chunks.into_iter().collect(),
            writes: WriteLog::default(),
            fail_writes_after: None,
            write_timeout: Duration::from_millis(50),
            fail_close: false,
            closed: false,
        }
    }

    /// Replay text chunks, one read each
    pub fn from_text<I, S>(chunks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::new(chunks.into_iter().map(|chunk| Chunk::Data(chunk.as_ref().as_bytes().to_vec())))
    }

    /// Replay a raw capture of device output, `chunk_size` bytes per read
    pub fn from_capture<P: AsRef<Path>>(path: P, chunk_size: usize) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read(path)
            .map_err(|e| HarnessError::CaptureUnavailable { path: path.to_path_buf(), source: e })?;

        let chunks: Vec<Chunk> =
            data.chunks(chunk_size.max(1)).map(|chunk| Chunk::Data(chunk.to_vec())).collect();
        info!("Replaying {} ({} bytes in {} reads)", path.display(), data.len(), chunks.len());

        Ok(Self { name: path.display().to_string(), ..Self::new(chunks) })
    }

    /// Make every write after the first `count` time out
    pub fn fail_writes_after(mut self, count: usize) -> Self {
        self.fail_writes_after = Some(count);
        self
    }

    /// Make `close` report a failure; the link is still marked closed
    pub fn fail_close(mut self) -> Self {
        self.fail_close = true;
        self
    }

    /// Handle to inspect writes after the transport moved into a session
    pub fn write_log(&self) -> WriteLog {
        self.writes.clone()
    }

    fn record(&self, bytes: &[u8]) {
        if let Ok(mut frames) = self.writes.frames.lock() {
            frames.push(bytes.to_vec());
        }
    }

    fn written(&self) -> usize {
        self.writes.frames.lock().map(|frames| frames.len()).unwrap_or(0)
    }
}

#[async_trait::async_trait]
impl Transport for ScriptedTransport {
    async fn read_available(&mut self, buf: &mut [u8]) -> Result<usize> {
        if self.closed {
            return Err(HarnessError::TransportClosed);
        }

        match self.script.pop_front() {
            Some(Chunk::Data(mut data)) => {
                let n = data.len().min(buf.len());
                buf[..n].copy_from_slice(&data[..n]);
                if n < data.len() {
                    self.script.push_front(Chunk::Data(data.split_off(n)));
                }
                Ok(n)
            }
            Some(Chunk::Idle) => Ok(0),
            Some(Chunk::Fail) => Err(HarnessError::transport(
                "read",
                std::io::Error::new(std::io::ErrorKind::BrokenPipe, "scripted read failure"),
            )),
            None => {
                debug!("Script exhausted");
                Err(HarnessError::TransportClosed)
            }
        }
    }

    async fn write_all(&mut self, bytes: &[u8]) -> Result<()> {
        if self.closed {
            return Err(HarnessError::TransportClosed);
        }
        if self.fail_writes_after.is_some_and(|limit| self.written() >= limit) {
            return Err(HarnessError::WriteTimeout { duration: self.write_timeout });
        }
        self.record(bytes);
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.closed = true;
        if let Ok(mut closed) = self.writes.closed.lock() {
            *closed = true;
        }
        if self.fail_close {
            return Err(HarnessError::transport(
                "close",
                std::io::Error::new(std::io::ErrorKind::BrokenPipe, "scripted close failure"),
            ));
        }
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn replays_chunks_in_order() {
        let mut transport = ScriptedTransport::new([
            Chunk::Data(b"<1,".to_vec()),
            Chunk::Idle,
            Chunk::Data(b"5>".to_vec()),
        ]);
        let mut buf = [0u8; 16];

        assert_eq!(transport.read_available(&mut buf).await.unwrap(), 3);
        assert_eq!(&buf[..3], b"<1,");
        assert_eq!(transport.read_available(&mut buf).await.unwrap(), 0);
        assert_eq!(transport.read_available(&mut buf).await.unwrap(), 2);
        assert!(matches!(
            transport.read_available(&mut buf).await,
            Err(HarnessError::TransportClosed)
        ));
    }

    #[tokio::test]
    async fn large_chunks_are_split_across_reads() {
        let mut transport = ScriptedTransport::from_text(["abcdef"]);
        let mut buf = [0u8; 4];

        assert_eq!(transport.read_available(&mut buf).await.unwrap(), 4);
        assert_eq!(transport.read_available(&mut buf).await.unwrap(), 2);
        assert_eq!(&buf[..2], b"ef");
    }

    #[tokio::test]
    async fn records_writes_and_close() {
        let mut transport = ScriptedTransport::new(Vec::<Chunk>::new()).fail_writes_after(1);
        let log = transport.write_log();

        transport.write_all(b"<6,1>").await.unwrap();
        assert!(matches!(
            transport.write_all(b"<7,0>").await,
            Err(HarnessError::WriteTimeout { .. })
        ));
        transport.close().unwrap();

        assert_eq!(log.frames_as_text(), vec!["<6,1>"]);
        assert!(log.is_closed());
    }

    #[test]
    fn failing_close_still_marks_closed() {
        let mut transport = ScriptedTransport::from_text(["<1,0>"]).fail_close();
        let log = transport.write_log();

        assert!(matches!(transport.close(), Err(HarnessError::Transport { operation: "close", .. })));
        assert!(log.is_closed());
    }

    #[test]
    fn missing_capture_file_is_reported_as_such() {
        match ScriptedTransport::from_capture("/nonexistent/flight-07.bin", 64) {
            Err(HarnessError::CaptureUnavailable { path, .. }) => {
                assert_eq!(path, std::path::PathBuf::from("/nonexistent/flight-07.bin"));
            }
            other => panic!("expected a capture error, got {other:?}"),
        }
    }
}
