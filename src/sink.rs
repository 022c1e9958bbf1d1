//! Append-only telemetry log
//!
//! One line per telemetry frame, payload verbatim, platform line ending.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::{HarnessError, Result};

/// Suffix appended to the trajectory file stem to name the telemetry log
pub const LOG_SUFFIX: &str = "-rRocketSimulation.txt";

#[cfg(windows)]
const LINE_ENDING: &str = "\r\n";
#[cfg(not(windows))]
const LINE_ENDING: &str = "\n";

/// Log path next to the trajectory file: `launch-09.txt` becomes
/// `launch-09-rRocketSimulation.txt`
pub fn log_path_for(trajectory: &Path) -> PathBuf {
    let stem = trajectory.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default();
    trajectory.with_file_name(format!("{}{}", stem, LOG_SUFFIX))
}

/// Telemetry log writer
pub struct TelemetryLog<W: Write = BufWriter<File>> {
    writer: Option<W>,
    path: PathBuf,
    lines: usize,
}

impl TelemetryLog {
    /// Create (or truncate) the log file
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::create(path).map_err(|e| HarnessError::sink(path, e))?;
        debug!("Telemetry log created at {}", path.display());
        Ok(Self::from_writer(BufWriter::new(file), path))
    }
}

impl<W: Write> TelemetryLog<W> {
    /// Log into an arbitrary writer; `path` is only used for reporting
    pub fn from_writer(writer: W, path: impl Into<PathBuf>) -> Self {
        Self { writer: Some(writer), path: path.into(), lines: 0 }
    }

    /// Append one payload as a line
    pub fn append(&mut self, payload: &str) -> Result<()> {
        let writer = self.writer.as_mut().ok_or_else(|| {
            HarnessError::sink(&self.path, std::io::Error::other("telemetry log already closed"))
        })?;

        writer
            .write_all(payload.as_bytes())
            .and_then(|()| writer.write_all(LINE_ENDING.as_bytes()))
            .map_err(|e| HarnessError::sink(&self.path, e))?;
        self.lines += 1;
        Ok(())
    }

    /// Flush and release the writer. Later calls are no-ops.
    pub fn close(&mut self) -> Result<Option<W>> {
        match self.writer.take() {
            Some(mut writer) => {
                writer.flush().map_err(|e| HarnessError::sink(&self.path, e))?;
                debug!("Telemetry log closed after {} lines", self.lines);
                Ok(Some(writer))
            }
            None => Ok(None),
        }
    }

    /// Log location
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Lines appended so far
    pub fn lines(&self) -> usize {
        self.lines
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn appends_payload_lines() {
        let mut log = TelemetryLog::from_writer(Vec::new(), "memory.txt");
        log.append("2,100,1.5,0.2,P").unwrap();
        log.append("2,200,3.0,0.4,L").unwrap();
        assert_eq!(log.lines(), 2);

        let bytes = log.close().unwrap().expect("first close returns the writer");
        let text = String::from_utf8(bytes).unwrap();
        assert_eq!(text, format!("2,100,1.5,0.2,P{0}2,200,3.0,0.4,L{0}", LINE_ENDING));
    }

    #[test]
    fn append_after_close_fails() {
        let mut log = TelemetryLog::from_writer(Vec::new(), "memory.txt");
        log.close().unwrap();
        assert!(log.close().unwrap().is_none());
        assert!(matches!(log.append("2,0,0,0,P"), Err(HarnessError::Sink { .. })));
    }

    #[test]
    fn log_path_sits_next_to_trajectory() {
        assert_eq!(
            log_path_for(Path::new("flights/launch-09.txt")),
            PathBuf::from("flights/launch-09-rRocketSimulation.txt")
        );
        assert_eq!(log_path_for(Path::new("launch")), PathBuf::from("launch-rRocketSimulation.txt"));
    }

    #[test]
    fn create_fails_in_missing_directory() {
        let result = TelemetryLog::create("/nonexistent-dir/log.txt");
        assert!(matches!(result, Err(HarnessError::Sink { .. })));
    }
}
