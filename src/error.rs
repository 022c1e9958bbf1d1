//! Error types for the harness.
//!
//! Every failure site has its own variant so the session can tell a transport
//! fault from a malformed request frame or a log write failure, and so the
//! operator gets an actionable message before or after a session.
//!
//! ## Error Categories
//!
//! - **Configuration Errors**: invalid markers, delays or sample tables
//! - **Pre-session Errors**: trajectory file problems, unavailable serial port
//!   or capture file
//! - **Session Faults**: transport I/O, write timeouts, request parse failures,
//!   telemetry log writes
//! - **Plot Errors**: post-session summary failures
//!
//! ## Recovery
//!
//! ```rust
//! use liftoff_hil::HarnessError;
//!
//! let error = HarnessError::transport_unavailable("/dev/ttyUSB9", vec!["/dev/ttyUSB0".into()]);
//! assert!(error.is_pre_session());
//! for suggestion in error.recovery_suggestions() {
//!     println!("  - {}", suggestion);
//! }
//! ```

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for harness operations.
pub type Result<T, E = HarnessError> = std::result::Result<T, E>;

/// Main error type for harness operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum HarnessError {
    #[error("Invalid configuration: {reason}")]
    Config { reason: String },

    #[error("Trajectory file error: {path}")]
    TrajectoryFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Trajectory parse error at line {line}: {details}")]
    TrajectoryParse { line: usize, details: String },

    #[error("Invalid trajectory: {reason}")]
    InvalidTrajectory { reason: String },

    #[error("Serial port {port} unavailable")]
    TransportUnavailable {
        port: String,
        available: Vec<String>,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Capture file {path} unavailable")]
    CaptureUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Transport {operation} failed")]
    Transport {
        operation: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("Transport write did not complete within {duration:?}")]
    WriteTimeout { duration: Duration },

    #[error("Transport closed by peer")]
    TransportClosed,

    #[error("Malformed frame '{frame}': {details}")]
    FrameParse { frame: String, details: String },

    #[error("Telemetry log error: {path}")]
    Sink {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Plotting failed: {reason}")]
    Plot { reason: String },
}

impl HarnessError {
    /// Returns whether this error happens before any session activity.
    pub fn is_pre_session(&self) -> bool {
        matches!(
            self,
            HarnessError::Config { .. }
                | HarnessError::TrajectoryFile { .. }
                | HarnessError::TrajectoryParse { .. }
                | HarnessError::InvalidTrajectory { .. }
                | HarnessError::TransportUnavailable { .. }
                | HarnessError::CaptureUnavailable { .. }
        )
    }

    /// Returns whether this error ends a running session.
    pub fn is_session_fault(&self) -> bool {
        matches!(
            self,
            HarnessError::Transport { .. }
                | HarnessError::WriteTimeout { .. }
                | HarnessError::TransportClosed
                | HarnessError::FrameParse { .. }
                | HarnessError::Sink { .. }
        )
    }

    /// Returns suggested recovery actions for this error.
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            HarnessError::Config { .. } => vec![
                "Use distinct, non-empty frame markers",
                "Check delays are finite and non-negative",
            ],
            HarnessError::TrajectoryFile { .. } => {
                vec!["Check the trajectory file exists and is readable"]
            }
            HarnessError::TrajectoryParse { .. } => vec![
                "Each data line needs a time (s) and an altitude (m) column",
                "Prefix comment lines with '#'",
            ],
            HarnessError::InvalidTrajectory { .. } => vec![
                "Provide at least one sample",
                "Sort samples by strictly increasing time",
                "Remove duplicate timestamps",
            ],
            HarnessError::TransportUnavailable { .. } => vec![
                "Check the flight computer is plugged in",
                "Pick one of the listed serial ports",
                "Check permissions on the serial device",
            ],
            HarnessError::CaptureUnavailable { .. } => vec![
                "Check the capture file path passed as PORT",
                "Drop --replay to use a serial port",
            ],
            HarnessError::Transport { .. } | HarnessError::TransportClosed => vec![
                "Check the USB cable and the flight computer power",
                "Restart the session",
            ],
            HarnessError::WriteTimeout { .. } => vec![
                "Check the flight computer is reading its serial input",
                "Increase the write timeout",
            ],
            HarnessError::FrameParse { .. } => {
                vec!["Check the flight computer firmware speaks the same frame protocol"]
            }
            HarnessError::Sink { .. } => vec![
                "Check free disk space",
                "Check write permissions next to the trajectory file",
            ],
            HarnessError::Plot { .. } => vec!["Inspect the telemetry log manually"],
        }
    }

    /// Helper constructor for configuration errors.
    pub fn config(reason: impl Into<String>) -> Self {
        HarnessError::Config { reason: reason.into() }
    }

    /// Helper constructor for invalid sample tables.
    pub fn invalid_trajectory(reason: impl Into<String>) -> Self {
        HarnessError::InvalidTrajectory { reason: reason.into() }
    }

    /// Helper constructor for unavailable serial ports.
    pub fn transport_unavailable(port: impl Into<String>, available: Vec<String>) -> Self {
        HarnessError::TransportUnavailable { port: port.into(), available, source: None }
    }

    /// Helper constructor for transport I/O errors.
    pub fn transport(operation: &'static str, source: std::io::Error) -> Self {
        HarnessError::Transport { operation, source }
    }

    /// Helper constructor for malformed frames.
    pub fn frame_parse(frame: impl Into<String>, details: impl Into<String>) -> Self {
        HarnessError::FrameParse { frame: frame.into(), details: details.into() }
    }

    /// Helper constructor for telemetry log errors.
    pub fn sink(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        HarnessError::Sink { path: path.into(), source }
    }

    /// Helper constructor for plotting errors.
    pub fn plot(reason: impl Into<String>) -> Self {
        HarnessError::Plot { reason: reason.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn messages_carry_their_context(
            reason in ".*",
            frame in "[0-9,]*",
            line in 1usize..10_000usize,
        ) {
            let config = HarnessError::config(reason.clone());
            prop_assert!(config.to_string().contains(&reason));

            let parse = HarnessError::frame_parse(frame.clone(), "not an integer");
            prop_assert!(parse.to_string().contains(&frame));

            let trajectory = HarnessError::TrajectoryParse { line, details: reason.clone() };
            prop_assert!(trajectory.to_string().contains(&line.to_string()));
        }
    }

    #[test]
    fn classification_splits_pre_session_from_faults() {
        let unavailable = HarnessError::transport_unavailable("COM3", vec![]);
        assert!(unavailable.is_pre_session());
        assert!(!unavailable.is_session_fault());

        let write = HarnessError::WriteTimeout { duration: Duration::from_millis(50) };
        assert!(write.is_session_fault());
        assert!(!write.is_pre_session());

        let parse = HarnessError::frame_parse("1,abc", "invalid digit");
        assert!(parse.is_session_fault());

        let capture = HarnessError::CaptureUnavailable {
            path: PathBuf::from("flight-07.bin"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
        };
        assert!(capture.is_pre_session());
        assert!(!capture.to_string().contains("Serial port"));

        let plot = HarnessError::plot("empty log");
        assert!(!plot.is_session_fault());
        assert!(!plot.is_pre_session());
    }

    #[test]
    fn every_variant_has_suggestions() {
        let errors = [
            HarnessError::config("x"),
            HarnessError::invalid_trajectory("x"),
            HarnessError::TrajectoryParse { line: 1, details: "x".into() },
            HarnessError::TrajectoryFile {
                path: PathBuf::from("launch.txt"),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "x"),
            },
            HarnessError::transport_unavailable("COM3", vec![]),
            HarnessError::CaptureUnavailable {
                path: PathBuf::from("capture.bin"),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "x"),
            },
            HarnessError::transport("read", std::io::Error::other("x")),
            HarnessError::WriteTimeout { duration: Duration::from_millis(50) },
            HarnessError::TransportClosed,
            HarnessError::frame_parse("1,x", "x"),
            HarnessError::sink("log.txt", std::io::Error::other("x")),
            HarnessError::plot("x"),
        ];

        for error in &errors {
            assert!(!error.recovery_suggestions().is_empty(), "{error:?}");
        }
    }

    #[test]
    fn source_chain_is_preserved() {
        let error = HarnessError::transport(
            "read",
            std::io::Error::new(std::io::ErrorKind::BrokenPipe, "cable pulled"),
        );
        let source = std::error::Error::source(&error).expect("transport errors carry a source");
        assert_eq!(source.to_string(), "cable pulled");
    }

    #[test]
    fn error_traits_validation() {
        fn assert_send_sync_static<T: Send + Sync + 'static>() {}
        assert_send_sync_static::<HarnessError>();
    }
}
