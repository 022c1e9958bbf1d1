//! Hardware-in-the-loop harness for a rocket flight computer.
//!
//! The harness simulates a flight trajectory and feeds synthetic altitude
//! readings to a physical flight computer over a serial link, logs the
//! telemetry the device reports, and ends the session when the device reports
//! the transition from pad to liftoff.
//!
//! # Components
//!
//! - [`TrajectoryModel`]: clamped linear interpolation over time/altitude samples
//! - [`FrameExtractor`]: pulls `<...>` frames out of a fragmented byte stream
//! - [`SessionLoop`]: answers altitude requests, logs telemetry, detects liftoff
//! - [`Transport`]: the byte-stream seam, with serial and scripted implementations
//! - [`Plotter`]: receives the finished telemetry log
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use liftoff_hil::{EventSummaryPlotter, Harness, HarnessConfig};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> liftoff_hil::Result<()> {
//!     let config = HarnessConfig { start_delay_s: 10.0, ..Default::default() };
//!     let report =
//!         Harness::run_serial("/dev/ttyUSB0", "launch-09.txt", &config, &EventSummaryPlotter).await?;
//!     println!("Liftoff: {}", report.is_liftoff());
//!     Ok(())
//! }
//! ```

// Core types and error handling
pub mod config;
pub mod decode;
mod error;
pub mod framing;
pub mod protocol;
#[cfg_attr(any(test, feature = "benchmark"), path = "test_utils.rs")]
#[cfg(any(test, feature = "benchmark"))]
pub mod test_utils;
pub mod trajectory;

// Session and its collaborators
pub mod plot;
pub mod session;
pub mod sink;
pub mod transport;
pub mod transports;

// Core exports
pub use config::HarnessConfig;
pub use error::*;
pub use framing::{Extraction, FrameExtractor};
pub use trajectory::{Sample, TrajectoryCursor, TrajectoryModel};

// Session exports
pub use plot::{EventSummaryPlotter, Plotter};
pub use session::{SessionEnd, SessionLoop, SessionReport, SessionState, SessionStats, Step};
pub use sink::{TelemetryLog, log_path_for};
pub use transport::Transport;
pub use transports::{ScriptedTransport, SerialTransport};

use std::path::Path;
use tracing::info;

/// Entry point for running a complete session.
///
/// Loads the trajectory, acquires the transport and the telemetry log, runs
/// the session to liftoff or fault, releases everything and plots the log.
/// The log is written next to the trajectory file (see [`log_path_for`]) and
/// the trajectory path is used as the plot title.
pub struct Harness;

impl Harness {
    /// Run a session against a serial port.
    ///
    /// # Errors
    ///
    /// Only pre-session errors are returned: invalid configuration, a missing
    /// or malformed trajectory file, an unavailable port (with the list of
    /// present ports) or an uncreatable log. Faults during the session are
    /// reported in the [`SessionReport`].
    pub async fn run_serial<P: AsRef<Path>>(
        port: &str,
        trajectory_path: P,
        config: &HarnessConfig,
        plotter: &dyn Plotter,
    ) -> Result<SessionReport> {
        config.validate()?;
        let trajectory_path = trajectory_path.as_ref();
        let trajectory = TrajectoryModel::load(trajectory_path)?;
        let transport = SerialTransport::open(port, config)?;

        Self::start(transport, trajectory, trajectory_path, config, plotter).await
    }

    /// Run a session over any transport.
    ///
    /// # Errors
    ///
    /// Same pre-session errors as [`Harness::run_serial`], minus port discovery.
    pub async fn run<T: Transport, P: AsRef<Path>>(
        transport: T,
        trajectory_path: P,
        config: &HarnessConfig,
        plotter: &dyn Plotter,
    ) -> Result<SessionReport> {
        config.validate()?;
        let trajectory_path = trajectory_path.as_ref();
        let trajectory = TrajectoryModel::load(trajectory_path)?;

        Self::start(transport, trajectory, trajectory_path, config, plotter).await
    }

    async fn start<T: Transport>(
        transport: T,
        trajectory: TrajectoryModel,
        trajectory_path: &Path,
        config: &HarnessConfig,
        plotter: &dyn Plotter,
    ) -> Result<SessionReport> {
        let log_path = log_path_for(trajectory_path);
        let log = TelemetryLog::create(&log_path)?;
        info!("Recording telemetry to {}", log_path.display());

        let session = SessionLoop::new(config, trajectory, transport, log)?;
        Ok(session.run(plotter, &trajectory_path.display().to_string()).await)
    }
}
