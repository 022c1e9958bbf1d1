//! Hardware-in-the-loop session
//!
//! A [`SessionLoop`] owns everything a session touches: the transport, the
//! telemetry log, the trajectory and its lookup cursor, the unframed input
//! buffer and the last two state codes reported by the device.
//!
//! ```text
//! Connecting --settling delay, handshake--> Handshaking --first bytes--> Running
//!      \                                         \                         |
//!       +--------------- fault ------------------+---- fault / liftoff ---+--> Terminated
//! ```
//!
//! Each call to [`SessionLoop::step`] polls the transport once and reports
//! whether to continue, whether liftoff ended the session, or which fault did.
//! [`SessionLoop::run`] drives the steps, releases the transport and the log on
//! every exit path and hands the log to the plotter.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, error, info, trace, warn};

use crate::decode::LossyDecoder;
use crate::plot::Plotter;
use crate::protocol::{self, Inbound, Outbound};
use crate::sink::TelemetryLog;
use crate::transport::Transport;
use crate::{
    FrameExtractor, HarnessConfig, HarnessError, Result, TrajectoryCursor, TrajectoryModel,
};

/// Session lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Transport open, handshake not sent yet
    Connecting,

    /// Handshake sent, nothing received yet
    Handshaking,

    /// Exchanging frames with the device
    Running,

    /// Session over; absorbing
    Terminated,
}

/// Outcome of one [`SessionLoop::step`]
#[derive(Debug)]
pub enum Step {
    /// Keep polling
    Continue,

    /// Liftoff detected
    Terminate,

    /// Unrecoverable fault
    Fault(HarnessError),
}

/// Why a session ended
#[derive(Debug)]
pub enum SessionEnd {
    /// The device reported the pad-to-liftoff transition
    Liftoff,

    /// A fault ended the session early
    Fault(HarnessError),
}

/// Frame counters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionStats {
    /// Complete frames extracted
    pub frames: u64,

    /// Altitude requests answered
    pub requests_answered: u64,

    /// Telemetry lines logged
    pub telemetry_lines: u64,

    /// Frames of unknown type or shape
    pub ignored_frames: u64,

    /// Bytes discarded while resynchronising on frame markers
    pub dropped_bytes: u64,
}

/// Everything known once a session is over
#[derive(Debug)]
pub struct SessionReport {
    /// Liftoff or the fault that ended the session
    pub end: SessionEnd,

    /// Frame counters at the end of the session
    pub stats: SessionStats,

    /// State code before the last telemetry frame
    pub previous_state: String,

    /// State code of the last telemetry frame
    pub current_state: String,

    /// Telemetry log handed to the plotter
    pub log_path: PathBuf,

    /// Failures while closing the transport or the log
    pub release_errors: Vec<HarnessError>,

    /// Plotter failure, if any; does not change `end`
    pub plot_error: Option<HarnessError>,
}

impl SessionReport {
    /// True if the session ended on liftoff
    pub fn is_liftoff(&self) -> bool {
        matches!(self.end, SessionEnd::Liftoff)
    }
}

/// Stateful simulation loop
pub struct SessionLoop<T: Transport, W: Write = BufWriter<File>> {
    transport: T,
    log: TelemetryLog<W>,
    trajectory: TrajectoryModel,
    cursor: TrajectoryCursor,
    extractor: FrameExtractor,
    decoder: LossyDecoder,
    buffer: String,
    read_buf: Vec<u8>,
    previous_state: String,
    current_state: String,
    state: SessionState,
    stats: SessionStats,
    start_delay_s: f64,
    settling_delay: Duration,
    handshake_payload: String,
}

impl<T: Transport, W: Write> SessionLoop<T, W> {
    /// Assemble a session from already acquired resources.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::Config`] if the configuration is invalid.
    pub fn new(
        config: &HarnessConfig,
        trajectory: TrajectoryModel,
        transport: T,
        log: TelemetryLog<W>,
    ) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            transport,
            log,
            trajectory,
            cursor: TrajectoryCursor::default(),
            extractor: config.extractor()?,
            decoder: LossyDecoder::new(),
            buffer: String::new(),
            read_buf: vec![0; config.read_chunk],
            previous_state: String::new(),
            current_state: String::new(),
            state: SessionState::Connecting,
            stats: SessionStats::default(),
            start_delay_s: config.start_delay_s,
            settling_delay: config.settling_delay(),
            handshake_payload: config.handshake_payload.clone(),
        })
    }

    /// Current lifecycle state
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Previous and current state codes reported by the device
    pub fn state_codes(&self) -> (&str, &str) {
        (&self.previous_state, &self.current_state)
    }

    /// Counters so far
    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    /// Unframed input waiting for more bytes
    pub fn pending_input(&self) -> &str {
        &self.buffer
    }

    /// Wait for the device to settle, then send the handshake frame
    pub async fn handshake(&mut self) -> Result<()> {
        if !self.settling_delay.is_zero() {
            info!("Waiting {:?} for the flight computer to settle", self.settling_delay);
            tokio::time::sleep(self.settling_delay).await;
        }

        let handshake = Outbound::Handshake { payload: self.handshake_payload.clone() };
        let frame = self.extractor.encode(handshake.fields());
        self.transport.write_all(frame.as_bytes()).await?;

        self.state = SessionState::Handshaking;
        debug!("Handshake sent: {}", frame);
        Ok(())
    }

    /// Poll the transport once and process every complete frame received
    pub async fn step(&mut self) -> Step {
        if self.state == SessionState::Terminated {
            return Step::Terminate;
        }

        match self.poll().await {
            Ok(false) => Step::Continue,
            Ok(true) => {
                self.state = SessionState::Terminated;
                Step::Terminate
            }
            Err(e) => {
                self.state = SessionState::Terminated;
                Step::Fault(e)
            }
        }
    }

    /// Run the session to its end, release resources, then plot the log.
    ///
    /// Never fails: faults end the session and are reported in the returned
    /// [`SessionReport`].
    pub async fn run(mut self, plotter: &dyn Plotter, title: &str) -> SessionReport {
        info!("Session started on {}", self.transport.name());

        let end = match self.handshake().await {
            Err(e) => SessionEnd::Fault(e),
            Ok(()) => loop {
                match self.step().await {
                    Step::Continue => tokio::task::yield_now().await,
                    Step::Terminate => break SessionEnd::Liftoff,
                    Step::Fault(e) => break SessionEnd::Fault(e),
                }
            },
        };
        self.state = SessionState::Terminated;

        match &end {
            SessionEnd::Liftoff => info!(
                frames = self.stats.frames,
                telemetry = self.stats.telemetry_lines,
                "Liftoff detected, ending session"
            ),
            SessionEnd::Fault(e) => error!("Session ended by fault: {}", e),
        }

        let release_errors = self.release();
        info!("Disconnected");

        let log_path = self.log.path().to_path_buf();
        info!("Plotting {}", log_path.display());
        let plot_error = match plotter.plot(&log_path, title) {
            Ok(()) => None,
            Err(e) => {
                warn!("Plotting failed: {}", e);
                Some(e)
            }
        };

        SessionReport {
            end,
            stats: self.stats,
            previous_state: self.previous_state,
            current_state: self.current_state,
            log_path,
            release_errors,
            plot_error,
        }
    }

    /// Close the transport and the log; a failure of one does not skip the other
    fn release(&mut self) -> Vec<HarnessError> {
        let mut errors = Vec::new();

        if let Err(e) = self.transport.close() {
            warn!("Failed to close transport {}: {}", self.transport.name(), e);
            errors.push(e);
        }
        if let Err(e) = self.log.close() {
            warn!("Failed to close telemetry log: {}", e);
            errors.push(e);
        }
        self.buffer.push_str(&self.decoder.finish());
        if !self.buffer.is_empty() {
            debug!("Discarding {} bytes of unframed input", self.buffer.len());
        }

        errors
    }

    /// Returns `true` on liftoff
    async fn poll(&mut self) -> Result<bool> {
        let n = self.transport.read_available(&mut self.read_buf).await?;
        if n == 0 {
            return Ok(false);
        }

        if self.state == SessionState::Handshaking {
            self.state = SessionState::Running;
            info!("Flight computer responding");
        }

        let text = self.decoder.decode(&self.read_buf[..n]);
        self.buffer.push_str(&text);

        let extraction = self.extractor.extract(&self.buffer);
        self.buffer = extraction.leftover;
        if extraction.dropped_bytes > 0 {
            self.stats.dropped_bytes += extraction.dropped_bytes as u64;
            warn!(
                dropped = extraction.dropped_bytes,
                total = self.stats.dropped_bytes,
                "Discarded input while resynchronising on frame markers"
            );
        }

        for (index, payload) in extraction.frames.iter().enumerate() {
            self.stats.frames += 1;
            if self.dispatch(payload).await? {
                let unprocessed = extraction.frames.len() - index - 1;
                if unprocessed > 0 {
                    debug!(unprocessed, "Frames after liftoff are not processed");
                }
                return Ok(true);
            }
        }

        Ok(false)
    }

    /// Handle one frame; returns `true` on liftoff
    async fn dispatch(&mut self, payload: &str) -> Result<bool> {
        match Inbound::decode(payload)? {
            Inbound::AltitudeRequest { elapsed_ms } => {
                let t = protocol::flight_time(elapsed_ms, self.start_delay_s);
                let altitude = self.trajectory.altitude_with(&mut self.cursor, t);
                let response = Outbound::altitude_response(altitude);
                let frame = self.extractor.encode(response.fields());

                trace!(elapsed_ms, t, altitude, "Altitude request answered with {}", frame);
                self.transport.write_all(frame.as_bytes()).await?;
                self.stats.requests_answered += 1;
                Ok(false)
            }
            Inbound::Telemetry(telemetry) => {
                self.previous_state =
                    std::mem::replace(&mut self.current_state, telemetry.state_code.to_string());
                self.log.append(telemetry.raw)?;
                self.stats.telemetry_lines += 1;
                info!("{}", telemetry.raw);

                if self.previous_state != self.current_state {
                    debug!("State {:?} -> {:?}", self.previous_state, self.current_state);
                }
                Ok(protocol::is_liftoff(&self.previous_state, &self.current_state))
            }
            Inbound::Unrecognized => {
                self.stats.ignored_frames += 1;
                debug!("Ignoring frame '{}'", payload);
                Ok(false)
            }
        }
    }
}
