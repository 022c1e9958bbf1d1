//! Post-session hand-off of the telemetry log
//!
//! The session never renders anything itself. When it ends it passes the log
//! path and a title to a [`Plotter`]. [`EventSummaryPlotter`] is the bundled
//! implementation: it reads the log back, finds the flight events (state
//! changes) and writes them next to the log as YAML for whatever plotting
//! tool the operator uses.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::{HarnessError, Result};

/// Receives the finished telemetry log
pub trait Plotter {
    /// Render or summarise the log at `log_path`
    fn plot(&self, log_path: &Path, title: &str) -> Result<()>;
}

/// One parsed telemetry line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryRecord {
    /// Device time in seconds
    pub time_s: f64,

    /// Estimated altitude in meters
    pub altitude_m: f64,

    /// Estimated vertical speed in m/s
    pub speed_mps: f64,

    /// Flight state code
    pub state: String,
}

impl TelemetryRecord {
    /// Parse `2,<time ms>,<altitude>,<speed>,<state>`
    pub fn parse(line: &str) -> Option<Self> {
        let fields: Vec<&str> = line.trim().split(',').collect();
        if fields.len() < 5 {
            return None;
        }
        Some(Self {
            time_s: fields[1].trim().parse::<f64>().ok()? / 1000.0,
            altitude_m: fields[2].trim().parse().ok()?,
            speed_mps: fields[3].trim().parse().ok()?,
            state: fields[4].trim().to_string(),
        })
    }
}

/// A state change: the last sample of the old state, labelled with the new state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlightEvent {
    /// Device time of the last sample before the change, in seconds
    pub time_s: f64,

    /// Altitude at that sample in meters
    pub altitude_m: f64,

    /// Vertical speed at that sample in m/s
    pub speed_mps: f64,

    /// State entered
    pub state: String,
}

/// Everything written to the summary file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlightSummary {
    /// Plot title, the trajectory path
    pub title: String,

    /// Telemetry lines parsed
    pub records: usize,

    /// Lines that could not be parsed
    pub skipped_lines: usize,

    /// Highest reported altitude, if any line parsed
    pub max_altitude_m: Option<f64>,

    /// Highest reported vertical speed, if any line parsed
    pub max_speed_mps: Option<f64>,

    /// State changes in log order
    pub events: Vec<FlightEvent>,
}

/// Collect state changes in log order
pub fn extract_events(records: &[TelemetryRecord]) -> Vec<FlightEvent> {
    records
        .windows(2)
        .filter(|pair| pair[1].state != pair[0].state)
        .map(|pair| FlightEvent {
            time_s: pair[0].time_s,
            altitude_m: pair[0].altitude_m,
            speed_mps: pair[0].speed_mps,
            state: pair[1].state.clone(),
        })
        .collect()
}

/// Writes `<log stem>-events.yaml` beside the telemetry log
#[derive(Debug, Clone, Default)]
pub struct EventSummaryPlotter;

impl EventSummaryPlotter {
    /// Where the summary for `log_path` goes
    pub fn summary_path(log_path: &Path) -> PathBuf {
        let stem = log_path.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default();
        log_path.with_file_name(format!("{}-events.yaml", stem))
    }

    /// Read the log and build its summary
    pub fn summarize(log_path: &Path, title: &str) -> Result<FlightSummary> {
        let text = std::fs::read_to_string(log_path).map_err(|e| {
            HarnessError::plot(format!("cannot read {}: {}", log_path.display(), e))
        })?;

        let mut records = Vec::new();
        let mut skipped_lines = 0;
        for (number, line) in text.lines().enumerate() {
            if line.trim().is_empty() || line.starts_with('#') {
                continue;
            }
            match TelemetryRecord::parse(line) {
                Some(record) => records.push(record),
                None => {
                    warn!("Skipping unparseable telemetry line {}: {}", number + 1, line);
                    skipped_lines += 1;
                }
            }
        }

        let max_altitude_m = records.iter().map(|r| r.altitude_m).reduce(f64::max);
        let max_speed_mps = records.iter().map(|r| r.speed_mps).reduce(f64::max);

        Ok(FlightSummary {
            title: title.to_string(),
            records: records.len(),
            skipped_lines,
            max_altitude_m,
            max_speed_mps,
            events: extract_events(&records),
        })
    }
}

impl Plotter for EventSummaryPlotter {
    fn plot(&self, log_path: &Path, title: &str) -> Result<()> {
        let summary = Self::summarize(log_path, title)?;

        for event in &summary.events {
            info!(
                "{} at {:.3}s ({} m, {} m/s)",
                event.state, event.time_s, event.altitude_m as i64, event.speed_mps as i64
            );
        }

        let yaml = serde_yaml_ng::to_string(&summary).map_err(|e| HarnessError::plot(e.to_string()))?;
        let path = Self::summary_path(log_path);
        std::fs::write(&path, yaml)
            .map_err(|e| HarnessError::plot(format!("cannot write {}: {}", path.display(), e)))?;

        info!("Flight summary for '{}' written to {}", title, path.display());
        Ok(())
    }
}
