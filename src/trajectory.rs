//! Simulated flight trajectory
//!
//! A [`TrajectoryModel`] holds a sparse, time-ordered table of altitude samples
//! and answers "altitude at time t" queries by clamped linear interpolation.
//!
//! The model itself is immutable. Queries that arrive in non-decreasing time
//! order (the normal case during a session) can carry a [`TrajectoryCursor`]
//! so each lookup resumes where the previous one stopped instead of scanning
//! from the start. The cursor only ever makes a lookup faster: any cursor,
//! including one that is stale or belongs to another model, yields the same
//! altitude as [`TrajectoryModel::altitude`].
//!
//! ```rust
//! use liftoff_hil::{Sample, TrajectoryCursor, TrajectoryModel};
//!
//! # fn main() -> liftoff_hil::Result<()> {
//! let model = TrajectoryModel::new(vec![Sample::new(0.0, 0.0), Sample::new(10.0, 100.0)])?;
//! let mut cursor = TrajectoryCursor::default();
//! assert_eq!(model.altitude_with(&mut cursor, 5.0), 50.0);
//! assert_eq!(model.altitude(-1.0), 0.0);
//! # Ok(())
//! # }
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

use crate::{HarnessError, Result};

/// One trajectory sample
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Time since simulated ignition in seconds
    pub time: f64,

    /// Altitude above the launch site in meters
    pub altitude: f64,
}

impl Sample {
    /// Create a new sample
    pub fn new(time: f64, altitude: f64) -> Self {
        Self { time, altitude }
    }
}

/// Lookup hint for monotonically increasing queries
///
/// Holds the index of the upper bracket found by the previous lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrajectoryCursor {
    index: usize,
}

impl Default for TrajectoryCursor {
    fn default() -> Self {
        Self { index: 1 }
    }
}

impl TrajectoryCursor {
    /// Index of the upper sample of the last interpolated segment
    pub fn index(&self) -> usize {
        self.index
    }
}

enum Lookup {
    Clamped(f64),
    Segment(usize),
}

/// Clamped linear interpolation over ordered samples
#[derive(Debug, Clone, PartialEq)]
pub struct TrajectoryModel {
    samples: Vec<Sample>,
}

impl TrajectoryModel {
    /// Build a model from an ordered sample table.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::InvalidTrajectory`] if the table is empty,
    /// contains non-finite values, or if times are not strictly increasing.
    /// Duplicate timestamps are rejected here so interpolation never divides
    /// by a zero time step.
    pub fn new(samples: Vec<Sample>) -> Result<Self> {
        if samples.is_empty() {
            return Err(HarnessError::invalid_trajectory("sample table is empty"));
        }

        for (index, sample) in samples.iter().enumerate() {
            if !sample.time.is_finite() || !sample.altitude.is_finite() {
                return Err(HarnessError::invalid_trajectory(format!(
                    "sample {} is not finite ({}, {})",
                    index, sample.time, sample.altitude
                )));
            }
        }

        if let Some(index) = samples.windows(2).position(|pair| pair[1].time <= pair[0].time) {
            let (prev, next) = (samples[index], samples[index + 1]);
            let problem = if prev.time == next.time { "duplicate timestamp" } else { "time goes backwards" };
            return Err(HarnessError::invalid_trajectory(format!(
                "{} between samples {} and {} ({} s, {} s)",
                problem,
                index,
                index + 1,
                prev.time,
                next.time
            )));
        }

        debug!(samples = samples.len(), "Trajectory model built");
        Ok(Self { samples })
    }

    /// Parse whitespace-separated `time altitude` columns.
    ///
    /// Text after `#` is a comment. Blank lines and extra columns are ignored.
    pub fn parse(text: &str) -> Result<Self> {
        let mut samples = Vec::new();

        for (number, line) in text.lines().enumerate() {
            let content = match line.find('#') {
                Some(comment) => &line[..comment],
                None => line,
            };

            let mut columns = content.split_whitespace();
            let Some(time) = columns.next() else {
                continue;
            };
            let altitude = columns.next().ok_or_else(|| HarnessError::TrajectoryParse {
                line: number + 1,
                details: "missing altitude column".to_string(),
            })?;

            samples.push(Sample::new(
                parse_column(time, number + 1, "time")?,
                parse_column(altitude, number + 1, "altitude")?,
            ));
        }

        Self::new(samples)
    }

    /// Load and parse a trajectory file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| HarnessError::TrajectoryFile { path: path.to_path_buf(), source: e })?;

        let model = Self::parse(&text)?;
        info!(
            "Loaded trajectory {}: {} samples over {:.2}s",
            path.display(),
            model.len(),
            model.duration()
        );
        Ok(model)
    }

    /// Altitude at time `t`, scanning from the start of the table.
    pub fn altitude(&self, t: f64) -> f64 {
        self.resolve(t, 1)
    }

    /// Altitude at time `t`, resuming the search from `cursor`.
    ///
    /// The search only starts at the cursor when `t` lies past the cursor's
    /// sample; otherwise it starts from the beginning. The cursor is moved to
    /// the upper sample of the interpolated segment.
    pub fn altitude_with(&self, cursor: &mut TrajectoryCursor, t: f64) -> f64 {
        let from = match self.samples.get(cursor.index) {
            Some(sample) if t > sample.time => cursor.index,
            _ => 1,
        };

        match self.lookup(t, from) {
            Lookup::Clamped(altitude) => altitude,
            Lookup::Segment(index) => {
                cursor.index = index;
                self.interpolate(index, t)
            }
        }
    }

    /// Number of samples
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Always false: empty tables are rejected at construction
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// The sample table
    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    /// Time span covered by the samples in seconds
    pub fn duration(&self) -> f64 {
        self.last().time - self.first().time
    }

    fn first(&self) -> Sample {
        self.samples[0]
    }

    fn last(&self) -> Sample {
        self.samples[self.samples.len() - 1]
    }

    fn resolve(&self, t: f64, from: usize) -> f64 {
        match self.lookup(t, from) {
            Lookup::Clamped(altitude) => altitude,
            Lookup::Segment(index) => self.interpolate(index, t),
        }
    }

    /// Find the smallest index `i >= from` with `t < time[i]`.
    fn lookup(&self, t: f64, from: usize) -> Lookup {
        let (first, last) = (self.first(), self.last());
        if t <= first.time {
            return Lookup::Clamped(first.altitude);
        }
        if t >= last.time {
            return Lookup::Clamped(last.altitude);
        }

        let from = from.max(1);
        self.samples[from..]
            .iter()
            .position(|sample| t < sample.time)
            .map(|offset| Lookup::Segment(from + offset))
            // Only reachable for NaN queries
            .unwrap_or(Lookup::Clamped(last.altitude))
    }

    fn interpolate(&self, index: usize, t: f64) -> f64 {
        let (lo, hi) = (self.samples[index - 1], self.samples[index]);
        lo.altitude + (hi.altitude - lo.altitude) * (t - lo.time) / (hi.time - lo.time)
    }
}

fn parse_column(value: &str, line: usize, column: &str) -> Result<f64> {
    value.parse::<f64>().map_err(|e| HarnessError::TrajectoryParse {
        line,
        details: format!("invalid {} '{}': {}", column, value, e),
    })
}
