//! Test utilities shared by unit tests and benchmarks
//!
//! Provides small trajectories, a configuration without the settling delay,
//! scratch directories under the system temp dir and a plotter that records
//! its calls instead of rendering.

#![cfg(any(test, feature = "benchmark"))]

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::plot::Plotter;
use crate::{HarnessConfig, Result, Sample, TrajectoryModel};

/// Defaults with no settling delay, so session tests start immediately
pub fn fast_config() -> HarnessConfig {
    HarnessConfig { settling_delay_s: 0.0, ..Default::default() }
}

/// Two samples: 0 m at 0 s, 100 m at 10 s
pub fn linear_trajectory() -> TrajectoryModel {
    TrajectoryModel::new(vec![Sample::new(0.0, 0.0), Sample::new(10.0, 100.0)])
        .unwrap_or_else(|e| panic!("linear trajectory is valid: {e}"))
}

/// A boost-coast-descent profile sampled every `step` seconds
pub fn flight_profile(step: f64, duration: f64) -> TrajectoryModel {
    let count = (duration / step).ceil() as usize + 1;
    let samples = (0..count)
        .map(|i| {
            let t = i as f64 * step;
            let altitude = if t < 3.0 { 15.0 * t * t } else { 135.0 + 90.0 * (t - 3.0) - 4.9 * (t - 3.0).powi(2) };
            Sample::new(t, altitude.max(0.0))
        })
        .collect();
    TrajectoryModel::new(samples).unwrap_or_else(|e| panic!("flight profile is valid: {e}"))
}

/// Fresh, empty directory for one test
pub fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("liftoff-hil-{}-{}", name, std::process::id()));
    // Start clean even if an earlier run left files behind
    let _ = std::fs::remove_dir_all(&dir);
    if let Err(e) = std::fs::create_dir_all(&dir) {
        panic!("cannot create scratch dir {}: {e}", dir.display());
    }
    dir
}

/// Plotter that records `(log path, title)` for every call
#[derive(Debug, Default)]
pub struct RecordingPlotter {
    calls: Mutex<Vec<(PathBuf, String)>>,
}

impl RecordingPlotter {
    /// Calls received so far
    pub fn calls(&self) -> Vec<(PathBuf, String)> {
        self.calls.lock().map(|calls| calls.clone()).unwrap_or_default()
    }
}

impl Plotter for RecordingPlotter {
    fn plot(&self, log_path: &Path, title: &str) -> Result<()> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push((log_path.to_path_buf(), title.to_string()));
        }
        Ok(())
    }
}
