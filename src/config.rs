//! Harness configuration
//!
//! Every field has a default matching the flight computer's firmware, so an
//! empty YAML document is a valid configuration:
//!
//! ```yaml
//! baud_rate: 115200
//! read_timeout_ms: 1
//! write_timeout_ms: 50
//! settling_delay_s: 5.0
//! start_delay_s: 0.0
//! frame_start: "<"
//! frame_end: ">"
//! handshake_payload: "1"
//! read_chunk: 4096
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::debug;

use crate::{FrameExtractor, HarnessError, Result};

/// Serial link and session parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HarnessConfig {
    /// Serial baud rate
    pub baud_rate: u32,

    /// Poll timeout for a single transport read
    pub read_timeout_ms: u64,

    /// Deadline for a single frame write
    pub write_timeout_ms: u64,

    /// Wait between opening the port and sending the handshake
    pub settling_delay_s: f64,

    /// Device time at which the simulated flight starts
    pub start_delay_s: f64,

    /// Frame start marker
    pub frame_start: String,

    /// Frame end marker
    pub frame_end: String,

    /// Payload field of the handshake frame
    pub handshake_payload: String,

    /// Maximum bytes taken from the transport per poll
    pub read_chunk: usize,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            baud_rate: 115_200,
            read_timeout_ms: 1,
            write_timeout_ms: 50,
            settling_delay_s: 5.0,
            start_delay_s: 0.0,
            frame_start: "<".to_string(),
            frame_end: ">".to_string(),
            handshake_payload: "1".to_string(),
            read_chunk: 4096,
        }
    }
}

impl HarnessConfig {
    /// Parse a YAML document
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml_ng::from_str(yaml).map_err(|e| HarnessError::config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a YAML configuration file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path).map_err(|e| {
            HarnessError::config(format!("cannot read {}: {}", path.display(), e))
        })?;
        debug!("Loaded configuration from {}", path.display());
        Self::from_yaml(&yaml)
    }

    /// Check the configuration before any session activity
    pub fn validate(&self) -> Result<()> {
        if self.baud_rate == 0 {
            return Err(HarnessError::config("baud rate must be positive"));
        }
        if self.read_chunk == 0 {
            return Err(HarnessError::config("read chunk must be positive"));
        }
        for (name, value) in
            [("settling delay", self.settling_delay_s), ("start delay", self.start_delay_s)]
        {
            if !value.is_finite() {
                return Err(HarnessError::config(format!("{} must be finite", name)));
            }
        }
        if self.settling_delay_s < 0.0 {
            return Err(HarnessError::config("settling delay must not be negative"));
        }
        Duration::try_from_secs_f64(self.settling_delay_s)
            .map_err(|e| HarnessError::config(format!("settling delay: {}", e)))?;
        if self.handshake_payload.contains(',') {
            return Err(HarnessError::config("handshake payload must be a single field"));
        }
        self.extractor().map(|_| ())
    }

    /// Frame extractor for the configured markers
    pub fn extractor(&self) -> Result<FrameExtractor> {
        FrameExtractor::new(self.frame_start.as_str(), self.frame_end.as_str())
    }

    /// Read poll timeout
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    /// Write deadline
    pub fn write_timeout(&self) -> Duration {
        Duration::from_millis(self.write_timeout_ms)
    }

    /// Settling delay before the handshake
    ///
    /// Zero for values [`HarnessConfig::validate`] rejects.
    pub fn settling_delay(&self) -> Duration {
        Duration::try_from_secs_f64(self.settling_delay_s).unwrap_or_default()
    }
}
