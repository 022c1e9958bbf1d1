//! Flight computer wire protocol
//!
//! | Direction | Type | Fields                          |
//! |-----------|------|---------------------------------|
//! | out       | 6    | `1` (handshake)                 |
//! | in        | 1    | elapsed milliseconds            |
//! | out       | 7    | altitude in centimeters         |
//! | in        | 2    | f1, f2, f3, state code          |
//!
//! Payloads are comma-separated and carry no escaping.

use std::fmt;

use crate::{HarnessError, Result};

/// Type field of the handshake frame
pub const HANDSHAKE_TYPE: &str = "6";

/// Type field of an altitude request
pub const ALTITUDE_REQUEST_TYPE: &str = "1";

/// Type field of an altitude response
pub const ALTITUDE_RESPONSE_TYPE: &str = "7";

/// Type field of a telemetry frame
pub const TELEMETRY_TYPE: &str = "2";

/// State code reported while the rocket waits on the pad
pub const STATE_PAD: &str = "P";

/// State code reported once liftoff is detected
pub const STATE_LIFTOFF: &str = "L";

const TELEMETRY_FIELDS: usize = 5;

/// A decoded inbound frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound<'a> {
    /// Device asks for the simulated altitude at its elapsed time
    AltitudeRequest { elapsed_ms: i64 },

    /// Device status line
    Telemetry(Telemetry<'a>),

    /// Anything else, including known types with too few fields
    Unrecognized,
}

/// Telemetry frame borrowed from its payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Telemetry<'a> {
    /// Full payload, logged verbatim
    pub raw: &'a str,

    /// Fifth field, the flight state code
    pub state_code: &'a str,
}

impl<'a> Inbound<'a> {
    /// Classify a frame payload.
    ///
    /// # Errors
    ///
    /// An altitude request whose elapsed time is not an integer is a
    /// [`HarnessError::FrameParse`]. Payloads of unknown type or with too
    /// few fields are [`Inbound::Unrecognized`], not errors.
    pub fn decode(payload: &'a str) -> Result<Self> {
        let fields: Vec<&str> = payload.split(',').collect();

        match fields.as_slice() {
            [ALTITUDE_REQUEST_TYPE, elapsed, ..] => {
                let elapsed_ms = elapsed
                    .trim()
                    .parse::<i64>()
                    .map_err(|e| HarnessError::frame_parse(payload, format!("elapsed time: {}", e)))?;
                Ok(Inbound::AltitudeRequest { elapsed_ms })
            }
            [TELEMETRY_TYPE, ..] if fields.len() >= TELEMETRY_FIELDS => {
                Ok(Inbound::Telemetry(Telemetry { raw: payload, state_code: fields[4] }))
            }
            _ => Ok(Inbound::Unrecognized),
        }
    }
}

/// A frame sent to the device
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    /// Sent once after the settling delay
    Handshake { payload: String },

    /// Answer to an altitude request
    AltitudeResponse { centimeters: i64 },
}

impl Outbound {
    /// Response for an altitude in meters, truncated to whole centimeters
    pub fn altitude_response(altitude_m: f64) -> Self {
        Outbound::AltitudeResponse { centimeters: (altitude_m * 100.0).trunc() as i64 }
    }

    /// Payload fields, type first
    pub fn fields(&self) -> [String; 2] {
        match self {
            Outbound::Handshake { payload } => [HANDSHAKE_TYPE.to_string(), payload.clone()],
            Outbound::AltitudeResponse { centimeters } => {
                [ALTITUDE_RESPONSE_TYPE.to_string(), centimeters.to_string()]
            }
        }
    }
}

impl fmt::Display for Outbound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.fields().join(","))
    }
}

/// Simulated flight time for a request: elapsed device time minus the start delay
pub fn flight_time(elapsed_ms: i64, start_delay_s: f64) -> f64 {
    elapsed_ms as f64 / 1000.0 - start_delay_s
}

/// True on the pad-to-liftoff edge that ends a session
pub fn is_liftoff(previous: &str, current: &str) -> bool {
    previous != current && previous == STATE_PAD && current == STATE_LIFTOFF
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_altitude_request() {
        assert_eq!(Inbound::decode("1,5000").unwrap(), Inbound::AltitudeRequest { elapsed_ms: 5000 });
        assert_eq!(Inbound::decode("1, 42 ").unwrap(), Inbound::AltitudeRequest { elapsed_ms: 42 });
        assert_eq!(Inbound::decode("1,-20,x").unwrap(), Inbound::AltitudeRequest { elapsed_ms: -20 });
    }

    #[test]
    fn non_numeric_elapsed_time_is_an_error() {
        let error = Inbound::decode("1,12a").unwrap_err();
        assert!(matches!(error, HarnessError::FrameParse { .. }));
        assert!(error.to_string().contains("1,12a"));
    }

    #[test]
    fn decodes_telemetry() {
        let inbound = Inbound::decode("2,1200,35.4,12.1,P").unwrap();
        assert_eq!(
            inbound,
            Inbound::Telemetry(Telemetry { raw: "2,1200,35.4,12.1,P", state_code: "P" })
        );

        let extended = Inbound::decode("2,1,2,3,L,extra").unwrap();
        assert!(matches!(extended, Inbound::Telemetry(Telemetry { state_code: "L", .. })));
    }

    #[test]
    fn unknown_or_short_frames_are_unrecognized() {
        for payload in ["", "9,1", "1", "2,1,2,3", "7,5000", "x,y,z"] {
            assert_eq!(Inbound::decode(payload).unwrap(), Inbound::Unrecognized, "{payload}");
        }
    }

    #[test]
    fn altitude_response_truncates_to_centimeters() {
        assert_eq!(Outbound::altitude_response(50.0).to_string(), "7,5000");
        assert_eq!(Outbound::altitude_response(1.239).to_string(), "7,123");
        assert_eq!(Outbound::altitude_response(-0.019).to_string(), "7,-1");
    }

    #[test]
    fn handshake_fields() {
        let handshake = Outbound::Handshake { payload: "1".to_string() };
        assert_eq!(handshake.fields(), ["6".to_string(), "1".to_string()]);
    }

    #[test]
    fn flight_time_subtracts_start_delay() {
        assert_eq!(flight_time(5000, 0.0), 5.0);
        assert_eq!(flight_time(2500, 1.5), 1.0);
        assert!(flight_time(0, 3.0) < 0.0);
    }

    #[test]
    fn liftoff_only_on_pad_to_liftoff_edge() {
        assert!(is_liftoff("P", "L"));
        assert!(!is_liftoff("P", "P"));
        assert!(!is_liftoff("", "L"));
        assert!(!is_liftoff("L", "L"));
        assert!(!is_liftoff("I", "L"));
    }
}
