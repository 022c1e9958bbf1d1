//! Bracket-delimited frame extraction
//!
//! The flight computer writes frames such as `<2,1200,35.4,12.1,P>` onto the
//! serial line. Reads arrive in arbitrary fragments, so the extractor works on
//! an accumulated text buffer and hands back whatever it could not consume yet.
//!
//! Extraction resynchronises on the end marker: for every end marker the
//! payload is whatever follows the *rightmost* start marker before it. Text in
//! front of that start marker (a truncated or corrupted frame) is discarded and
//! only counted in [`Extraction::dropped_bytes`].

use tracing::trace;

use crate::{HarnessError, Result};

/// Result of one extraction pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extraction {
    /// Unscanned tail, to be prepended to the next read
    pub leftover: String,

    /// Payloads in the order their end markers appeared
    pub frames: Vec<String>,

    /// Bytes discarded while resynchronising
    pub dropped_bytes: usize,
}

/// Extracts payloads enclosed by a start and an end marker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameExtractor {
    start: String,
    end: String,
}

impl Default for FrameExtractor {
    fn default() -> Self {
        Self { start: "<".to_string(), end: ">".to_string() }
    }
}

impl FrameExtractor {
    /// Create an extractor for the given markers.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::Config`] when the markers are equal, empty, or
    /// contain a carriage return or line feed (those are stripped before
    /// scanning, so such a marker could never match).
    pub fn new(start: impl Into<String>, end: impl Into<String>) -> Result<Self> {
        let (start, end) = (start.into(), end.into());
        if start.is_empty() || end.is_empty() {
            return Err(HarnessError::config("frame markers must not be empty"));
        }
        if [&start, &end].iter().any(|marker| marker.contains(['\r', '\n'])) {
            return Err(HarnessError::config("frame markers must not contain line breaks"));
        }
        if start == end {
            return Err(HarnessError::config(format!(
                "frame start and end markers are both '{}'",
                start
            )));
        }
        Ok(Self { start, end })
    }

    /// Start marker
    pub fn start(&self) -> &str {
        &self.start
    }

    /// End marker
    pub fn end(&self) -> &str {
        &self.end
    }

    /// Extract every complete frame from `text`.
    ///
    /// Carriage returns and line feeds are removed before scanning.
    pub fn extract(&self, text: &str) -> Extraction {
        let text: String = text.chars().filter(|c| !matches!(c, '\r' | '\n')).collect();

        let mut extraction = Extraction::default();
        let mut rest = text.as_str();

        while let Some((before, after)) = rest.split_once(self.end.as_str()) {
            match before.rfind(self.start.as_str()) {
                Some(index) => {
                    extraction.dropped_bytes += index;
                    extraction.frames.push(before[index + self.start.len()..].to_string());
                }
                None => extraction.dropped_bytes += before.len(),
            }
            rest = after;
        }

        extraction.leftover = rest.to_string();
        trace!(
            frames = extraction.frames.len(),
            leftover = extraction.leftover.len(),
            dropped = extraction.dropped_bytes,
            "Extracted frames"
        );
        extraction
    }

    /// Wrap fields into a frame: start marker, comma-joined fields, end marker
    pub fn encode<I, S>(&self, fields: I) -> String
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut frame = self.start.clone();
        for (index, field) in fields.into_iter().enumerate() {
            if index > 0 {
                frame.push(',');
            }
            frame.push_str(field.as_ref());
        }
        frame.push_str(&self.end);
        frame
    }
}
