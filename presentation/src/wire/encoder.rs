//! Event framing
//!
//! Each [`EnsembleEvent`] becomes one self-contained frame:
//! `data: <compact JSON>\n\n`. Serialized JSON never contains a raw newline
//! (string newlines are escaped), so a frame can always be split on the
//! blank line that terminates it.

use ensemble_domain::EnsembleEvent;

pub const FRAME_PREFIX: &str = "data: ";
pub const FRAME_TERMINATOR: &str = "\n\n";

#[derive(Debug, Clone, Copy, Default)]
pub struct EventEncoder;

impl EventEncoder {
    /// Encode one event as a complete frame.
    pub fn encode(&self, event: &EnsembleEvent) -> Result<String, serde_json::Error> {
        let json = serde_json::to_string(event)?;
        Ok(format!("{FRAME_PREFIX}{json}{FRAME_TERMINATOR}"))
    }

    /// Split a byte stream back into events, ignoring anything that is not a
    /// well-formed frame.
    pub fn decode_all(&self, stream: &str) -> Vec<EnsembleEvent> {
        stream
            .split(FRAME_TERMINATOR)
            .filter_map(|frame| frame.strip_prefix(FRAME_PREFIX))
            .filter_map(|json| serde_json::from_str(json).ok())
            .collect()
    }
}
