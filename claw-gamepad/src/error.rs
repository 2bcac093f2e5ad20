//! Gamepad control error types

use claw_transport::TransportError;
use thiserror::Error;

/// Errors from gamepad control operations
#[derive(Error, Debug)]
pub enum ClawError {
    /// Transport layer error
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Device reported a value outside the known range
    #[error("Unknown {field} value 0x{value:02X}")]
    UnknownEnumValue { field: &'static str, value: u8 },

    /// Read-back after a mode switch disagrees with what was written
    #[error("Verification failed: wrote {expected}, device reports {actual}")]
    VerificationMismatch { expected: String, actual: String },

    #[error("Unknown key symbol: {0}")]
    UnknownKeySymbol(String),

    #[error("Too many keys: {count} (max {max})")]
    TooManyKeys { count: usize, max: usize },

    #[error("No keyframes configured")]
    NoKeyframes,

    /// A multi-chunk write failed after some chunks were committed
    #[error("Partial write: {written} of {total} bytes committed: {source}")]
    PartialWrite {
        written: usize,
        total: usize,
        #[source]
        source: Box<ClawError>,
    },

    /// Firmware has no known remap layout
    #[error("Key remapping not supported on firmware {0:04x}")]
    RemapUnsupported(u16),

    /// Invalid parameter value
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Value exists but is not offered at the control surface
    #[error("Not selectable: {0}")]
    NotSelectable(String),
}
