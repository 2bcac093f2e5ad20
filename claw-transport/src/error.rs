//! Transport error types

use thiserror::Error;

/// Errors that can occur on the control channel
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    /// No control-capable transport is bound to the channel
    #[error("Control interface not ready")]
    NotReady,

    #[error("Short write: {written} of {expected} bytes transferred")]
    ShortWrite { written: usize, expected: usize },

    #[error("Command body too long: {len} bytes (max {max})")]
    InvalidLength { len: usize, max: usize },

    #[error("Communication timeout")]
    Timeout,

    #[error("Short read: expected {expected} bytes, got {got}")]
    ShortRead { expected: usize, got: usize },

    #[error("Unexpected response: expected 0x{expected:02X}, got 0x{got:02X}")]
    UnexpectedResponse { expected: u8, got: u8 },

    /// Inbound queue is full; the frame was dropped
    #[error("Inbound queue overflow (capacity {capacity})")]
    QueueOverflow { capacity: usize },

    #[error("HID error: {0}")]
    HidError(String),

    #[error("HID permission denied: {0}")]
    HidPermissionDenied(String),
}

impl From<hidapi::HidError> for TransportError {
    fn from(e: hidapi::HidError) -> Self {
        let msg = e.to_string();
        if msg.contains("Permission denied") || msg.contains("EPERM") {
            TransportError::HidPermissionDenied(msg)
        } else {
            TransportError::HidError(msg)
        }
    }
}
