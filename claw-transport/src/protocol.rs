//! Protocol constants and the frame codec for the Claw control interface
//!
//! Every exchange on the control interface is a fixed 64-byte report:
//!
//! ```text
//! request:  [0x0F, 0x00, 0x00, 0x3C, command_type, body (<= 59 bytes)..., 0...]
//! response: [0x10, 0x00, 0x00, 0x3C, command_type, payload...]
//! ```

use std::fmt;

use thiserror::Error;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use crate::error::TransportError;

/// Control protocol command types
pub mod cmd {
    pub const ENTER_PROFILE_CONFIG: u8 = 0x01;
    pub const EXIT_PROFILE_CONFIG: u8 = 0x02;
    /// Write profile data, pre-0x21 firmware
    pub const WRITE_PROFILE_LEGACY: u8 = 0x03;
    pub const READ_PROFILE: u8 = 0x04;
    pub const READ_PROFILE_ACK: u8 = 0x05;
    /// Generic acknowledgment
    pub const ACK: u8 = 0x06;
    pub const SWITCH_PROFILE: u8 = 0x07;
    pub const WRITE_PROFILE_TO_EEPROM: u8 = 0x08;
    pub const SYNC_RGB: u8 = 0x09;
    pub const READ_RGB_STATUS_ACK: u8 = 0x0A;
    pub const READ_CURRENT_PROFILE: u8 = 0x0B;
    pub const READ_CURRENT_PROFILE_ACK: u8 = 0x0C;
    pub const READ_RGB_STATUS: u8 = 0x0D;
    /// Write profile data (remap slots, RGB animation buffer)
    pub const WRITE_PROFILE_DATA: u8 = 0x21;
    /// Persist staged configuration; answered by two ACKs
    pub const SYNC_TO_ROM: u8 = 0x22;
    pub const RESTORE_FROM_ROM: u8 = 0x23;
    pub const SWITCH_MODE: u8 = 0x24;
    pub const READ_GAMEPAD_MODE: u8 = 0x26;
    pub const GAMEPAD_MODE_ACK: u8 = 0x27;
    pub const RESET_DEVICE: u8 = 0x28;
    pub const RGB_CONTROL: u8 = 0xE0;
    pub const CALIBRATION_CONTROL: u8 = 0xFD;
    pub const CALIBRATION_ACK: u8 = 0xFE;

    /// Every command type the device is known to use
    pub const ALL: &[u8] = &[
        ENTER_PROFILE_CONFIG,
        EXIT_PROFILE_CONFIG,
        WRITE_PROFILE_LEGACY,
        READ_PROFILE,
        READ_PROFILE_ACK,
        ACK,
        SWITCH_PROFILE,
        WRITE_PROFILE_TO_EEPROM,
        SYNC_RGB,
        READ_RGB_STATUS_ACK,
        READ_CURRENT_PROFILE,
        READ_CURRENT_PROFILE_ACK,
        READ_RGB_STATUS,
        WRITE_PROFILE_DATA,
        SYNC_TO_ROM,
        RESTORE_FROM_ROM,
        SWITCH_MODE,
        READ_GAMEPAD_MODE,
        GAMEPAD_MODE_ACK,
        RESET_DEVICE,
        RGB_CONTROL,
        CALIBRATION_CONTROL,
        CALIBRATION_ACK,
    ];

    /// Get human-readable name for command byte
    pub fn name(cmd: u8) -> &'static str {
        match cmd {
            ENTER_PROFILE_CONFIG => "ENTER_PROFILE_CONFIG",
            EXIT_PROFILE_CONFIG => "EXIT_PROFILE_CONFIG",
            WRITE_PROFILE_LEGACY => "WRITE_PROFILE_LEGACY",
            READ_PROFILE => "READ_PROFILE",
            READ_PROFILE_ACK => "READ_PROFILE_ACK",
            ACK => "ACK",
            SWITCH_PROFILE => "SWITCH_PROFILE",
            WRITE_PROFILE_TO_EEPROM => "WRITE_PROFILE_TO_EEPROM",
            SYNC_RGB => "SYNC_RGB",
            READ_RGB_STATUS_ACK => "READ_RGB_STATUS_ACK",
            READ_CURRENT_PROFILE => "READ_CURRENT_PROFILE",
            READ_CURRENT_PROFILE_ACK => "READ_CURRENT_PROFILE_ACK",
            READ_RGB_STATUS => "READ_RGB_STATUS",
            WRITE_PROFILE_DATA => "WRITE_PROFILE_DATA",
            SYNC_TO_ROM => "SYNC_TO_ROM",
            RESTORE_FROM_ROM => "RESTORE_FROM_ROM",
            SWITCH_MODE => "SWITCH_MODE",
            READ_GAMEPAD_MODE => "READ_GAMEPAD_MODE",
            GAMEPAD_MODE_ACK => "GAMEPAD_MODE_ACK",
            RESET_DEVICE => "RESET_DEVICE",
            RGB_CONTROL => "RGB_CONTROL",
            CALIBRATION_CONTROL => "CALIBRATION_CONTROL",
            CALIBRATION_ACK => "CALIBRATION_ACK",
            _ => "UNKNOWN",
        }
    }
}

/// Size of every report in both directions
pub const REPORT_SIZE: usize = 64;

/// Report ID of host-to-device control reports
pub const REQUEST_REPORT_ID: u8 = 0x0F;

/// Report ID of device-to-host control reports
pub const RESPONSE_REPORT_ID: u8 = 0x10;

/// Fixed marker at offset 3 of every control report
pub const FRAME_MARKER: u8 = 0x3C;

/// Header bytes preceding the body
pub const HEADER_SIZE: usize = 5;

/// Maximum body length of a request
pub const BODY_CAPACITY: usize = REPORT_SIZE - HEADER_SIZE;

/// Offset of the command type byte
pub const COMMAND_TYPE_OFFSET: usize = 4;

/// Protocol timing defaults
///
/// The firmware is given a number of queue polls to answer; the deadlines
/// below are those counts at the default poll interval.
pub mod timing {
    /// Interval between inbound queue polls
    pub const POLL_INTERVAL_MS: u64 = 20;
    /// Polls allowed for an ACK after a write command
    pub const ACK_TIMEOUT_POLLS: u64 = 1000;
    /// Polls allowed for the reply to a read-style command
    pub const READ_TIMEOUT_POLLS: u64 = 50;
    /// Deadline for an ACK (20 s)
    pub const ACK_TIMEOUT_MS: u64 = ACK_TIMEOUT_POLLS * POLL_INTERVAL_MS;
    /// Deadline for a read reply (1 s)
    pub const READ_TIMEOUT_MS: u64 = READ_TIMEOUT_POLLS * POLL_INTERVAL_MS;
    /// Settle time after resume before the mode is re-asserted
    pub const RESUME_DELAY_MS: u64 = 500;
}

/// Fixed 5-byte frame header
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoBytes, FromBytes, KnownLayout, Immutable)]
#[repr(C)]
pub struct FrameHeader {
    pub report_id: u8,
    _reserved0: u8,
    _reserved1: u8,
    pub marker: u8,
    pub command_type: u8,
}

impl FrameHeader {
    /// Header of a host-to-device request
    pub fn request(command_type: u8) -> Self {
        Self {
            report_id: REQUEST_REPORT_ID,
            _reserved0: 0,
            _reserved1: 0,
            marker: FRAME_MARKER,
            command_type,
        }
    }

    /// Compare against the expected response header, returning the first
    /// mismatching `(offset, expected, got)`.
    fn check_response(&self) -> Option<(usize, u8, u8)> {
        let expected = [RESPONSE_REPORT_ID, 0x00, 0x00, FRAME_MARKER];
        let got = &self.as_bytes()[..expected.len()];
        expected
            .iter()
            .zip(got)
            .enumerate()
            .find(|(_, (e, g))| e != g)
            .map(|(offset, (&e, &g))| (offset, e, g))
    }
}

/// Serialize a request into a full 64-byte report
pub fn build_frame(command_type: u8, body: &[u8]) -> Result<[u8; REPORT_SIZE], TransportError> {
    if body.len() > BODY_CAPACITY {
        return Err(TransportError::InvalidLength {
            len: body.len(),
            max: BODY_CAPACITY,
        });
    }

    let mut buf = [0u8; REPORT_SIZE];
    buf[..HEADER_SIZE].copy_from_slice(FrameHeader::request(command_type).as_bytes());
    buf[HEADER_SIZE..HEADER_SIZE + body.len()].copy_from_slice(body);
    Ok(buf)
}

/// Split a request report back into `(command_type, body)`
///
/// The returned body is the whole zero-padded tail (59 bytes).
pub fn decode_request(data: &[u8]) -> Result<(u8, &[u8]), TransportError> {
    if data.len() != REPORT_SIZE {
        return Err(TransportError::ShortRead {
            expected: REPORT_SIZE,
            got: data.len(),
        });
    }
    let (header, body) =
        FrameHeader::ref_from_prefix(data).map_err(|_| TransportError::ShortRead {
            expected: REPORT_SIZE,
            got: data.len(),
        })?;
    if header.report_id != REQUEST_REPORT_ID || header.marker != FRAME_MARKER {
        return Err(TransportError::UnexpectedResponse {
            expected: REQUEST_REPORT_ID,
            got: header.report_id,
        });
    }
    Ok((header.command_type, body))
}

/// Why an inbound report was not queued
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FrameError {
    #[error("unexpected report length {got} (want 64)")]
    Length { got: usize },

    #[error("unrecognised byte at offset {offset}: expected 0x{expected:02x}, got 0x{got:02x}")]
    Header { offset: usize, expected: u8, got: u8 },
}

/// One 64-byte report received from the device
#[derive(Clone, PartialEq, Eq)]
pub struct InboundFrame {
    data: [u8; REPORT_SIZE],
}

impl InboundFrame {
    /// Wrap a full report without header validation
    pub fn new(data: [u8; REPORT_SIZE]) -> Self {
        Self { data }
    }

    pub fn as_bytes(&self) -> &[u8; REPORT_SIZE] {
        &self.data
    }

    /// Command type byte at offset 4
    pub fn command_type(&self) -> u8 {
        self.data[COMMAND_TYPE_OFFSET]
    }

    /// Byte at an absolute frame offset
    pub fn byte(&self, offset: usize) -> Option<u8> {
        self.data.get(offset).copied()
    }

    /// Everything after the 5-byte header
    pub fn payload(&self) -> &[u8] {
        &self.data[HEADER_SIZE..]
    }
}

impl fmt::Debug for InboundFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cmd_type = self.command_type();
        write!(
            f,
            "InboundFrame({} 0x{:02X}: {:02X?})",
            cmd::name(cmd_type),
            cmd_type,
            &self.data[..16]
        )
    }
}

/// Validate an inbound report from the control interface
pub fn parse_frame(data: &[u8]) -> Result<InboundFrame, FrameError> {
    let data: [u8; REPORT_SIZE] = data
        .try_into()
        .map_err(|_| FrameError::Length { got: data.len() })?;
    let (header, _) = FrameHeader::ref_from_prefix(&data[..])
        .map_err(|_| FrameError::Length { got: REPORT_SIZE })?;
    if let Some((offset, expected, got)) = header.check_response() {
        return Err(FrameError::Header {
            offset,
            expected,
            got,
        });
    }
    Ok(InboundFrame::new(data))
}

/// Build a response report the way the device frames it (used by the mock
/// backend and tests)
pub fn build_response(command_type: u8, payload: &[u8]) -> [u8; REPORT_SIZE] {
    let mut buf = [0u8; REPORT_SIZE];
    buf[0] = RESPONSE_REPORT_ID;
    buf[3] = FRAME_MARKER;
    buf[COMMAND_TYPE_OFFSET] = command_type;
    let len = payload.len().min(BODY_CAPACITY);
    buf[HEADER_SIZE..HEADER_SIZE + len].copy_from_slice(&payload[..len]);
    buf
}
