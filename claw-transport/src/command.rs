//! Type-safe control command builders and response parsers
//!
//! Each request/response pair of the control protocol gets a small typed
//! wrapper, so body layouts and offsets live in one place instead of being
//! spelled out at every call site.

use std::fmt;

use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use crate::error::TransportError;
use crate::protocol::{self, cmd, InboundFrame, HEADER_SIZE, REPORT_SIZE};

/// Profile slot used for every profile-data read and write
pub const ACTIVE_PROFILE: u8 = 0x01;

/// Maximum data bytes carried by one WRITE_PROFILE_DATA request
pub const MAX_PROFILE_CHUNK: usize = protocol::BODY_CAPACITY - 4;

// =============================================================================
// Core Traits
// =============================================================================

/// A request that can be serialized to a control frame
pub trait ClawCommand {
    /// Command type byte (offset 4)
    const COMMAND_TYPE: u8;

    /// Serialize the body (starts at offset 5)
    fn body(&self) -> Vec<u8>;

    /// Build the complete 64-byte report
    fn build(&self) -> Result<[u8; REPORT_SIZE], TransportError> {
        protocol::build_frame(Self::COMMAND_TYPE, &self.body())
    }
}

/// A response that can be parsed from an inbound frame
pub trait ClawResponse: Sized {
    /// Expected command type of the reply
    const COMMAND_TYPE: u8;

    /// Parse the payload (bytes after the 5-byte header)
    fn from_payload(payload: &[u8]) -> Result<Self, ParseError>;

    /// Parse with command type validation
    fn parse(frame: &InboundFrame) -> Result<Self, ParseError> {
        let got = frame.command_type();
        if got != Self::COMMAND_TYPE {
            return Err(ParseError::CommandMismatch {
                expected: Self::COMMAND_TYPE,
                got,
            });
        }
        Self::from_payload(frame.payload())
    }
}

/// Parse error for responses
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    TooShort { expected: usize, got: usize },
    CommandMismatch { expected: u8, got: u8 },
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooShort { expected, got } => {
                write!(f, "Response too short: expected {expected} bytes, got {got}")
            }
            Self::CommandMismatch { expected, got } => write!(
                f,
                "Command mismatch: expected 0x{expected:02X}, got 0x{got:02X}"
            ),
        }
    }
}

impl std::error::Error for ParseError {}

impl From<ParseError> for TransportError {
    fn from(e: ParseError) -> Self {
        match e {
            ParseError::TooShort { expected, got } => TransportError::ShortRead { expected, got },
            ParseError::CommandMismatch { expected, got } => {
                TransportError::UnexpectedResponse { expected, got }
            }
        }
    }
}

// =============================================================================
// Gamepad mode
// =============================================================================

/// SWITCH_MODE (0x24): `[gamepad_mode, mkeys_function]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoBytes, FromBytes, KnownLayout, Immutable)]
#[repr(C)]
pub struct SwitchMode {
    pub gamepad_mode: u8,
    pub mkeys_function: u8,
}

impl SwitchMode {
    pub fn new(gamepad_mode: u8, mkeys_function: u8) -> Self {
        Self {
            gamepad_mode,
            mkeys_function,
        }
    }
}

impl ClawCommand for SwitchMode {
    const COMMAND_TYPE: u8 = cmd::SWITCH_MODE;
    fn body(&self) -> Vec<u8> {
        self.as_bytes().to_vec()
    }
}

/// READ_GAMEPAD_MODE (0x26), no body
#[derive(Debug, Clone, Copy, Default)]
pub struct ReadGamepadMode;

impl ClawCommand for ReadGamepadMode {
    const COMMAND_TYPE: u8 = cmd::READ_GAMEPAD_MODE;
    fn body(&self) -> Vec<u8> {
        Vec::new()
    }
}

/// GAMEPAD_MODE_ACK (0x27) reply; raw bytes, range checks belong to the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoBytes, FromBytes, KnownLayout, Immutable)]
#[repr(C)]
pub struct GamepadModeResponse {
    pub gamepad_mode: u8,
    pub mkeys_function: u8,
}

impl ClawResponse for GamepadModeResponse {
    const COMMAND_TYPE: u8 = cmd::GAMEPAD_MODE_ACK;

    fn from_payload(payload: &[u8]) -> Result<Self, ParseError> {
        Self::read_from_prefix(payload)
            .map(|(resp, _)| resp)
            .map_err(|_| ParseError::TooShort {
                expected: HEADER_SIZE + 2,
                got: HEADER_SIZE + payload.len(),
            })
    }
}

// =============================================================================
// Device maintenance
// =============================================================================

/// SYNC_TO_ROM (0x22), answered by two ACKs
#[derive(Debug, Clone, Copy, Default)]
pub struct SyncToRom;

impl ClawCommand for SyncToRom {
    const COMMAND_TYPE: u8 = cmd::SYNC_TO_ROM;
    fn body(&self) -> Vec<u8> {
        Vec::new()
    }
}

/// RESET_DEVICE (0x28), answered by one ACK
#[derive(Debug, Clone, Copy, Default)]
pub struct ResetDevice;

impl ClawCommand for ResetDevice {
    const COMMAND_TYPE: u8 = cmd::RESET_DEVICE;
    fn body(&self) -> Vec<u8> {
        Vec::new()
    }
}

// =============================================================================
// Profile memory
// =============================================================================

/// Address prefix shared by profile reads, writes and read replies:
/// `[profile, address_hi, address_lo, length]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoBytes, FromBytes, KnownLayout, Immutable)]
#[repr(C)]
pub struct ProfileAddress {
    pub profile: u8,
    address: [u8; 2],
    pub len: u8,
}

impl ProfileAddress {
    pub fn new(address: u16, len: u8) -> Self {
        Self {
            profile: ACTIVE_PROFILE,
            address: address.to_be_bytes(),
            len,
        }
    }

    /// 16-bit profile memory address (big-endian on the wire)
    pub fn address(&self) -> u16 {
        u16::from_be_bytes(self.address)
    }
}

/// WRITE_PROFILE_DATA (0x21): `[profile, addr_hi, addr_lo, len, data...]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteProfileData {
    header: ProfileAddress,
    data: Vec<u8>,
}

impl WriteProfileData {
    /// Build a write of at most [`MAX_PROFILE_CHUNK`] bytes at `address`
    pub fn new(address: u16, data: &[u8]) -> Result<Self, TransportError> {
        if data.len() > MAX_PROFILE_CHUNK {
            return Err(TransportError::InvalidLength {
                len: data.len(),
                max: MAX_PROFILE_CHUNK,
            });
        }
        Ok(Self {
            header: ProfileAddress::new(address, data.len() as u8),
            data: data.to_vec(),
        })
    }

    pub fn address(&self) -> u16 {
        self.header.address()
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

impl ClawCommand for WriteProfileData {
    const COMMAND_TYPE: u8 = cmd::WRITE_PROFILE_DATA;
    fn body(&self) -> Vec<u8> {
        let mut body = self.header.as_bytes().to_vec();
        body.extend_from_slice(&self.data);
        body
    }
}

/// READ_PROFILE (0x04): `[profile, addr_hi, addr_lo, len]`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadProfile {
    header: ProfileAddress,
}

impl ReadProfile {
    pub fn new(address: u16, len: u8) -> Self {
        Self {
            header: ProfileAddress::new(address, len),
        }
    }
}

impl ClawCommand for ReadProfile {
    const COMMAND_TYPE: u8 = cmd::READ_PROFILE;
    fn body(&self) -> Vec<u8> {
        self.header.as_bytes().to_vec()
    }
}

/// READ_PROFILE_ACK (0x05) reply: the address prefix echoed back, followed by
/// the data bytes starting at frame offset 9
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileDataResponse {
    pub header: ProfileAddress,
    pub data: Vec<u8>,
}

impl ClawResponse for ProfileDataResponse {
    const COMMAND_TYPE: u8 = cmd::READ_PROFILE_ACK;

    fn from_payload(payload: &[u8]) -> Result<Self, ParseError> {
        let (header, data) =
            ProfileAddress::read_from_prefix(payload).map_err(|_| ParseError::TooShort {
                expected: HEADER_SIZE + 4,
                got: HEADER_SIZE + payload.len(),
            })?;
        Ok(Self {
            header,
            data: data.to_vec(),
        })
    }
}
