//! Transport layer for the MSI Claw control interface
//!
//! This crate carries the framing of the vendor control protocol and the
//! command/ACK discipline on top of it:
//!
//! - `protocol`: 64-byte request/response frames and command codes
//! - `queue`: bounded FIFO of inbound frames
//! - `channel`: single-in-flight command channel with ACK and read timeouts
//! - `hid`: hidapi backend, `mock`: in-memory backend for tests

pub mod channel;
pub mod command;
pub mod device_registry;
pub mod error;
pub mod hid;
pub mod mock;
pub mod protocol;
pub mod queue;
pub mod types;

pub use channel::{ChannelConfig, ControlChannel};
pub use command::{
    ClawCommand, ClawResponse, GamepadModeResponse, ParseError, ProfileAddress,
    ProfileDataResponse, ReadGamepadMode, ReadProfile, ResetDevice, SwitchMode, SyncToRom,
    WriteProfileData, ACTIVE_PROFILE, MAX_PROFILE_CHUNK,
};
pub use device_registry::{is_claw, CLAW_PIDS, VENDOR_ID};
pub use error::TransportError;
pub use hid::HidClawTransport;
pub use protocol::{cmd, FrameError, InboundFrame};
pub use queue::InboundQueue;
pub use types::{InterfaceKind, TransportDeviceInfo};

use async_trait::async_trait;
use std::sync::Arc;

/// Callback receiving every raw inbound report
pub type FrameHandler = Arc<dyn Fn(&[u8]) + Send + Sync>;

/// The core transport trait - all backends implement this
#[async_trait]
pub trait Transport: Send + Sync {
    /// Write one complete report, returning the number of bytes accepted
    async fn write_report(&self, report: &[u8]) -> Result<usize, TransportError>;

    /// Install the callback for inbound reports, replacing any previous one
    ///
    /// Backends may call it from any thread, including from inside
    /// `write_report`.
    fn set_frame_handler(&self, handler: FrameHandler);

    /// Get device information
    fn device_info(&self) -> &TransportDeviceInfo;
}

/// Type alias for a boxed transport
pub type BoxedTransport = Arc<dyn Transport>;
