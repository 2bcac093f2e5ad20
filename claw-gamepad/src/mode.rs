//! Gamepad mode and M-key function control

use std::fmt;
use std::str::FromStr;

use claw_transport::{
    ControlChannel, GamepadModeResponse, ReadGamepadMode, ResetDevice, SwitchMode, SyncToRom,
};
use tracing::{debug, info};

use crate::error::ClawError;

/// Controller personality reported to the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum GamepadMode {
    Offline = 0x00,
    XInput = 0x01,
    DInput = 0x02,
    Msi = 0x03,
    Desktop = 0x04,
    Bios = 0x05,
    Testing = 0x06,
}

impl GamepadMode {
    pub const ALL: [GamepadMode; 7] = [
        Self::Offline,
        Self::XInput,
        Self::DInput,
        Self::Msi,
        Self::Desktop,
        Self::Bios,
        Self::Testing,
    ];

    pub fn from_u8(value: u8) -> Option<Self> {
        Self::ALL.get(value as usize).copied()
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Offline => "offline",
            Self::XInput => "xinput",
            Self::DInput => "dinput",
            Self::Msi => "msi",
            Self::Desktop => "desktop",
            Self::Bios => "bios",
            Self::Testing => "testing",
        }
    }

    /// Whether the mode may be selected; only xinput and desktop are
    /// offered outside debug builds of the configuration
    pub fn is_available(self, debug_modes: bool) -> bool {
        matches!(self, Self::XInput | Self::Desktop) || debug_modes
    }
}

impl fmt::Display for GamepadMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for GamepadMode {
    type Err = ClawError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|m| m.name() == s.trim())
            .ok_or_else(|| ClawError::InvalidParameter(format!("unknown gamepad mode '{s}'")))
    }
}

/// What the M1/M2 back buttons do
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MKeysFunction {
    Macro = 0x00,
    Combination = 0x01,
    Disabled = 0x02,
}

impl MKeysFunction {
    pub const ALL: [MKeysFunction; 3] = [Self::Macro, Self::Combination, Self::Disabled];

    pub fn from_u8(value: u8) -> Option<Self> {
        Self::ALL.get(value as usize).copied()
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Macro => "macro",
            Self::Combination => "combination",
            Self::Disabled => "disabled",
        }
    }

    /// `disabled` can be reported by the device but is never offered
    pub fn is_selectable(self) -> bool {
        !matches!(self, Self::Disabled)
    }
}

impl fmt::Display for MKeysFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for MKeysFunction {
    type Err = ClawError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|f| f.name() == s.trim())
            .ok_or_else(|| ClawError::InvalidParameter(format!("unknown key function '{s}'")))
    }
}

/// Mode and M-key function, always written together
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlStatus {
    pub gamepad_mode: GamepadMode,
    pub mkeys_function: MKeysFunction,
}

impl Default for ControlStatus {
    fn default() -> Self {
        Self {
            gamepad_mode: GamepadMode::XInput,
            mkeys_function: MKeysFunction::Macro,
        }
    }
}

impl fmt::Display for ControlStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.gamepad_mode, self.mkeys_function)
    }
}

impl TryFrom<GamepadModeResponse> for ControlStatus {
    type Error = ClawError;

    fn try_from(resp: GamepadModeResponse) -> Result<Self, Self::Error> {
        let gamepad_mode =
            GamepadMode::from_u8(resp.gamepad_mode).ok_or(ClawError::UnknownEnumValue {
                field: "gamepad mode",
                value: resp.gamepad_mode,
            })?;
        let mkeys_function =
            MKeysFunction::from_u8(resp.mkeys_function).ok_or(ClawError::UnknownEnumValue {
                field: "M-key function",
                value: resp.mkeys_function,
            })?;
        Ok(Self {
            gamepad_mode,
            mkeys_function,
        })
    }
}

/// Query the current mode and function
pub async fn read_status(channel: &mut ControlChannel) -> Result<ControlStatus, ClawError> {
    let resp: GamepadModeResponse = channel.query(&ReadGamepadMode).await?;
    let status = ControlStatus::try_from(resp)?;
    debug!("Device reports {}", status);
    Ok(status)
}

/// Persist staged configuration (two ACKs)
pub async fn sync_to_rom(channel: &mut ControlChannel) -> Result<(), ClawError> {
    channel.send_command(&SyncToRom).await?;
    channel.await_ack().await?;
    Ok(())
}

/// Write a new status (two ACKs), verify it by reading back, then persist it
///
/// Nothing is rolled back when a later step fails.
pub async fn switch_status(
    channel: &mut ControlChannel,
    target: ControlStatus,
) -> Result<(), ClawError> {
    let command = SwitchMode::new(target.gamepad_mode.as_u8(), target.mkeys_function.as_u8());
    // Answered by two ACKs, the second must be consumed before the read-back
    channel.send_command(&command).await?;
    channel.await_ack().await?;

    let actual = read_status(channel).await?;
    if actual != target {
        return Err(ClawError::VerificationMismatch {
            expected: target.to_string(),
            actual: actual.to_string(),
        });
    }

    sync_to_rom(channel).await?;
    info!("Switched to {}", target);
    Ok(())
}

pub async fn reset_device(channel: &mut ControlChannel) -> Result<(), ClawError> {
    channel.send_command(&ResetDevice).await?;
    info!("Device reset");
    Ok(())
}
