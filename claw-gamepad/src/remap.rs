//! M-key remap codec
//!
//! Each back button holds up to five key codes in profile memory. Codes come
//! from a fixed table shared by gamepad buttons and keyboard keys.

use std::fmt;
use std::str::FromStr;

use claw_transport::{ControlChannel, ProfileDataResponse, ReadProfile, WriteProfileData};
use tracing::{debug, info};

use crate::error::ClawError;
use crate::firmware::RemapAddressTable;
use crate::mode::sync_to_rom;

/// Key codes per remap slot
pub const MAX_REMAP_KEYS: usize = 5;

/// Empty-slot sentinel
pub const DISABLED_CODE: u8 = 0xff;

/// Name of the sentinel entry
pub const DISABLED_NAME: &str = "disabled";

/// Slot payload length: two prefix bytes followed by the codes
const SLOT_LEN: u8 = 7;

/// Fixed prefix of a slot payload
const SLOT_PREFIX: [u8; 2] = [0x04, 0x00];

/// Offset of the first code within the read reply data
const CODES_OFFSET: usize = SLOT_PREFIX.len();

/// Symbolic name to device code
pub const KEY_CODES: &[(&str, u8)] = &[
    ("BTN_DPAD_UP", 0x01),
    ("BTN_DPAD_DOWN", 0x02),
    ("BTN_DPAD_LEFT", 0x03),
    ("BTN_DPAD_RIGHT", 0x04),
    ("BTN_TL", 0x05),
    ("BTN_TR", 0x06),
    ("BTN_THUMBL", 0x07),
    ("BTN_THUMBR", 0x08),
    ("BTN_SOUTH", 0x09),
    ("BTN_EAST", 0x0a),
    ("BTN_NORTH", 0x0b),
    ("BTN_WEST", 0x0c),
    ("BTN_MODE", 0x0d),
    ("BTN_SELECT", 0x0e),
    ("BTN_START", 0x0f),
    ("KEY_ESC", 0x32),
    ("KEY_F1", 0x33),
    ("KEY_F2", 0x34),
    ("KEY_F3", 0x35),
    ("KEY_F4", 0x36),
    ("KEY_F5", 0x37),
    ("KEY_F6", 0x38),
    ("KEY_F7", 0x39),
    ("KEY_F8", 0x3a),
    ("KEY_F9", 0x3b),
    ("KEY_F10", 0x3c),
    ("KEY_F11", 0x3d),
    ("KEY_F12", 0x3e),
    ("KEY_GRAVE", 0x3f),
    ("KEY_1", 0x40),
    ("KEY_2", 0x41),
    ("KEY_3", 0x42),
    ("KEY_4", 0x43),
    ("KEY_5", 0x44),
    ("KEY_6", 0x45),
    ("KEY_7", 0x46),
    ("KEY_8", 0x47),
    ("KEY_9", 0x48),
    ("KEY_0", 0x49),
    ("KEY_MINUS", 0x4a),
    ("KEY_EQUAL", 0x4b),
    ("KEY_BACKSPACE", 0x4c),
    ("KEY_TAB", 0x4d),
    ("KEY_Q", 0x4e),
    ("KEY_W", 0x4f),
    ("KEY_E", 0x50),
    ("KEY_R", 0x51),
    ("KEY_T", 0x52),
    ("KEY_Y", 0x53),
    ("KEY_U", 0x54),
    ("KEY_I", 0x55),
    ("KEY_O", 0x56),
    ("KEY_P", 0x57),
    ("KEY_LEFTBRACE", 0x58),
    ("KEY_RIGHTBRACE", 0x59),
    ("KEY_BACKSLASH", 0x5a),
    ("KEY_CAPSLOCK", 0x5b),
    ("KEY_A", 0x5c),
    ("KEY_S", 0x5d),
    ("KEY_D", 0x5e),
    ("KEY_F", 0x5f),
    ("KEY_G", 0x60),
    ("KEY_H", 0x61),
    ("KEY_J", 0x62),
    ("KEY_K", 0x63),
    ("KEY_L", 0x64),
    ("KEY_SEMICOLON", 0x65),
    ("KEY_LEFTSHIFT", 0x66),
    ("KEY_APOSTROPHE", 0x67),
    ("KEY_ENTER", 0x68),
    ("KEY_Z", 0x69),
    ("KEY_X", 0x6a),
    ("KEY_C", 0x6b),
    ("KEY_V", 0x6c),
    ("KEY_B", 0x6d),
    ("KEY_N", 0x6e),
    ("KEY_M", 0x6f),
    ("KEY_LEFTCTRL", 0x70),
    ("KEY_RIGHTSHIFT", 0x71),
    ("KEY_COMMA", 0x72),
    ("KEY_DOT", 0x73),
    ("KEY_SLASH", 0x74),
    ("KEY_LEFTALT", 0x75),
    ("KEY_LEFTMETA", 0x76),
    ("KEY_RIGHTCTRL", 0x77),
    ("KEY_RIGHTALT", 0x78),
    ("KEY_SPACE", 0x79),
    ("KEY_INSERT", 0x7a),
    ("KEY_HOME", 0x7b),
    ("KEY_PAGEUP", 0x7c),
    ("KEY_DELETE", 0x7d),
    ("KEY_END", 0x7e),
    ("KEY_PAGEDOWN", 0x7f),
    ("KEY_KPENTER", 0x8a),
    ("KEY_KP0", 0x8b),
    ("KEY_KP1", 0x8c),
    ("KEY_KP2", 0x8d),
    ("KEY_KP3", 0x8e),
    ("KEY_KP4", 0x8f),
    ("KEY_KP5", 0x90),
    ("KEY_KP6", 0x91),
    ("KEY_KP7", 0x92),
    ("KEY_KP8", 0x93),
    ("KEY_KP9", 0x94),
    ("disabled", 0xff),
];

/// The two remappable back buttons
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MKey {
    M1,
    M2,
}

impl MKey {
    pub const ALL: [MKey; 2] = [Self::M1, Self::M2];
}

impl fmt::Display for MKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::M1 => f.write_str("M1"),
            Self::M2 => f.write_str("M2"),
        }
    }
}

impl FromStr for MKey {
    type Err = ClawError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "m1" | "1" => Ok(Self::M1),
            "m2" | "2" => Ok(Self::M2),
            other => Err(ClawError::InvalidParameter(format!("unknown M-key '{other}'"))),
        }
    }
}

pub fn encode(name: &str) -> Result<u8, ClawError> {
    KEY_CODES
        .iter()
        .find(|(n, _)| *n == name)
        .map(|&(_, code)| code)
        .ok_or_else(|| ClawError::UnknownKeySymbol(name.to_string()))
}

pub fn decode(code: u8) -> Option<&'static str> {
    KEY_CODES
        .iter()
        .find(|&&(_, c)| c == code)
        .map(|&(name, _)| name)
}

/// Every accepted symbol, in table order
pub fn symbols() -> impl Iterator<Item = &'static str> {
    KEY_CODES.iter().map(|&(name, _)| name)
}

/// Parse a whitespace-separated key list
///
/// `disabled` on its own clears the slot and yields an empty list.
pub fn parse_key_list(text: &str) -> Result<Vec<u8>, ClawError> {
    let names: Vec<&str> = text.split_whitespace().collect();
    match names.as_slice() {
        [] => Err(ClawError::InvalidParameter("empty key list".into())),
        [DISABLED_NAME] => Ok(Vec::new()),
        _ if names.len() > MAX_REMAP_KEYS => Err(ClawError::TooManyKeys {
            count: names.len(),
            max: MAX_REMAP_KEYS,
        }),
        _ => names
            .iter()
            .map(|&name| match encode(name)? {
                DISABLED_CODE => Err(ClawError::InvalidParameter(
                    "'disabled' cannot be combined with other keys".into(),
                )),
                code => Ok(code),
            })
            .collect(),
    }
}

/// Render a code list the way [`parse_key_list`] reads it
pub fn format_key_list(codes: &[u8]) -> String {
    if codes.is_empty() {
        return DISABLED_NAME.to_string();
    }
    codes
        .iter()
        .map(|&code| match decode(code) {
            Some(name) => name.to_string(),
            None => format!("0x{code:02x}"),
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Store a code list in a slot and persist it
pub async fn write_remap(
    channel: &mut ControlChannel,
    table: &RemapAddressTable,
    key: MKey,
    codes: &[u8],
) -> Result<(), ClawError> {
    if codes.len() > MAX_REMAP_KEYS {
        return Err(ClawError::TooManyKeys {
            count: codes.len(),
            max: MAX_REMAP_KEYS,
        });
    }

    let mut payload = [DISABLED_CODE; SLOT_LEN as usize];
    payload[..CODES_OFFSET].copy_from_slice(&SLOT_PREFIX);
    payload[CODES_OFFSET..CODES_OFFSET + codes.len()].copy_from_slice(codes);

    let slot = table.slot(key);
    debug!("Writing {} remap at {:04x}: {:02x?}", key, slot.address(), codes);
    channel
        .send_command(&WriteProfileData::new(slot.address(), &payload)?)
        .await?;
    sync_to_rom(channel).await?;
    info!("{} remapped to {}", key, format_key_list(codes));
    Ok(())
}

/// Read a slot; empty entries are dropped, so an empty list means disabled
pub async fn read_remap(
    channel: &mut ControlChannel,
    table: &RemapAddressTable,
    key: MKey,
) -> Result<Vec<u8>, ClawError> {
    let slot = table.slot(key);
    let resp: ProfileDataResponse = channel
        .query(&ReadProfile::new(slot.address(), SLOT_LEN))
        .await?;

    let codes = resp
        .data
        .iter()
        .skip(CODES_OFFSET)
        .take(MAX_REMAP_KEYS)
        .copied()
        .filter(|&code| code != DISABLED_CODE)
        .collect();
    Ok(codes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_shape() {
        let buttons = symbols().filter(|n| n.starts_with("BTN_")).count();
        let keys = symbols().filter(|n| n.starts_with("KEY_")).count();
        assert_eq!(buttons, 15);
        assert_eq!(keys, 89);
        assert_eq!(KEY_CODES.len(), 105);

        let mut codes: Vec<u8> = KEY_CODES.iter().map(|&(_, c)| c).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), KEY_CODES.len(), "codes must be unique");
    }

    #[test]
    fn test_encode_decode() {
        assert_eq!(encode("BTN_SOUTH").unwrap(), 0x09);
        assert_eq!(encode("KEY_KP9").unwrap(), 0x94);
        assert_eq!(decode(0x32), Some("KEY_ESC"));
        assert_eq!(decode(0x80), None);
        assert!(matches!(
            encode("KEY_FOO"),
            Err(ClawError::UnknownKeySymbol(name)) if name == "KEY_FOO"
        ));
    }

    #[test]
    fn test_parse_key_list() {
        assert_eq!(
            parse_key_list("KEY_LEFTCTRL  KEY_C").unwrap(),
            vec![0x70, 0x6b]
        );
        assert_eq!(parse_key_list("disabled").unwrap(), Vec::<u8>::new());
        assert!(matches!(
            parse_key_list("KEY_1 KEY_2 KEY_3 KEY_4 KEY_5 KEY_6"),
            Err(ClawError::TooManyKeys { count: 6, max: 5 })
        ));
        assert!(matches!(
            parse_key_list("   "),
            Err(ClawError::InvalidParameter(_))
        ));
        assert!(matches!(
            parse_key_list("KEY_A disabled"),
            Err(ClawError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_format_key_list() {
        assert_eq!(format_key_list(&[]), "disabled");
        assert_eq!(format_key_list(&[0x09, 0x80]), "BTN_SOUTH 0x80");
    }

    #[test]
    fn test_mkey_parse() {
        assert_eq!("m1".parse::<MKey>().unwrap(), MKey::M1);
        assert_eq!("M2".parse::<MKey>().unwrap(), MKey::M2);
        assert!("m3".parse::<MKey>().is_err());
    }
}
