//! Firmware version decoding and per-version profile memory layouts

use std::fmt;

use crate::remap::MKey;

/// Firmware version as reported in the USB `bcdDevice` field
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct FirmwareVersion {
    /// Packed BCD, e.g. 0x0166 for 1.66
    pub raw: u16,
}

impl FirmwareVersion {
    pub fn new(raw: u16) -> Self {
        Self { raw }
    }

    pub fn major(&self) -> u8 {
        (self.raw >> 8) as u8
    }

    pub fn minor(&self) -> u8 {
        self.raw as u8
    }
}

impl fmt::Display for FirmwareVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:x}.{:02x}", self.major(), self.minor())
    }
}

/// Profile memory location of one M-key remap slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemapSlot {
    pub bank: u8,
    pub offset: u8,
}

impl RemapSlot {
    pub fn address(&self) -> u16 {
        u16::from_be_bytes([self.bank, self.offset])
    }
}

/// Remap slot addresses for M1 and M2
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemapAddressTable {
    pub m1: RemapSlot,
    pub m2: RemapSlot,
}

impl RemapAddressTable {
    pub fn slot(&self, key: MKey) -> RemapSlot {
        match key {
            MKey::M1 => self.m1,
            MKey::M2 => self.m2,
        }
    }
}

/// Base address of the RGB animation buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RgbAddressTable {
    pub base: u16,
}

pub const REMAP_ADDR_OLD: RemapAddressTable = RemapAddressTable {
    m1: RemapSlot { bank: 0x00, offset: 0x7a },
    m2: RemapSlot { bank: 0x01, offset: 0x1f },
};

pub const REMAP_ADDR_NEW: RemapAddressTable = RemapAddressTable {
    m1: RemapSlot { bank: 0x00, offset: 0xbb },
    m2: RemapSlot { bank: 0x01, offset: 0x64 },
};

pub const RGB_ADDR_OLD: RgbAddressTable = RgbAddressTable { base: 0x01fa };
pub const RGB_ADDR_NEW: RgbAddressTable = RgbAddressTable { base: 0x024a };

/// First 1.x release with the relocated layout
const V1_NEW_LAYOUT: u16 = 0x0166;
/// First 2.x release with the relocated layout
const V2_NEW_LAYOUT: u16 = 0x0217;

/// Remap addresses for a firmware, `None` when remapping is unsupported
pub fn resolve_remap(version: FirmwareVersion) -> Option<&'static RemapAddressTable> {
    match version.major() {
        0 => None,
        1 if version.raw >= V1_NEW_LAYOUT => Some(&REMAP_ADDR_NEW),
        1 => Some(&REMAP_ADDR_OLD),
        2 if version.raw >= V2_NEW_LAYOUT => Some(&REMAP_ADDR_NEW),
        2 => None,
        _ => Some(&REMAP_ADDR_NEW),
    }
}

/// RGB buffer address for a firmware; unknown versions get the old layout
pub fn resolve_rgb(version: FirmwareVersion) -> &'static RgbAddressTable {
    match version.major() {
        1 if version.raw >= V1_NEW_LAYOUT => &RGB_ADDR_NEW,
        2 if version.raw >= V2_NEW_LAYOUT => &RGB_ADDR_NEW,
        0..=2 => &RGB_ADDR_OLD,
        _ => &RGB_ADDR_NEW,
    }
}

/// Everything the session needs to know about a firmware
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FirmwareCapabilities {
    pub version: FirmwareVersion,
    pub remap: Option<&'static RemapAddressTable>,
    pub rgb: &'static RgbAddressTable,
}

impl FirmwareCapabilities {
    pub fn resolve(version: FirmwareVersion) -> Self {
        Self {
            version,
            remap: resolve_remap(version),
            rgb: resolve_rgb(version),
        }
    }

    pub fn remap_supported(&self) -> bool {
        self.remap.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(raw: u16) -> FirmwareVersion {
        FirmwareVersion::new(raw)
    }

    #[test]
    fn test_version_display() {
        assert_eq!(v(0x0166).to_string(), "1.66");
        assert_eq!(v(0x0217).major(), 2);
    }

    #[test]
    fn test_resolver_boundaries() {
        let cases: &[(u16, Option<RemapAddressTable>, RgbAddressTable)] = &[
            (0x0000, None, RGB_ADDR_OLD),
            (0x00ff, None, RGB_ADDR_OLD),
            (0x0100, Some(REMAP_ADDR_OLD), RGB_ADDR_OLD),
            (0x0165, Some(REMAP_ADDR_OLD), RGB_ADDR_OLD),
            (0x0166, Some(REMAP_ADDR_NEW), RGB_ADDR_NEW),
            (0x01ff, Some(REMAP_ADDR_NEW), RGB_ADDR_NEW),
            (0x0200, None, RGB_ADDR_OLD),
            (0x0216, None, RGB_ADDR_OLD),
            (0x0217, Some(REMAP_ADDR_NEW), RGB_ADDR_NEW),
            (0x0300, Some(REMAP_ADDR_NEW), RGB_ADDR_NEW),
            (0x0a01, Some(REMAP_ADDR_NEW), RGB_ADDR_NEW),
        ];
        for (raw, remap, rgb) in cases {
            assert_eq!(resolve_remap(v(*raw)).copied(), *remap, "remap {raw:04x}");
            assert_eq!(*resolve_rgb(v(*raw)), *rgb, "rgb {raw:04x}");
        }
    }

    #[test]
    fn test_capabilities() {
        let caps = FirmwareCapabilities::resolve(v(0x0210));
        assert!(!caps.remap_supported());
        assert_eq!(caps.rgb.base, 0x01fa);

        let caps = FirmwareCapabilities::resolve(v(0x0166));
        assert_eq!(caps.remap.map(|t| t.slot(MKey::M2).address()), Some(0x0164));
    }
}
