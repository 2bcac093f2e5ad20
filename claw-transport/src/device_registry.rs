//! Device registry - USB identifiers and interface detection

/// MSI vendor ID
pub const VENDOR_ID: u16 = 0x0DB0;

/// Known Claw product IDs
pub const CLAW_PIDS: &[u16] = &[
    0x1901, // Claw A1M
];

/// First report-descriptor byte of the gamepad input interface
pub const GAME_CONTROL_DESC: u8 = 0x05;

/// First report-descriptor byte of the vendor control interface
pub const DEVICE_CONTROL_DESC: u8 = 0x06;

/// Check if a VID/PID pair is a supported Claw
#[inline]
pub fn is_claw(vid: u16, pid: u16) -> bool {
    vid == VENDOR_ID && CLAW_PIDS.contains(&pid)
}
