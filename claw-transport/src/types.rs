//! Common types for transport layer

/// Which HID interface of the device a transport is bound to
///
/// The Claw exposes several HID interfaces; only the one whose report
/// descriptor opens with a vendor usage page carries the control protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InterfaceKind {
    /// Vendor control interface (mode switch, remap, RGB)
    Control,
    /// Gamepad input interface
    GameControl,
    /// Anything else the device enumerates
    Other,
}

impl InterfaceKind {
    /// Classify an interface from the first byte of its report descriptor
    pub fn from_descriptor(descriptor: &[u8]) -> Self {
        match descriptor.first() {
            Some(&crate::device_registry::DEVICE_CONTROL_DESC) => Self::Control,
            Some(&crate::device_registry::GAME_CONTROL_DESC) => Self::GameControl,
            _ => Self::Other,
        }
    }

    /// Check if this interface speaks the control protocol
    pub fn is_control(&self) -> bool {
        matches!(self, Self::Control)
    }
}

/// Device identification information
#[derive(Debug, Clone)]
pub struct TransportDeviceInfo {
    /// USB Vendor ID
    pub vid: u16,
    /// USB Product ID
    pub pid: u16,
    /// Packed BCD firmware version (USB bcdDevice, major in the high byte)
    pub firmware_bcd: u16,
    /// Interface this transport is bound to
    pub interface: InterfaceKind,
    /// Device path or identifier (transport-specific)
    pub device_path: String,
    /// Product name if available
    pub product_name: Option<String>,
}

impl TransportDeviceInfo {
    /// Check if this transport can carry control commands
    pub fn is_control(&self) -> bool {
        self.interface.is_control()
    }
}
