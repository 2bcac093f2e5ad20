//! hidapi backend for the control interface
//!
//! Writes go straight to the interrupt OUT endpoint. Inbound reports are
//! read on a dedicated thread and handed to the installed frame handler.

use std::ffi::CStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use hidapi::{HidApi, HidDevice};
use parking_lot::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::device_registry;
use crate::error::TransportError;
use crate::protocol::REPORT_SIZE;
use crate::types::{InterfaceKind, TransportDeviceInfo};
use crate::{FrameHandler, Transport};

/// Reader wake-up interval for checking the shutdown flag
const READ_POLL_MS: i32 = 5;

/// Back-off after a read error
const ERROR_SLEEP_MS: u64 = 100;

/// Report descriptors are at most this long (HID_MAX_DESCRIPTOR_SIZE)
const MAX_DESCRIPTOR_SIZE: usize = 4096;

type SharedHandler = Arc<RwLock<Option<FrameHandler>>>;

/// HID transport bound to one interface of the controller
pub struct HidClawTransport {
    device: Arc<Mutex<HidDevice>>,
    info: TransportDeviceInfo,
    handler: SharedHandler,
    shutdown: Arc<AtomicBool>,
}

impl HidClawTransport {
    /// Open one interface by hidraw path
    pub fn open_path(api: &HidApi, path: &CStr) -> Result<Self, TransportError> {
        let device_info = api
            .device_list()
            .find(|d| d.path() == path)
            .ok_or_else(|| TransportError::DeviceNotFound(path.to_string_lossy().into_owned()))?;

        let device = api.open_path(path)?;
        let interface = detect_interface(&device);
        let info = TransportDeviceInfo {
            vid: device_info.vendor_id(),
            pid: device_info.product_id(),
            firmware_bcd: device_info.release_number(),
            interface,
            device_path: path.to_string_lossy().into_owned(),
            product_name: device_info.product_string().map(str::to_owned),
        };
        debug!(
            "Opened {:04x}:{:04x} {} ({:?}, firmware {:04x})",
            info.vid, info.pid, info.device_path, info.interface, info.firmware_bcd
        );

        let reader = api.open_path(path)?;
        let handler: SharedHandler = Arc::new(RwLock::new(None));
        let shutdown = Arc::new(AtomicBool::new(false));
        {
            let handler = Arc::clone(&handler);
            let shutdown = Arc::clone(&shutdown);
            std::thread::Builder::new()
                .name("claw-hid-reader".into())
                .spawn(move || run_reader_loop(reader, handler, shutdown))
                .map_err(|e| TransportError::HidError(format!("reader thread: {e}")))?;
        }

        Ok(Self {
            device: Arc::new(Mutex::new(device)),
            info,
            handler,
            shutdown,
        })
    }

    /// Open the control interface of the first matching controller
    pub fn open_first(api: &HidApi, vid: u16, pid: u16) -> Result<Self, TransportError> {
        let paths: Vec<_> = api
            .device_list()
            .filter(|d| d.vendor_id() == vid && d.product_id() == pid)
            .map(|d| d.path().to_owned())
            .collect();

        for path in &paths {
            match Self::open_path(api, path) {
                Ok(transport) if transport.info.is_control() => {
                    info!("Using control interface {}", transport.info.device_path);
                    return Ok(transport);
                }
                Ok(transport) => {
                    debug!("Skipping {:?} interface", transport.info.interface);
                }
                Err(e) => warn!("Failed to open {}: {}", path.to_string_lossy(), e),
            }
        }

        Err(TransportError::DeviceNotFound(format!(
            "no control interface for {vid:04x}:{pid:04x}"
        )))
    }

    /// Open the first supported controller
    pub fn open_default(api: &HidApi) -> Result<Self, TransportError> {
        let pid = api
            .device_list()
            .find(|d| device_registry::is_claw(d.vendor_id(), d.product_id()))
            .map(|d| d.product_id())
            .ok_or_else(|| TransportError::DeviceNotFound("no MSI Claw connected".into()))?;
        Self::open_first(api, device_registry::VENDOR_ID, pid)
    }
}

impl Drop for HidClawTransport {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);
    }
}

#[async_trait]
impl Transport for HidClawTransport {
    /// The hidapi write blocks, so it runs on the blocking pool
    async fn write_report(&self, report: &[u8]) -> Result<usize, TransportError> {
        let device = Arc::clone(&self.device);
        let report = report.to_vec();
        let written = tokio::task::spawn_blocking(move || device.lock().write(&report))
            .await
            .map_err(|e| TransportError::HidError(format!("write task: {e}")))??;
        Ok(written)
    }

    fn set_frame_handler(&self, handler: FrameHandler) {
        *self.handler.write() = Some(handler);
    }

    fn device_info(&self) -> &TransportDeviceInfo {
        &self.info
    }
}

fn detect_interface(device: &HidDevice) -> InterfaceKind {
    let mut buf = vec![0u8; MAX_DESCRIPTOR_SIZE];
    match device.get_report_descriptor(&mut buf) {
        Ok(len) => InterfaceKind::from_descriptor(&buf[..len]),
        Err(e) => {
            debug!("Report descriptor unavailable: {}", e);
            InterfaceKind::Other
        }
    }
}

fn run_reader_loop(device: HidDevice, handler: SharedHandler, shutdown: Arc<AtomicBool>) {
    debug!("Control reader thread started");
    let mut buf = [0u8; REPORT_SIZE + 1];

    while !shutdown.load(Ordering::Relaxed) {
        match device.read_timeout(&mut buf, READ_POLL_MS) {
            Ok(len) if len > 0 => {
                let handler = handler.read().clone();
                match handler {
                    Some(handler) => handler(&buf[..len]),
                    None => debug!("No handler, dropping {} byte report", len),
                }
            }
            Ok(_) => {}
            Err(e) => {
                warn!("Control reader error: {}", e);
                std::thread::sleep(Duration::from_millis(ERROR_SLEEP_MS));
            }
        }
    }

    debug!("Control reader thread exiting");
}
