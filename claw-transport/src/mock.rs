//! In-memory transport for tests
//!
//! Writes are recorded and handed to an optional responder. The reports the
//! responder returns are delivered through the frame handler before
//! `write_report` returns, unless a reply delay is configured for them; a
//! delayed reply is delivered from a spawned task, the way a slow device
//! answers while the host is already polling.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use tracing::debug;

use crate::device_registry::{CLAW_PIDS, VENDOR_ID};
use crate::error::TransportError;
use crate::protocol::{self, build_response, cmd, BODY_CAPACITY};
use crate::types::{InterfaceKind, TransportDeviceInfo};
use crate::{FrameHandler, Transport};

type Responder = Box<dyn FnMut(u8, &[u8]) -> Vec<Vec<u8>> + Send>;

pub struct MockTransport {
    info: TransportDeviceInfo,
    handler: RwLock<Option<FrameHandler>>,
    responder: Mutex<Option<Responder>>,
    writes: Mutex<Vec<Vec<u8>>>,
    attempts: AtomicUsize,
    short_write: Option<usize>,
    fail_after: Option<usize>,
    /// `(command_type, reply index)` -> delay before delivery
    reply_delays: HashMap<(u8, usize), Duration>,
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl MockTransport {
    /// Control interface of a Claw on firmware 1.66
    pub fn new() -> Self {
        Self {
            info: TransportDeviceInfo {
                vid: VENDOR_ID,
                pid: CLAW_PIDS[0],
                firmware_bcd: 0x0166,
                interface: InterfaceKind::Control,
                device_path: "mock".to_string(),
                product_name: Some("Claw (mock)".to_string()),
            },
            handler: RwLock::new(None),
            responder: Mutex::new(None),
            writes: Mutex::new(Vec::new()),
            attempts: AtomicUsize::new(0),
            short_write: None,
            fail_after: None,
            reply_delays: HashMap::new(),
        }
    }

    /// Transport backed by a shared [`ClawEmulator`]
    pub fn emulating(emulator: Arc<Mutex<ClawEmulator>>) -> Self {
        let mock = Self::new();
        mock.respond_with(move |command_type, body| emulator.lock().respond(command_type, body));
        mock
    }

    pub fn with_firmware(mut self, firmware_bcd: u16) -> Self {
        self.info.firmware_bcd = firmware_bcd;
        self
    }

    pub fn with_interface(mut self, interface: InterfaceKind) -> Self {
        self.info.interface = interface;
        self
    }

    /// Report only `len` bytes written for every write
    pub fn with_short_writes(mut self, len: usize) -> Self {
        self.short_write = Some(len);
        self
    }

    /// Let the first `count` writes through, fail every one after
    pub fn with_failing_writes_after(mut self, count: usize) -> Self {
        self.fail_after = Some(count);
        self
    }

    /// Deliver reply `index` to `command_type` only after `delay`
    ///
    /// Needs a tokio runtime; replies without a delay stay synchronous.
    pub fn with_reply_delay(mut self, command_type: u8, index: usize, delay: Duration) -> Self {
        self.reply_delays.insert((command_type, index), delay);
        self
    }

    /// Install the responder called with `(command_type, body)` per write
    pub fn respond_with<F>(&self, responder: F)
    where
        F: FnMut(u8, &[u8]) -> Vec<Vec<u8>> + Send + 'static,
    {
        *self.responder.lock() = Some(Box::new(responder));
    }

    /// Deliver an unsolicited report through the frame handler
    pub fn inject(&self, report: &[u8]) {
        let handler = self.handler.read().clone();
        match handler {
            Some(handler) => handler(report),
            None => debug!("Mock report dropped: no frame handler"),
        }
    }

    fn deliver_later(&self, report: Vec<u8>, delay: Duration) {
        let Some(handler) = self.handler.read().clone() else {
            debug!("Mock report dropped: no frame handler");
            return;
        };
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            handler(&report);
        });
    }

    /// Every report accepted so far
    pub fn writes(&self) -> Vec<Vec<u8>> {
        self.writes.lock().clone()
    }

    /// Command type of every accepted report
    pub fn sent_commands(&self) -> Vec<u8> {
        self.writes
            .lock()
            .iter()
            .filter_map(|w| w.get(protocol::COMMAND_TYPE_OFFSET).copied())
            .collect()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn write_report(&self, report: &[u8]) -> Result<usize, TransportError> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.fail_after.is_some_and(|limit| attempt >= limit) {
            return Err(TransportError::HidError("mock write failure".to_string()));
        }
        self.writes.lock().push(report.to_vec());

        let (command_type, body) = match protocol::decode_request(report) {
            Ok(decoded) => decoded,
            Err(e) => {
                debug!("Mock ignoring malformed request: {}", e);
                return Ok(self.short_write.unwrap_or(report.len()));
            }
        };
        let replies = self
            .responder
            .lock()
            .as_mut()
            .map(|respond| respond(command_type, body))
            .unwrap_or_default();

        for (index, reply) in replies.into_iter().enumerate() {
            match self.reply_delays.get(&(command_type, index)) {
                Some(&delay) => self.deliver_later(reply, delay),
                None => self.inject(&reply),
            }
        }

        Ok(self.short_write.unwrap_or(report.len()))
    }

    fn set_frame_handler(&self, handler: FrameHandler) {
        *self.handler.write() = Some(handler);
    }

    fn device_info(&self) -> &TransportDeviceInfo {
        &self.info
    }
}

/// Behavioural model of the controller's command handling
///
/// Keeps the gamepad mode and a sparse profile memory (unwritten bytes read
/// back as `0xFF`), and answers every command the way the firmware does.
#[derive(Debug, Clone)]
pub struct ClawEmulator {
    pub gamepad_mode: u8,
    pub mkeys_function: u8,
    memory: HashMap<u16, u8>,
    /// Number of completed ROM syncs
    pub rom_syncs: usize,
    /// Number of device resets
    pub resets: usize,
    /// Mode reported on read-back instead of the stored one
    pub reported_mode_override: Option<(u8, u8)>,
}

impl Default for ClawEmulator {
    fn default() -> Self {
        Self {
            gamepad_mode: 0x01,
            mkeys_function: 0x00,
            memory: HashMap::new(),
            rom_syncs: 0,
            resets: 0,
            reported_mode_override: None,
        }
    }
}

impl ClawEmulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared(self) -> Arc<Mutex<Self>> {
        Arc::new(Mutex::new(self))
    }

    /// Read `len` bytes of profile memory
    pub fn memory(&self, address: u16, len: usize) -> Vec<u8> {
        (0..len)
            .map(|i| {
                let addr = address.wrapping_add(i as u16);
                self.memory.get(&addr).copied().unwrap_or(0xFF)
            })
            .collect()
    }

    pub fn write_memory(&mut self, address: u16, data: &[u8]) {
        for (i, &b) in data.iter().enumerate() {
            self.memory.insert(address.wrapping_add(i as u16), b);
        }
    }

    /// Replies for one request
    pub fn respond(&mut self, command_type: u8, body: &[u8]) -> Vec<Vec<u8>> {
        let mut padded = [0u8; BODY_CAPACITY];
        let n = body.len().min(BODY_CAPACITY);
        padded[..n].copy_from_slice(&body[..n]);
        let body = &padded;

        let ack = || build_response(cmd::ACK, &[]).to_vec();
        match command_type {
            cmd::SWITCH_MODE => {
                self.gamepad_mode = body[0];
                self.mkeys_function = body[1];
                vec![ack(), ack()]
            }
            cmd::READ_GAMEPAD_MODE => {
                let (mode, function) = self
                    .reported_mode_override
                    .unwrap_or((self.gamepad_mode, self.mkeys_function));
                vec![build_response(cmd::GAMEPAD_MODE_ACK, &[mode, function]).to_vec()]
            }
            cmd::SYNC_TO_ROM => {
                self.rom_syncs += 1;
                vec![ack(), ack()]
            }
            cmd::RESET_DEVICE => {
                self.resets += 1;
                vec![ack()]
            }
            cmd::WRITE_PROFILE_DATA => {
                let address = u16::from_be_bytes([body[1], body[2]]);
                let len = (body[3] as usize).min(BODY_CAPACITY - 4);
                self.write_memory(address, &body[4..4 + len]);
                vec![ack()]
            }
            cmd::READ_PROFILE => {
                let address = u16::from_be_bytes([body[1], body[2]]);
                let mut payload = body[..4].to_vec();
                payload.extend(self.memory(address, body[3] as usize));
                vec![build_response(cmd::READ_PROFILE_ACK, &payload).to_vec()]
            }
            _ => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::InboundQueue;

    #[tokio::test]
    async fn test_responder_replies_delivered_before_return() {
        let mock = MockTransport::emulating(ClawEmulator::new().shared());
        let queue = Arc::new(InboundQueue::new());
        let sink = Arc::clone(&queue);
        mock.set_frame_handler(Arc::new(move |data: &[u8]| {
            if let Ok(frame) = protocol::parse_frame(data) {
                sink.deliver(frame);
            }
        }));

        let frame = protocol::build_frame(cmd::SYNC_TO_ROM, &[]).unwrap();
        assert_eq!(mock.write_report(&frame).await.unwrap(), 64);
        assert_eq!(queue.len(), 2);
        assert_eq!(mock.sent_commands(), vec![cmd::SYNC_TO_ROM]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_delayed_reply_arrives_later() {
        let mock = MockTransport::emulating(ClawEmulator::new().shared()).with_reply_delay(
            cmd::SWITCH_MODE,
            1,
            Duration::from_millis(30),
        );
        let queue = Arc::new(InboundQueue::new());
        let sink = Arc::clone(&queue);
        mock.set_frame_handler(Arc::new(move |data: &[u8]| {
            if let Ok(frame) = protocol::parse_frame(data) {
                sink.deliver(frame);
            }
        }));

        let frame = protocol::build_frame(cmd::SWITCH_MODE, &[0x04, 0x01]).unwrap();
        mock.write_report(&frame).await.unwrap();
        assert_eq!(queue.len(), 1, "first ack is immediate");

        tokio::time::sleep(Duration::from_millis(29)).await;
        assert_eq!(queue.len(), 1);
        tokio::time::sleep(Duration::from_millis(2)).await;
        assert_eq!(queue.len(), 2);
    }

    #[tokio::test]
    async fn test_failing_writes() {
        let mock = MockTransport::new().with_failing_writes_after(1);
        let frame = protocol::build_frame(cmd::ACK, &[]).unwrap();
        assert!(mock.write_report(&frame).await.is_ok());
        assert!(matches!(
            mock.write_report(&frame).await,
            Err(TransportError::HidError(_))
        ));
        assert_eq!(mock.writes().len(), 1);
    }

    #[test]
    fn test_emulator_profile_memory() {
        let mut emu = ClawEmulator::new();
        emu.respond(cmd::WRITE_PROFILE_DATA, &[0x01, 0x00, 0xBB, 0x02, 0x0A, 0x0B]);
        assert_eq!(emu.memory(0x00BB, 3), vec![0x0A, 0x0B, 0xFF]);

        let reply = emu.respond(cmd::READ_PROFILE, &[0x01, 0x00, 0xBB, 0x02]);
        assert_eq!(&reply[0][4..11], &[0x05, 0x01, 0x00, 0xBB, 0x02, 0x0A, 0x0B]);
    }
}
