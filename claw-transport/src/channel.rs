//! Command/ACK channel over the control interface
//!
//! The channel owns the bound transport and the inbound queue. Every protocol
//! operation takes `&mut self`, so at most one command is ever in flight.

use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::command::{ClawCommand, ClawResponse};
use crate::error::TransportError;
use crate::protocol::{self, cmd, parse_frame, timing, FrameError, InboundFrame, REPORT_SIZE};
use crate::queue::InboundQueue;
use crate::types::TransportDeviceInfo;
use crate::BoxedTransport;

/// Timeouts used by the channel
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ChannelConfig {
    /// Deadline for an ACK after a write command (default 1000 polls)
    pub ack_timeout_ms: u64,
    /// Deadline for the reply to a read-style command (default 50 polls)
    pub read_timeout_ms: u64,
    /// Inbound queue poll interval
    pub poll_interval_ms: u64,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            ack_timeout_ms: timing::ACK_TIMEOUT_MS,
            read_timeout_ms: timing::READ_TIMEOUT_MS,
            poll_interval_ms: timing::POLL_INTERVAL_MS,
        }
    }
}

impl ChannelConfig {
    pub fn ack_timeout(&self) -> Duration {
        Duration::from_millis(self.ack_timeout_ms)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

pub struct ControlChannel {
    transport: Option<BoxedTransport>,
    queue: Arc<InboundQueue>,
    config: ChannelConfig,
}

impl Default for ControlChannel {
    fn default() -> Self {
        Self::new(ChannelConfig::default())
    }
}

impl ControlChannel {
    pub fn new(config: ChannelConfig) -> Self {
        Self {
            transport: None,
            queue: Arc::new(InboundQueue::new()),
            config,
        }
    }

    /// Bind a transport if it is the control interface
    ///
    /// Returns `false` (and leaves the channel unbound) for any other
    /// interface of the device.
    pub fn attach(&mut self, transport: BoxedTransport) -> bool {
        let info = transport.device_info();
        if !info.is_control() {
            debug!(
                "Ignoring {:?} interface at {}",
                info.interface, info.device_path
            );
            return false;
        }

        let queue = Arc::clone(&self.queue);
        transport.set_frame_handler(Arc::new(move |data: &[u8]| ingest(&queue, data)));
        debug!("Control interface bound: {}", info.device_path);
        self.transport = Some(transport);
        true
    }

    /// Unbind the transport, returning it
    pub fn detach(&mut self) -> Option<BoxedTransport> {
        self.queue.flush();
        self.transport.take()
    }

    pub fn is_ready(&self) -> bool {
        self.transport.is_some()
    }

    pub fn device_info(&self) -> Option<&TransportDeviceInfo> {
        self.transport.as_ref().map(|t| t.device_info())
    }

    pub fn config(&self) -> &ChannelConfig {
        &self.config
    }

    pub fn queue(&self) -> &Arc<InboundQueue> {
        &self.queue
    }

    /// Flush stale frames, then write one command frame
    pub async fn send(&mut self, command_type: u8, body: &[u8]) -> Result<(), TransportError> {
        let transport = self.transport.as_ref().ok_or(TransportError::NotReady)?;

        let dropped = self.queue.flush();
        if dropped > 0 {
            debug!("Flushed {} stale frame(s)", dropped);
        }

        let frame = protocol::build_frame(command_type, body)?;
        debug!(
            "Sending {} (0x{:02X}): {:02X?}",
            cmd::name(command_type),
            command_type,
            &frame[..protocol::HEADER_SIZE + body.len().min(8)]
        );

        let written = transport.write_report(&frame).await?;
        if written < REPORT_SIZE {
            return Err(TransportError::ShortWrite {
                written,
                expected: REPORT_SIZE,
            });
        }
        Ok(())
    }

    /// Wait for the next inbound frame
    pub async fn read_frame(&mut self, timeout: Duration) -> Result<InboundFrame, TransportError> {
        self.queue
            .pop_blocking(timeout, self.config.poll_interval())
            .await
    }

    /// Wait for an ACK (0x06)
    pub async fn await_ack(&mut self) -> Result<(), TransportError> {
        let frame = self.read_frame(self.config.ack_timeout()).await?;
        match frame.command_type() {
            cmd::ACK => Ok(()),
            got => Err(TransportError::UnexpectedResponse {
                expected: cmd::ACK,
                got,
            }),
        }
    }

    /// Send a command and return the next inbound frame
    pub async fn round_trip(
        &mut self,
        command_type: u8,
        body: &[u8],
        timeout: Duration,
    ) -> Result<InboundFrame, TransportError> {
        self.send(command_type, body).await?;
        self.read_frame(timeout).await
    }

    /// Send a typed write command and wait for its single ACK
    pub async fn send_command<C: ClawCommand>(&mut self, command: &C) -> Result<(), TransportError> {
        self.send(C::COMMAND_TYPE, &command.body()).await?;
        self.await_ack().await
    }

    /// Send a typed read command and parse the reply
    pub async fn query<C, R>(&mut self, command: &C) -> Result<R, TransportError>
    where
        C: ClawCommand,
        R: ClawResponse,
    {
        let timeout = self.config.read_timeout();
        let frame = self
            .round_trip(C::COMMAND_TYPE, &command.body(), timeout)
            .await?;
        Ok(R::parse(&frame)?)
    }
}

/// Frame handler body: validate and queue, never fail
fn ingest(queue: &InboundQueue, data: &[u8]) {
    match parse_frame(data) {
        Ok(frame) => {
            debug!("Received {:?}", frame);
            queue.deliver(frame);
        }
        Err(FrameError::Length { got }) => {
            debug!("Ignoring {} byte report", got);
        }
        Err(e) => warn!("Dropping inbound report: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{GamepadModeResponse, ReadGamepadMode, SyncToRom};
    use crate::mock::MockTransport;
    use crate::protocol::build_response;
    use crate::types::InterfaceKind;

    fn bound(mock: &Arc<MockTransport>) -> ControlChannel {
        let mut channel = ControlChannel::default();
        assert!(channel.attach(mock.clone()));
        channel
    }

    #[test]
    fn test_config_defaults_and_toml() {
        let config = ChannelConfig::default();
        assert_eq!(config.ack_timeout(), Duration::from_secs(20));
        assert_eq!(config.read_timeout(), Duration::from_secs(1));
        assert_eq!(config.poll_interval(), Duration::from_millis(20));

        let parsed: ChannelConfig = toml::from_str("ack_timeout_ms = 250").unwrap();
        assert_eq!(parsed.ack_timeout_ms, 250);
        assert_eq!(parsed.read_timeout_ms, 1000);
    }

    #[test]
    fn test_ingest_filters_reports() {
        let queue = InboundQueue::new();
        ingest(&queue, &[0x10, 0x00]);
        let mut bad = build_response(cmd::ACK, &[]);
        bad[0] = 0x11;
        ingest(&queue, &bad);
        assert!(queue.is_empty());

        ingest(&queue, &build_response(cmd::ACK, &[]));
        assert_eq!(queue.len(), 1);
    }

    #[tokio::test]
    async fn test_attach_requires_control_interface() {
        let mock = Arc::new(MockTransport::new().with_interface(InterfaceKind::GameControl));
        let mut channel = ControlChannel::default();
        assert!(!channel.attach(mock.clone()));
        assert!(!channel.is_ready());

        let err = channel.send(cmd::SYNC_TO_ROM, &[]).await.unwrap_err();
        assert!(matches!(err, TransportError::NotReady));
        assert!(mock.writes().is_empty());
    }

    #[tokio::test]
    async fn test_send_flushes_stale_frames() {
        let mock = Arc::new(MockTransport::new());
        let mut channel = bound(&mock);
        mock.inject(&build_response(cmd::GAMEPAD_MODE_ACK, &[1, 0]));
        mock.inject(&build_response(cmd::ACK, &[]));
        assert_eq!(channel.queue().len(), 2);

        channel.send(cmd::RESET_DEVICE, &[]).await.unwrap();
        assert!(channel.queue().is_empty());
        assert_eq!(mock.sent_commands(), vec![cmd::RESET_DEVICE]);
    }

    #[tokio::test]
    async fn test_short_write_reported() {
        let mock = Arc::new(MockTransport::new().with_short_writes(32));
        let mut channel = bound(&mock);
        let err = channel.send(cmd::RESET_DEVICE, &[]).await.unwrap_err();
        assert!(matches!(
            err,
            TransportError::ShortWrite {
                written: 32,
                expected: 64
            }
        ));
    }

    #[tokio::test]
    async fn test_await_ack_accepts_ack() {
        let mock = Arc::new(MockTransport::new());
        mock.respond_with(|_, _| vec![build_response(cmd::ACK, &[]).to_vec()]);
        let mut channel = bound(&mock);
        channel.send_command(&crate::command::ResetDevice).await.unwrap();
    }

    #[tokio::test]
    async fn test_await_ack_rejects_every_other_code() {
        for got in (0u8..=0xFF).filter(|&c| c != cmd::ACK) {
            let mock = Arc::new(MockTransport::new());
            let mut channel = bound(&mock);
            mock.inject(&build_response(got, &[]));
            let err = channel.await_ack().await.unwrap_err();
            assert!(
                matches!(err, TransportError::UnexpectedResponse { expected: 0x06, got: g } if g == got),
                "code 0x{got:02X} gave {err:?}"
            );
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_await_ack_times_out() {
        let mock = Arc::new(MockTransport::new());
        let mut channel = bound(&mock);
        channel.send(cmd::SYNC_TO_ROM, &[]).await.unwrap();
        assert!(matches!(
            channel.await_ack().await,
            Err(TransportError::Timeout)
        ));
    }

    #[tokio::test]
    async fn test_two_ack_command() {
        let mock = Arc::new(MockTransport::new());
        mock.respond_with(|_, _| {
            vec![
                build_response(cmd::ACK, &[]).to_vec(),
                build_response(cmd::ACK, &[]).to_vec(),
            ]
        });
        let mut channel = bound(&mock);
        channel.send_command(&SyncToRom).await.unwrap();
        channel.await_ack().await.unwrap();
        assert!(channel.queue().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_ack_arriving_while_polling() {
        let mock = Arc::new(
            MockTransport::new().with_reply_delay(cmd::RESET_DEVICE, 0, Duration::from_millis(45)),
        );
        mock.respond_with(|_, _| vec![build_response(cmd::ACK, &[]).to_vec()]);
        let mut channel = bound(&mock);
        channel.send_command(&crate::command::ResetDevice).await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_late_stale_frame_flushed_by_next_send() {
        let mock = Arc::new(MockTransport::new().with_reply_delay(
            cmd::RESET_DEVICE,
            1,
            Duration::from_millis(30),
        ));
        mock.respond_with(|command_type, _| match command_type {
            cmd::RESET_DEVICE => vec![
                build_response(cmd::ACK, &[]).to_vec(),
                build_response(cmd::GAMEPAD_MODE_ACK, &[0x01, 0x00]).to_vec(),
            ],
            _ => vec![build_response(cmd::GAMEPAD_MODE_ACK, &[0x04, 0x01]).to_vec()],
        });
        let mut channel = bound(&mock);

        channel.send_command(&crate::command::ResetDevice).await.unwrap();
        assert!(channel.queue().is_empty());

        // The unsolicited reply lands after the exchange finished
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(channel.queue().len(), 1);

        let resp: GamepadModeResponse = channel.query(&ReadGamepadMode).await.unwrap();
        assert_eq!((resp.gamepad_mode, resp.mkeys_function), (0x04, 0x01));
        assert!(channel.queue().is_empty());
    }

    #[tokio::test]
    async fn test_typed_query() {
        let mock = Arc::new(MockTransport::new());
        mock.respond_with(|command_type, _| {
            assert_eq!(command_type, cmd::READ_GAMEPAD_MODE);
            vec![build_response(cmd::GAMEPAD_MODE_ACK, &[0x04, 0x00]).to_vec()]
        });
        let mut channel = bound(&mock);
        let resp: GamepadModeResponse = channel.query(&ReadGamepadMode).await.unwrap();
        assert_eq!(resp.gamepad_mode, 4);
        assert_eq!(resp.mkeys_function, 0);
    }
}
