//! M-key remap against the emulated profile memory.

use std::sync::Arc;

use claw_gamepad::firmware::{REMAP_ADDR_NEW, REMAP_ADDR_OLD};
use claw_gamepad::remap::{self, MKey};
use claw_gamepad::{ClawDevice, ClawError, SessionConfig};
use claw_transport::mock::{ClawEmulator, MockTransport};
use claw_transport::protocol::{build_response, cmd, decode_request};
use claw_transport::{ChannelConfig, ControlChannel, TransportError};

fn bound(mock: &Arc<MockTransport>) -> ControlChannel {
    let mut channel = ControlChannel::default();
    assert!(channel.attach(mock.clone()));
    channel
}

#[tokio::test]
async fn write_then_read_returns_codes() {
    let emulator = ClawEmulator::new().shared();
    let mock = Arc::new(MockTransport::emulating(emulator.clone()));
    let mut channel = bound(&mock);

    let codes = [0x09, 0x0a];
    remap::write_remap(&mut channel, &REMAP_ADDR_NEW, MKey::M2, &codes)
        .await
        .unwrap();

    let writes = mock.writes();
    let (command_type, body) = decode_request(&writes[0]).unwrap();
    assert_eq!(command_type, cmd::WRITE_PROFILE_DATA);
    assert_eq!(
        &body[..11],
        &[0x01, 0x01, 0x64, 0x07, 0x04, 0x00, 0x09, 0x0a, 0xff, 0xff, 0xff]
    );
    assert_eq!(
        mock.sent_commands(),
        vec![cmd::WRITE_PROFILE_DATA, cmd::SYNC_TO_ROM]
    );

    let read = remap::read_remap(&mut channel, &REMAP_ADDR_NEW, MKey::M2)
        .await
        .unwrap();
    assert_eq!(read, codes);

    let writes = mock.writes();
    let (command_type, body) = decode_request(writes.last().unwrap()).unwrap();
    assert_eq!(command_type, cmd::READ_PROFILE);
    assert_eq!(&body[..4], &[0x01, 0x01, 0x64, 0x07]);
}

#[tokio::test]
async fn old_layout_addresses() {
    let emulator = ClawEmulator::new().shared();
    let mock = Arc::new(MockTransport::emulating(emulator.clone()));
    let mut channel = bound(&mock);

    remap::write_remap(&mut channel, &REMAP_ADDR_OLD, MKey::M1, &[0x32])
        .await
        .unwrap();
    assert_eq!(
        emulator.lock().memory(0x007a, 7),
        vec![0x04, 0x00, 0x32, 0xff, 0xff, 0xff, 0xff]
    );
}

#[tokio::test]
async fn read_reply_must_be_profile_ack() {
    let mock = Arc::new(MockTransport::new());
    mock.respond_with(|_, _| vec![build_response(cmd::ACK, &[]).to_vec()]);
    let mut channel = bound(&mock);
    assert!(matches!(
        remap::read_remap(&mut channel, &REMAP_ADDR_NEW, MKey::M1).await,
        Err(ClawError::Transport(TransportError::UnexpectedResponse {
            expected: 0x05,
            got: 0x06
        }))
    ));
}

#[tokio::test]
async fn session_remap_text() {
    let mock = Arc::new(MockTransport::emulating(ClawEmulator::new().shared()));
    let mut device = ClawDevice::new(mock, ChannelConfig::default(), SessionConfig::default());

    assert_eq!(device.key_remap(MKey::M1).await.unwrap(), "disabled");

    device
        .set_key_remap(MKey::M1, "KEY_LEFTCTRL KEY_LEFTSHIFT KEY_ESC")
        .await
        .unwrap();
    assert_eq!(
        device.key_remap(MKey::M1).await.unwrap(),
        "KEY_LEFTCTRL KEY_LEFTSHIFT KEY_ESC"
    );
    assert_eq!(device.key_remap(MKey::M2).await.unwrap(), "disabled");

    device.set_key_remap(MKey::M1, "disabled").await.unwrap();
    assert_eq!(device.key_remap(MKey::M1).await.unwrap(), "disabled");

    assert!(matches!(
        device.set_key_remap(MKey::M1, "KEY_NOPE").await,
        Err(ClawError::UnknownKeySymbol(_))
    ));
}

#[tokio::test]
async fn remap_unsupported_firmware() {
    let mock = Arc::new(MockTransport::new().with_firmware(0x0216));
    let mut device = ClawDevice::new(mock.clone(), ChannelConfig::default(), SessionConfig::default());

    assert!(matches!(
        device.available_remap_symbols(),
        Err(ClawError::RemapUnsupported(0x0216))
    ));
    assert!(matches!(
        device.set_key_remap(MKey::M1, "KEY_A").await,
        Err(ClawError::RemapUnsupported(0x0216))
    ));
    assert!(mock.writes().is_empty());
}
