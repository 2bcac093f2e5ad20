//! Integration tests against a real controller.
//!
//! These tests require a Claw to be connected and the hidraw node to be
//! accessible. Run with:
//! cargo test -p claw-gamepad --test device_queries -- --ignored --nocapture

use std::sync::Arc;

use claw_gamepad::{ClawDevice, SessionConfig};
use claw_transport::{ChannelConfig, HidClawTransport};

fn open_device() -> ClawDevice {
    let api = hidapi::HidApi::new().expect("hidapi init");
    let transport = HidClawTransport::open_default(&api)
        .expect("No Claw found, plug in a supported device");
    ClawDevice::new(
        Arc::new(transport),
        ChannelConfig::default(),
        SessionConfig::default(),
    )
}

#[tokio::test(flavor = "multi_thread")]
#[ignore] // requires hardware
async fn reads_mode_and_function() {
    let mut device = open_device();
    assert!(device.is_ready());
    println!("firmware {}", device.firmware());

    let mode = device.current_mode().await.expect("read mode");
    let function = device.current_key_function().await.expect("read function");
    println!("mode {mode}, M-keys {function}");
}

#[tokio::test(flavor = "multi_thread")]
#[ignore] // requires hardware
async fn reads_remap_slots() {
    let mut device = open_device();
    if !device.capabilities().remap_supported() {
        println!("firmware {} has no remap support", device.firmware());
        return;
    }
    for key in claw_gamepad::MKey::ALL {
        let keys = device.key_remap(key).await.expect("read remap");
        println!("{key}: {keys}");
    }
}

// Writes must not block the only runtime thread
#[tokio::test]
#[ignore] // requires hardware
async fn queries_on_current_thread_runtime() {
    let mut device = open_device();
    let status = device.current_mode().await.expect("read mode");
    println!("mode {status}");
}
