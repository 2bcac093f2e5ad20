//! Command handlers for the CLI application.
//!
//! - `query`: read-only commands (info, modes, functions, keys)
//! - `mode`: gamepad mode, M-key function and reset
//! - `remap`: M-key remapping
//! - `led`: lighting

pub mod led;
pub mod mode;
pub mod query;
pub mod remap;

use std::ffi::CString;
use std::sync::Arc;

use anyhow::Context;
use claw_gamepad::ClawDevice;
use claw_transport::{BoxedTransport, HidClawTransport, Transport};
use hidapi::HidApi;
use tracing::info;

use claw_driver::Config;

/// Result type for command handlers
pub type CommandResult = anyhow::Result<()>;

/// Open the configured controller and start a session on it
pub fn open_device(config: &Config) -> anyhow::Result<ClawDevice> {
    let api = HidApi::new().context("initialising hidapi")?;
    let transport = match &config.device.path {
        Some(path) => {
            let cpath = CString::new(path.as_str()).context("device path contains NUL")?;
            HidClawTransport::open_path(&api, &cpath)
                .with_context(|| format!("opening {path}"))?
        }
        None => HidClawTransport::open_first(
            &api,
            config.device.vendor_id,
            config.device.product_id,
        )
        .context("no controller found")?,
    };
    info!("Opened {}", transport.device_info().device_path);

    let transport: BoxedTransport = Arc::new(transport);
    let device = ClawDevice::new(transport, config.channel.clone(), config.session.clone());
    if !device.is_ready() {
        anyhow::bail!("not the control interface, pick another hidraw node with --device");
    }
    Ok(device)
}
