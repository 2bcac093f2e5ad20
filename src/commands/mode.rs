//! Gamepad mode and M-key function handlers.

use anyhow::Context;
use claw_gamepad::{ClawDevice, GamepadMode, MKeysFunction};

use super::CommandResult;

/// Show the mode, or switch to `name`
pub async fn mode(device: &mut ClawDevice, name: Option<String>) -> CommandResult {
    match name {
        None => println!("{}", device.current_mode().await?),
        Some(name) => {
            let mode: GamepadMode = name.parse()?;
            device
                .set_current_mode(mode)
                .await
                .with_context(|| format!("switching to {mode}"))?;
            println!("Gamepad mode: {mode}");
        }
    }
    Ok(())
}

/// Show the M-key function, or switch to `name`
pub async fn function(device: &mut ClawDevice, name: Option<String>) -> CommandResult {
    match name {
        None => println!("{}", device.current_key_function().await?),
        Some(name) => {
            let function: MKeysFunction = name.parse()?;
            device
                .set_current_key_function(function)
                .await
                .with_context(|| format!("switching M-keys to {function}"))?;
            println!("M-key function: {function}");
        }
    }
    Ok(())
}

pub async fn reset(device: &mut ClawDevice) -> CommandResult {
    device.reset_device().await.context("resetting device")?;
    println!("Device reset");
    Ok(())
}
