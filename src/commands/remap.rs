//! M-key remap handler.

use anyhow::Context;
use claw_gamepad::{ClawDevice, MKey};

use super::CommandResult;

/// Show the mapping of `key`, or replace it with `keys`
pub async fn remap(device: &mut ClawDevice, key: MKey, keys: Vec<String>) -> CommandResult {
    if keys.is_empty() {
        println!("{key}: {}", device.key_remap(key).await?);
        return Ok(());
    }

    let list = keys.join(" ");
    device
        .set_key_remap(key, &list)
        .await
        .with_context(|| format!("remapping {key}"))?;
    println!("{key}: {}", device.key_remap(key).await?);
    Ok(())
}
