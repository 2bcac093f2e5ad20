//! Query (read-only) command handlers.

use super::CommandResult;
use claw_gamepad::ClawDevice;

/// Show device identity, firmware capabilities and the current status
pub async fn info(device: &mut ClawDevice) -> CommandResult {
    if let Some(info) = device.device_info() {
        println!(
            "Device: VID={:04X} PID={:04X} path={}",
            info.vid, info.pid, info.device_path
        );
        if let Some(name) = &info.product_name {
            println!("Product:  {name}");
        }
    }

    let caps = *device.capabilities();
    println!("Firmware: {} (0x{:04x})", caps.version, caps.version.raw);
    println!(
        "Remap:    {}",
        if caps.remap_supported() {
            "supported"
        } else {
            "unsupported"
        }
    );
    println!("RGB base: 0x{:04x}", caps.rgb.base);

    let mode = device.current_mode().await?;
    let function = device.current_key_function().await?;
    println!("Mode:     {mode}");
    println!("M-keys:   {function}");
    Ok(())
}

pub fn modes(device: &ClawDevice) -> CommandResult {
    for mode in device.available_modes() {
        println!("{mode}");
    }
    Ok(())
}

pub fn functions(device: &ClawDevice) -> CommandResult {
    for function in device.available_key_functions() {
        println!("{function}");
    }
    Ok(())
}

/// List the key symbols accepted by `remap`
pub fn keys(device: &ClawDevice) -> CommandResult {
    for symbol in device.available_remap_symbols()? {
        println!("{symbol}");
    }
    Ok(())
}
