//! Control interface of the MSI Claw handheld gamepad
//!
//! This crate provides the device-level operations (gamepad mode, M-key
//! remapping, RGB lighting) on top of the `claw-transport` command channel.
//! [`ClawDevice`] is the per-device session holding the cached state.

pub mod error;
pub mod firmware;
pub mod led;
pub mod mode;
pub mod remap;

pub use error::ClawError;
pub use firmware::{
    resolve_remap, resolve_rgb, FirmwareCapabilities, FirmwareVersion, RemapAddressTable,
    RgbAddressTable,
};
pub use led::{LedEffect, LedState, Rgb, RgbConfig};
pub use mode::{ControlStatus, GamepadMode, MKeysFunction};
pub use remap::MKey;

use std::time::Duration;

use claw_transport::protocol::timing;
use claw_transport::{BoxedTransport, ChannelConfig, ControlChannel, TransportDeviceInfo};
use serde::Deserialize;
use tracing::{debug, info, warn};

/// Session behaviour settings
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Offer every gamepad mode, not just xinput and desktop
    pub debug_modes: bool,
    /// Settle time before the mode is re-asserted on resume
    pub resume_delay_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            debug_modes: false,
            resume_delay_ms: timing::RESUME_DELAY_MS,
        }
    }
}

/// Per-device control session
///
/// Owns the command channel and the host-side copy of the device state.
/// Every operation that talks to the device takes `&mut self`.
pub struct ClawDevice {
    channel: ControlChannel,
    capabilities: FirmwareCapabilities,
    status: ControlStatus,
    led: LedState,
    config: SessionConfig,
}

impl ClawDevice {
    /// Start a session on a transport
    ///
    /// A transport that is not the control interface leaves the session
    /// unbound; every device operation then fails with `NotReady`.
    pub fn new(
        transport: BoxedTransport,
        channel_config: ChannelConfig,
        config: SessionConfig,
    ) -> Self {
        let version = FirmwareVersion::new(transport.device_info().firmware_bcd);
        let capabilities = FirmwareCapabilities::resolve(version);

        let mut channel = ControlChannel::new(channel_config);
        if !channel.attach(transport) {
            warn!("Not a control interface; device operations unavailable");
        }
        if !capabilities.remap_supported() {
            warn!("Firmware {} does not support M-key remapping", version);
        }
        debug!(
            "Session started: firmware {}, rgb base {:04x}",
            version, capabilities.rgb.base
        );

        Self {
            channel,
            capabilities,
            status: ControlStatus::default(),
            led: LedState::default(),
            config,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.channel.is_ready()
    }

    pub fn device_info(&self) -> Option<&TransportDeviceInfo> {
        self.channel.device_info()
    }

    pub fn firmware(&self) -> FirmwareVersion {
        self.capabilities.version
    }

    pub fn capabilities(&self) -> &FirmwareCapabilities {
        &self.capabilities
    }

    /// Last status written and verified by this session
    pub fn cached_status(&self) -> ControlStatus {
        self.status
    }

    // === Gamepad mode ===

    pub fn available_modes(&self) -> Vec<GamepadMode> {
        GamepadMode::ALL
            .into_iter()
            .filter(|m| m.is_available(self.config.debug_modes))
            .collect()
    }

    pub async fn current_mode(&mut self) -> Result<GamepadMode, ClawError> {
        Ok(mode::read_status(&mut self.channel).await?.gamepad_mode)
    }

    pub async fn set_current_mode(&mut self, gamepad_mode: GamepadMode) -> Result<(), ClawError> {
        if !gamepad_mode.is_available(self.config.debug_modes) {
            return Err(ClawError::NotSelectable(format!(
                "gamepad mode '{gamepad_mode}'"
            )));
        }
        self.switch(ControlStatus {
            gamepad_mode,
            ..self.status
        })
        .await
    }

    pub fn available_key_functions(&self) -> Vec<MKeysFunction> {
        MKeysFunction::ALL
            .into_iter()
            .filter(|f| f.is_selectable())
            .collect()
    }

    pub async fn current_key_function(&mut self) -> Result<MKeysFunction, ClawError> {
        Ok(mode::read_status(&mut self.channel).await?.mkeys_function)
    }

    pub async fn set_current_key_function(
        &mut self,
        mkeys_function: MKeysFunction,
    ) -> Result<(), ClawError> {
        if !mkeys_function.is_selectable() {
            return Err(ClawError::NotSelectable(format!(
                "key function '{mkeys_function}'"
            )));
        }
        self.switch(ControlStatus {
            mkeys_function,
            ..self.status
        })
        .await
    }

    async fn switch(&mut self, target: ControlStatus) -> Result<(), ClawError> {
        mode::switch_status(&mut self.channel, target).await?;
        self.status = target;
        Ok(())
    }

    pub async fn reset_device(&mut self) -> Result<(), ClawError> {
        mode::reset_device(&mut self.channel).await
    }

    /// Re-assert the cached status after the device wakes up
    pub async fn resume(&mut self) -> Result<(), ClawError> {
        tokio::time::sleep(Duration::from_millis(self.config.resume_delay_ms)).await;
        let status = self.status;
        info!("Resuming with {}", status);
        mode::switch_status(&mut self.channel, status).await
    }

    // === M-key remap ===

    fn remap_table(&self) -> Result<&'static RemapAddressTable, ClawError> {
        self.capabilities
            .remap
            .ok_or(ClawError::RemapUnsupported(self.capabilities.version.raw))
    }

    pub fn available_remap_symbols(&self) -> Result<Vec<&'static str>, ClawError> {
        self.remap_table()?;
        Ok(remap::symbols().collect())
    }

    /// Current mapping of an M-key, rendered as a key list
    pub async fn key_remap(&mut self, key: MKey) -> Result<String, ClawError> {
        let table = self.remap_table()?;
        let codes = remap::read_remap(&mut self.channel, table, key).await?;
        Ok(remap::format_key_list(&codes))
    }

    /// Map an M-key to up to five keys, e.g. `"KEY_LEFTCTRL KEY_C"` or `"disabled"`
    pub async fn set_key_remap(&mut self, key: MKey, keys: &str) -> Result<(), ClawError> {
        let table = self.remap_table()?;
        let codes = remap::parse_key_list(keys)?;
        remap::write_remap(&mut self.channel, table, key, &codes).await
    }

    // === Lighting ===

    pub fn led_state(&self) -> &LedState {
        &self.led
    }

    /// Compile and upload the current lighting state
    pub async fn apply_led(&mut self) -> Result<(), ClawError> {
        let config = self.led.compile()?;
        led::write_rgb(&mut self.channel, self.capabilities.rgb, &config).await
    }

    /// Replace the whole lighting state and apply it
    ///
    /// The state is validated by compiling it first; it is kept even if the
    /// upload then fails.
    pub async fn set_led_state(&mut self, state: LedState) -> Result<(), ClawError> {
        if state.speed > led::USER_SCALE_MAX || state.brightness > led::USER_SCALE_MAX {
            return Err(ClawError::InvalidParameter(format!(
                "speed {} / brightness {} out of range 0..=100",
                state.speed, state.brightness
            )));
        }
        if state.keyframes.len() > led::MAX_FRAMES {
            return Err(ClawError::InvalidParameter(format!(
                "{} keyframes, max {}",
                state.keyframes.len(),
                led::MAX_FRAMES
            )));
        }
        let config = state.compile()?;
        self.led = state;
        led::write_rgb(&mut self.channel, self.capabilities.rgb, &config).await
    }

    /// Apply only when enabled; disabling always uploads the off frame
    async fn update_led(&mut self, state: LedState) -> Result<(), ClawError> {
        let was_enabled = self.led.enabled;
        if state.enabled || was_enabled {
            self.set_led_state(state).await
        } else {
            state.compile()?;
            self.led = state;
            Ok(())
        }
    }

    pub fn led_enabled(&self) -> bool {
        self.led.enabled
    }

    pub async fn set_led_enabled(&mut self, enabled: bool) -> Result<(), ClawError> {
        let state = LedState {
            enabled,
            ..self.led.clone()
        };
        self.update_led(state).await
    }

    pub fn led_effect(&self) -> LedEffect {
        self.led.effect
    }

    pub async fn set_led_effect(&mut self, effect: LedEffect) -> Result<(), ClawError> {
        let state = LedState {
            effect,
            ..self.led.clone()
        };
        self.update_led(state).await
    }

    pub fn led_speed(&self) -> u8 {
        self.led.speed
    }

    pub async fn set_led_speed(&mut self, speed: u8) -> Result<(), ClawError> {
        check_scale("speed", speed)?;
        let state = LedState {
            speed,
            ..self.led.clone()
        };
        self.update_led(state).await
    }

    pub fn led_brightness(&self) -> u8 {
        self.led.brightness
    }

    pub async fn set_led_brightness(&mut self, brightness: u8) -> Result<(), ClawError> {
        check_scale("brightness", brightness)?;
        let state = LedState {
            brightness,
            ..self.led.clone()
        };
        self.update_led(state).await
    }

    pub fn led_color(&self) -> Rgb {
        self.led.color
    }

    pub async fn set_led_color(&mut self, color: Rgb) -> Result<(), ClawError> {
        let state = LedState {
            color,
            ..self.led.clone()
        };
        self.update_led(state).await
    }

    /// Custom keyframes in `R,G,B ...; R,G,B ...` form
    pub fn led_keyframes(&self) -> String {
        led::format_keyframes(&self.led.keyframes)
    }

    pub async fn set_led_keyframes(&mut self, text: &str) -> Result<(), ClawError> {
        let keyframes = led::parse_keyframes(text)?;
        let state = LedState {
            keyframes,
            ..self.led.clone()
        };
        self.update_led(state).await
    }
}

fn check_scale(what: &str, value: u8) -> Result<(), ClawError> {
    if value > led::USER_SCALE_MAX {
        return Err(ClawError::InvalidParameter(format!(
            "{what} {value} out of range 0..={}",
            led::USER_SCALE_MAX
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_config_toml() {
        let config: SessionConfig = toml::from_str("debug_modes = true").unwrap();
        assert!(config.debug_modes);
        assert_eq!(config.resume_delay_ms, 500);
        assert_eq!(
            toml::from_str::<SessionConfig>("").unwrap(),
            SessionConfig::default()
        );
    }

    #[test]
    fn test_check_scale() {
        assert!(check_scale("speed", 100).is_ok());
        assert!(matches!(
            check_scale("speed", 101),
            Err(ClawError::InvalidParameter(_))
        ));
    }
}
