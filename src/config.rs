//! Configuration for `claw-ctl`
//!
//! Read from a TOML file; a missing file or missing keys fall back to
//! defaults. Channel and session sections are owned by the library crates.

use std::path::{Path, PathBuf};

use anyhow::Context;
use claw_gamepad::SessionConfig;
use claw_transport::{ChannelConfig, VENDOR_ID};
use serde::Deserialize;

/// Which controller to open
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    pub vendor_id: u16,
    pub product_id: u16,
    /// hidraw path of the control interface; skips interface probing
    pub path: Option<String>,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            vendor_id: VENDOR_ID,
            product_id: claw_transport::CLAW_PIDS[0],
            path: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub device: DeviceConfig,
    pub channel: ChannelConfig,
    pub session: SessionConfig,
    /// Default tracing directive, overridden by `RUST_LOG` and `--log-level`
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            device: DeviceConfig::default(),
            channel: ChannelConfig::default(),
            session: SessionConfig::default(),
            log_level: "warn".to_string(),
        }
    }
}

impl Config {
    /// Get the default config file path
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("claw-ctl")
            .join("config.toml")
    }

    /// Load config from a file, or return default if not found
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("parsing {}", path.display()))
    }

    pub fn parse(content: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(content)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_is_default() {
        let config = Config::parse("").unwrap();
        assert_eq!(config.device, DeviceConfig::default());
        assert_eq!(config.device.vendor_id, 0x0db0);
        assert_eq!(config.device.product_id, 0x1901);
        assert_eq!(config.log_level, "warn");
        assert_eq!(config.session, SessionConfig::default());
        assert_eq!(config.channel.ack_timeout_ms, 20_000);
        assert_eq!(config.channel.read_timeout_ms, 1_000);
    }

    #[test]
    fn test_full_config() {
        let config = Config::parse(
            r#"
log_level = "debug"

[device]
vendor_id = 0x0db0
product_id = 0x1901
path = "/dev/hidraw3"

[channel]
ack_timeout_ms = 2000
read_timeout_ms = 80

[session]
debug_modes = true
"#,
        )
        .unwrap();
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.device.path.as_deref(), Some("/dev/hidraw3"));
        assert_eq!(config.channel.ack_timeout_ms, 2000);
        assert_eq!(config.channel.read_timeout_ms, 80);
        assert_eq!(config.channel.poll_interval_ms, 20);
        assert!(config.session.debug_modes);
        assert_eq!(config.session.resume_delay_ms, 500);
    }

    #[test]
    fn test_bad_config_rejected() {
        assert!(Config::parse("[device]\nvendor_id = \"msi\"").is_err());
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let path = std::env::temp_dir().join("claw-ctl-test-missing/config.toml");
        let config = Config::load(&path).unwrap();
        assert_eq!(config.log_level, "warn");
    }

    #[test]
    fn test_default_path() {
        assert!(Config::default_path().ends_with("claw-ctl/config.toml"));
    }
}
