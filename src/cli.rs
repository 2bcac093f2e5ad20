//! CLI definitions using clap derive

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use claw_gamepad::{LedEffect, MKey};

#[derive(Parser)]
#[command(name = "claw-ctl")]
#[command(author, version, about = "Control tool for the MSI Claw gamepad", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Config file (default: $XDG_CONFIG_HOME/claw-ctl/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace); overrides the config file
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// hidraw path of the control interface
    #[arg(long, global = true)]
    pub device: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show device, firmware and current mode
    #[command(visible_alias = "i")]
    Info,

    /// List selectable gamepad modes
    Modes,

    /// Show or set the gamepad mode
    #[command(visible_alias = "m")]
    Mode {
        /// Mode name (xinput, desktop, ...)
        name: Option<String>,
    },

    /// List selectable M-key functions
    Functions,

    /// Show or set the M-key function
    #[command(visible_alias = "fn")]
    Function {
        /// Function name (macro, combination)
        name: Option<String>,
    },

    /// Reset the controller
    Reset,

    /// List key symbols accepted by `remap`
    Keys,

    /// Show or set an M-key mapping
    #[command(visible_alias = "r")]
    Remap {
        /// M1 or M2
        key: MKey,
        /// Up to five key symbols, or "disabled"
        keys: Vec<String>,
    },

    /// Apply a lighting state
    Led(LedArgs),
}

/// Lighting state; options not given keep their defaults
#[derive(Args, Debug, Default)]
pub struct LedArgs {
    /// Turn the lights off
    #[arg(long)]
    pub off: bool,

    /// Effect (monocolor, breathe, chroma, rainbow, custom)
    #[arg(short, long)]
    pub effect: Option<LedEffect>,

    /// Animation speed 0-100
    #[arg(short, long, value_parser = clap::value_parser!(u8).range(0..=100))]
    pub speed: Option<u8>,

    /// Brightness 0-100
    #[arg(short, long, value_parser = clap::value_parser!(u8).range(0..=100))]
    pub brightness: Option<u8>,

    /// Base colour as R,G,B
    #[arg(short, long)]
    pub color: Option<claw_gamepad::Rgb>,

    /// Custom keyframes, "R,G,B R,G,B ...; R,G,B ..." (9 zones each)
    #[arg(short, long)]
    pub keyframes: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_remap() {
        let cli = Cli::try_parse_from(["claw-ctl", "remap", "m2", "KEY_LEFTCTRL", "KEY_C"]).unwrap();
        match cli.command {
            Some(Commands::Remap { key, keys }) => {
                assert_eq!(key, MKey::M2);
                assert_eq!(keys, vec!["KEY_LEFTCTRL", "KEY_C"]);
            }
            _ => panic!("expected remap"),
        }
    }

    #[test]
    fn test_parse_led() {
        let cli = Cli::try_parse_from([
            "claw-ctl",
            "--log-level",
            "debug",
            "led",
            "--effect",
            "chroma",
            "--speed",
            "40",
            "--color",
            "0,128,255",
        ])
        .unwrap();
        assert_eq!(cli.log_level.as_deref(), Some("debug"));
        let Some(Commands::Led(args)) = cli.command else {
            panic!("expected led");
        };
        assert_eq!(args.effect, Some(LedEffect::Chroma));
        assert_eq!(args.speed, Some(40));
        assert_eq!(args.color.map(|c| c.to_string()).as_deref(), Some("0,128,255"));
    }

    #[test]
    fn test_rejects_out_of_range() {
        assert!(Cli::try_parse_from(["claw-ctl", "led", "--brightness", "101"]).is_err());
        assert!(Cli::try_parse_from(["claw-ctl", "remap", "m3"]).is_err());
    }
}
