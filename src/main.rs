//! MSI Claw control CLI
//!
//! Switches the gamepad mode, remaps the M-keys and drives the RGB zones
//! of the controller's vendor control interface.

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use claw_driver::Config;

mod cli;
use cli::{Cli, Commands};

mod commands;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(Config::default_path);
    let mut config = Config::load(&config_path)?;
    if let Some(path) = cli.device.clone() {
        config.device.path = Some(path);
    }

    // Initialize logging
    let level = cli.log_level.as_deref().unwrap_or(&config.log_level);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let mut device = commands::open_device(&config).context("opening controller")?;

    match cli.command {
        // Default: show device info
        None | Some(Commands::Info) => commands::query::info(&mut device).await?,
        Some(Commands::Modes) => commands::query::modes(&device)?,
        Some(Commands::Functions) => commands::query::functions(&device)?,
        Some(Commands::Keys) => commands::query::keys(&device)?,

        Some(Commands::Mode { name }) => commands::mode::mode(&mut device, name).await?,
        Some(Commands::Function { name }) => commands::mode::function(&mut device, name).await?,
        Some(Commands::Reset) => commands::mode::reset(&mut device).await?,

        Some(Commands::Remap { key, keys }) => {
            commands::remap::remap(&mut device, key, keys).await?
        }
        Some(Commands::Led(args)) => commands::led::apply(&mut device, args).await?,
    }

    Ok(())
}
