//! MSI Claw control tool library
//!
//! Shared pieces of the `claw-ctl` binary that are worth testing on their own.

pub mod config;

pub use config::{Config, DeviceConfig};
