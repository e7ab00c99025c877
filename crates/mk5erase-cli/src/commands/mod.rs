//! CLI command implementations

use anyhow::{Context, Result};
use mk5erase_core::DeviceLink;

/// Conditionally println based on silent mode
macro_rules! println_if {
    ($silent:expr) => {
        if !$silent {
            println!();
        }
    };
    ($silent:expr, $($arg:tt)*) => {
        if !$silent {
            println!($($arg)*);
        }
    };
}

pub mod config;
pub mod erase;
pub mod list;

/// Recorder to connect to, after merging flags and settings
#[derive(Debug, Clone)]
pub struct Target {
    pub address: String,
    pub port: u16,
}

/// Connect to the recorder and identify it
pub fn connect(target: &Target) -> Result<DeviceLink> {
    DeviceLink::connect(&target.address, target.port).with_context(|| {
        format!(
            "Could not open a session with the recorder at {}:{}",
            target.address, target.port
        )
    })
}
