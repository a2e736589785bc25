//! CLI & Bootstrap (G): argument parsing for the `lcdfsd` binary (§4.7, §6).

use std::path::PathBuf;

use clap::Parser;

use crate::error::ConfigError;

/// The LCD types this daemon knows how to resolve a device for, plus a
/// forward-compatible escape hatch for a raw designator string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceType {
    Lcd03,
    Lcd05,
    Panel,
    Custom(String),
}

impl std::str::FromStr for DeviceType {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_lowercase().as_str() {
            "lcd03" => Self::Lcd03,
            "lcd05" => Self::Lcd05,
            "panel" => Self::Panel,
            _ => Self::Custom(s.to_string()),
        })
    }
}

impl std::fmt::Display for DeviceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Lcd03 => write!(f, "lcd03"),
            Self::Lcd05 => write!(f, "lcd05"),
            Self::Panel => write!(f, "panel"),
            Self::Custom(s) => write!(f, "{s}"),
        }
    }
}

/// `lcdfsd` command-line arguments.
#[derive(Debug, Parser)]
#[command(name = "lcdfsd", about = "FUSE filesystem exposing an LCD panel")]
pub struct Cli {
    /// Filesystem mount point.
    #[arg(default_value = "/mnt/lcdfs")]
    pub mount_point: PathBuf,

    /// Type of LCD controller (lcd03|lcd05|panel, or a custom designator).
    #[arg(short = 't', long = "device-type", default_value = "lcd03")]
    pub device_type: DeviceType,

    /// Suppress the startup splash screen.
    #[arg(long)]
    pub no_splash: bool,

    /// Lower the log level to debug.
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// Parses `std::env::args`, validating the mount point exists and is a
    /// directory (§4.7).
    pub fn parse_validated() -> Result<Self, ConfigError> {
        let cli = Self::parse();
        if !cli.mount_point.is_dir() {
            return Err(ConfigError::InvalidMountPoint(cli.mount_point));
        }
        Ok(cli)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn device_type_parses_known_names_case_insensitively() {
        assert_eq!("LCD03".parse::<DeviceType>().unwrap(), DeviceType::Lcd03);
        assert_eq!("panel".parse::<DeviceType>().unwrap(), DeviceType::Panel);
    }

    #[test]
    fn unknown_device_type_falls_back_to_custom() {
        assert_eq!(
            "my.custom.Device".parse::<DeviceType>().unwrap(),
            DeviceType::Custom("my.custom.Device".to_string())
        );
    }
}
