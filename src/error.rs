//! Error taxonomy shared across the device, handler, and FUSE layers (§7).
//!
//! `NotFound`, `ReadOnly`, and `ParseError` are not represented here as
//! exceptions — they are outcomes encoded directly in handler/directory
//! return values and converted to the matching `errno` at the FUSE boundary
//! (see [`crate::fs`]). This module carries the errors that *can* escape a
//! layer: hardware failures, bad configuration, and mount failures.

use std::fmt;

/// A hardware or transport-level failure from the device abstraction (A).
#[derive(Debug, thiserror::Error)]
pub enum DeviceError {
    /// The underlying transport (I2C, uinput, ...) returned an I/O error.
    #[error("device I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The device does not support this operation (capability absent).
    #[error("device does not support {0}")]
    Unsupported(&'static str),

    /// The device rejected or could not encode the command.
    #[error("device protocol error: {0}")]
    Protocol(String),
}

/// A bad CLI argument or unresolvable device type (§4.7, G).
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("unsupported device type: {0}")]
    UnknownDeviceType(String),

    #[error("mount point {0:?} does not exist or is not a directory")]
    InvalidMountPoint(std::path::PathBuf),
}

/// FUSE refused to mount, or the mount point was left in a stale state.
#[derive(Debug, thiserror::Error)]
pub enum MountError {
    #[error("failed to mount at {path:?}: {source}")]
    Mount {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to clean mount point {0:?}: {1}")]
    Cleanup(std::path::PathBuf, std::io::Error),
}

/// Top-level error a running daemon can terminate on.
#[derive(Debug, thiserror::Error)]
pub enum DaemonError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Mount(#[from] MountError),
    #[error(transparent)]
    Device(#[from] DeviceError),
}

/// The recoverable errors a [`crate::handlers::FileHandler`] write can
/// report; parse failures are not errors (they return `Ok(0)` per §4.3).
/// The FUSE layer (`src/fs.rs`) maps [`WriteError::ReadOnly`] to `EACCES`
/// and [`WriteError::Device`] to `EIO` (§7).
#[derive(Debug)]
pub enum WriteError {
    ReadOnly,
    Device(DeviceError),
}

impl fmt::Display for WriteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ReadOnly => f.write_str("file is read-only"),
            Self::Device(err) => write!(f, "device rejected the write: {err}"),
        }
    }
}

impl std::error::Error for WriteError {}
