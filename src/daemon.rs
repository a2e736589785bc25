//! Daemon body (G): device resolution, mount, and the signal-driven
//! shutdown path (§4.7).
//!
//! Mirrors the split between the original tool's thin argument-parsing
//! `main()` and its `run_daemon()` body: this module owns everything after
//! arguments have been validated.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use signal_hook::consts::signal::{SIGINT, SIGTERM};
use signal_hook::iterator::Signals;
use tracing::{error, info, warn};

use crate::cli::{Cli, DeviceType};
use crate::device::{BoardModel, Device, DummyDevice, I2cDevice};
use crate::error::{ConfigError, DaemonError, MountError};
use crate::fs::{clean_mount_point, LcdFilesystem};

const I2C_BUS_PATH: &str = "/dev/i2c-1";
const I2C_ADDRESS: u16 = 0x24;

/// Resolves `device_type` to a concrete device, preferring the real I2C
/// bus and falling back to the dummy device, matching the original's
/// "not running on RasPi => using dummy device" behavior.
fn resolve_device(device_type: &DeviceType) -> Result<Box<dyn Device>, ConfigError> {
    let model = match device_type {
        DeviceType::Lcd03 => BoardModel::Lcd03,
        DeviceType::Lcd05 => BoardModel::Lcd05,
        DeviceType::Panel => BoardModel::Panel,
        DeviceType::Custom(s) => return Err(ConfigError::UnknownDeviceType(s.clone())),
    };

    match I2cDevice::open(I2C_BUS_PATH, I2C_ADDRESS, model) {
        Ok(device) => {
            info!(device_type = %device_type, "terminal device type resolved");
            Ok(Box::new(device))
        }
        Err(err) => {
            warn!(%err, "not running on the target hardware => using dummy device");
            Ok(Box::new(DummyDevice::new()))
        }
    }
}

/// Runs the daemon to completion: resolves the device, mounts, and blocks
/// until a termination signal requests a graceful unmount.
pub fn run(cli: Cli) -> Result<(), DaemonError> {
    let device = resolve_device(&cli.device_type)?;
    let device: Arc<Mutex<dyn Device>> = Arc::new(Mutex::new(*device));

    clean_mount_point(&cli.mount_point).map_err(|source| MountError::Cleanup(cli.mount_point.clone(), source))?;

    let filesystem = LcdFilesystem::new(device, !cli.no_splash);

    let options = vec![
        fuser::MountOption::FSName("lcdfs".to_string()),
        fuser::MountOption::AllowOther,
        fuser::MountOption::DefaultPermissions,
    ];

    info!(mount_point = %cli.mount_point.display(), "starting FUSE daemon");
    let session = fuser::spawn_mount2(filesystem, &cli.mount_point, &options)
        .map_err(|source| MountError::Mount {
            path: cli.mount_point.clone(),
            source,
        })?;

    wait_for_shutdown_signal();

    drop(session);
    info!("FUSE daemon stopped");

    clean_mount_point(&cli.mount_point).map_err(|source| MountError::Cleanup(cli.mount_point, source))?;

    Ok(())
}

/// Blocks until SIGINT or SIGTERM arrives, using the same dedicated
/// signal-watcher-thread idiom the teacher crate uses for its own terminal
/// cleanup.
fn wait_for_shutdown_signal() {
    let received = Arc::new(AtomicBool::new(false));
    let received_thread = received.clone();

    let mut signals = match Signals::new([SIGINT, SIGTERM]) {
        Ok(signals) => signals,
        Err(err) => {
            error!(%err, "failed to install signal handler, running until killed");
            loop {
                std::thread::sleep(std::time::Duration::from_secs(3600));
            }
        }
    };
    let handle = signals.handle();

    let thread = std::thread::spawn(move || {
        for signal in signals.forever() {
            info!(signal, "shutdown signal received");
            received_thread.store(true, Ordering::SeqCst);
            break;
        }
    });

    while !received.load(Ordering::SeqCst) {
        std::thread::sleep(std::time::Duration::from_millis(100));
    }

    handle.close();
    let _ = thread.join();
}
