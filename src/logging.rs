//! Structured logging setup (H), fanned out to a console layer and a
//! rotating file layer (§4.8).
//!
//! Unlike the teacher crate, which gates `tracing` behind a feature so
//! library consumers can opt out, this is a binary daemon: `tracing` is an
//! unconditional dependency and this module just wires up the one
//! subscriber the process runs with.

use std::path::PathBuf;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Guard returned by [`init`]; dropping it flushes the file appender's
/// background worker. Must be kept alive for the process lifetime.
pub struct LoggingGuard {
    _file_guard: tracing_appender::non_blocking::WorkerGuard,
}

/// Picks the log directory per the root/non-root split (§4.8, §6):
/// `/var/log/lcdfs` when running as root, `$HOME/.local/state/lcdfs`
/// otherwise.
pub fn log_directory() -> PathBuf {
    let is_root = unsafe { libc::getuid() } == 0;
    if is_root {
        PathBuf::from("/var/log/lcdfs")
    } else {
        let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
        PathBuf::from(home).join(".local/state/lcdfs")
    }
}

/// Initializes the global tracing subscriber: a console layer at `level`
/// and a daily-rotating file layer under [`log_directory`].
///
/// The file layer rotates once per day rather than at a fixed byte size;
/// this is a deliberate approximation of the original tool's 100 KiB /
/// 3-backups `RotatingFileHandler` policy, since `tracing-appender` only
/// supports time-based rotation (see DESIGN.md).
pub fn init(verbose: bool) -> std::io::Result<LoggingGuard> {
    let level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let dir = log_directory();
    std::fs::create_dir_all(&dir)?;
    let file_appender = tracing_appender::rolling::daily(&dir, "lcdfs.log");
    let (non_blocking, file_guard) = tracing_appender::non_blocking(file_appender);

    let console_layer = fmt::layer().with_target(false);
    let file_layer = fmt::layer().with_writer(non_blocking).with_ansi(false);

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .init();

    Ok(LoggingGuard {
        _file_guard: file_guard,
    })
}
