//! Core: device abstraction, ANSI engine, file handlers, virtual directory,
//! FUSE operations, keypad monitor, and the ambient CLI/logging/error stack
//! around them.

pub mod ansi;
pub mod cli;
pub mod daemon;
pub mod device;
pub mod directory;
pub mod error;
pub mod fs;
pub mod handlers;
pub mod keypad;
pub mod logging;
