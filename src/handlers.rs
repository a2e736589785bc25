//! File Handlers (C): the per-file read/write/size behavior backing each
//! entry in the virtual directory (§4.3).
//!
//! Modeled as a sum-type-shaped set of small structs behind one
//! [`FileHandler`] trait, each carrying only the state it needs: level
//! handlers carry a clamp bound and a cached decimal string, `Keys`/`Locked`
//! carry nothing but a device handle (they never cache), `Display` carries
//! the ANSI engine, and `Info` carries its fixed text computed once at
//! construction.

use std::sync::{Arc, Mutex};

use tracing::warn;

use crate::ansi::AnsiEngine;
use crate::device::Device;
use crate::error::WriteError;

/// Behavior shared by every file exposed at the mount point.
pub trait FileHandler: Send + Sync {
    /// Whether writes to this file are rejected with `EACCES`.
    fn is_read_only(&self) -> bool;

    /// The current payload, as read from the file.
    fn read(&self) -> Vec<u8>;

    /// Applies `data`, returning the byte count the writer should see, or a
    /// [`WriteError`] if the write was rejected or the device failed.
    fn write(&self, data: &[u8]) -> Result<u32, WriteError>;

    /// The size of the current payload; equals `read().len()` for every
    /// handler (§4.3).
    fn size(&self) -> u32 {
        self.read().len() as u32
    }
}

/// Parses a level parameter the way the original tool does: decimal first,
/// then hexadecimal, with an optional `0x`/`0X` prefix stripped before the
/// hex attempt (the original's `int(s, 16)` accepts that prefix natively).
fn parse_level(text: &str) -> Option<i64> {
    let s = text.trim();
    if let Ok(v) = s.parse::<i64>() {
        return Some(v);
    }
    let hex = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")).unwrap_or(s);
    i64::from_str_radix(hex, 16).ok()
}

fn decimal_cache(value: i64) -> String {
    format!("{value}\n")
}

/// `backlight`, `brightness`, `contrast`: accepts decimal or hex text,
/// clamps to `[0, max_level]`, and caches the clamped value (§4.3).
struct LevelHandler {
    device: Arc<Mutex<dyn Device>>,
    max_level: i64,
    cache: Mutex<String>,
    apply: fn(&mut dyn Device, u8) -> Result<(), crate::error::DeviceError>,
}

impl LevelHandler {
    fn new(
        device: Arc<Mutex<dyn Device>>,
        max_level: i64,
        initial: i64,
        apply: fn(&mut dyn Device, u8) -> Result<(), crate::error::DeviceError>,
    ) -> Self {
        Self {
            device,
            max_level,
            cache: Mutex::new(decimal_cache(initial)),
            apply,
        }
    }
}

impl FileHandler for LevelHandler {
    fn is_read_only(&self) -> bool {
        false
    }

    fn read(&self) -> Vec<u8> {
        self.cache.lock().unwrap().clone().into_bytes()
    }

    fn write(&self, data: &[u8]) -> Result<u32, WriteError> {
        let text = String::from_utf8_lossy(data);
        let Some(raw) = parse_level(&text) else {
            return Ok(0);
        };
        let clamped = raw.clamp(0, self.max_level);
        let mut device = self.device.lock().unwrap();
        // The cache reflects the applied value even on a device failure,
        // matching the original's cache-then-return contract; the failure
        // itself is still surfaced so the FUSE layer can report EIO.
        if let Err(err) = (self.apply)(&mut *device, clamped as u8) {
            warn!(%err, "device rejected level write");
            *self.cache.lock().unwrap() = decimal_cache(clamped);
            return Err(WriteError::Device(err));
        }
        *self.cache.lock().unwrap() = decimal_cache(clamped);
        Ok(data.len() as u32)
    }
}

pub fn backlight_handler(device: Arc<Mutex<dyn Device>>, initial: bool) -> Arc<dyn FileHandler> {
    Arc::new(LevelHandler::new(
        device,
        1,
        i64::from(initial),
        |d, level| d.set_backlight(level != 0),
    ))
}

pub fn brightness_handler(device: Arc<Mutex<dyn Device>>, initial: u8) -> Arc<dyn FileHandler> {
    Arc::new(LevelHandler::new(device, 255, i64::from(initial), |d, level| {
        d.set_brightness(level)
    }))
}

pub fn contrast_handler(device: Arc<Mutex<dyn Device>>, initial: u8) -> Arc<dyn FileHandler> {
    Arc::new(LevelHandler::new(device, 255, i64::from(initial), |d, level| {
        d.set_contrast(level)
    }))
}

/// `leds`: decimal integer, unclamped (device decides the mask width).
struct LedsHandler {
    device: Arc<Mutex<dyn Device>>,
    cache: Mutex<String>,
}

impl FileHandler for LedsHandler {
    fn is_read_only(&self) -> bool {
        false
    }

    fn read(&self) -> Vec<u8> {
        self.cache.lock().unwrap().clone().into_bytes()
    }

    fn write(&self, data: &[u8]) -> Result<u32, WriteError> {
        let text = String::from_utf8_lossy(data);
        let Ok(mask) = text.trim().parse::<u32>() else {
            return Ok(0);
        };
        let mut device = self.device.lock().unwrap();
        if let Err(err) = device.set_leds_state(mask) {
            warn!(%err, "device rejected leds write");
            *self.cache.lock().unwrap() = decimal_cache(i64::from(mask));
            return Err(WriteError::Device(err));
        }
        *self.cache.lock().unwrap() = decimal_cache(i64::from(mask));
        Ok(data.len() as u32)
    }
}

pub fn leds_handler(device: Arc<Mutex<dyn Device>>, initial: u32) -> Arc<dyn FileHandler> {
    Arc::new(LedsHandler {
        device,
        cache: Mutex::new(decimal_cache(i64::from(initial))),
    })
}

/// `keys`: read-only, recomputed live from the device on every access.
struct KeysHandler {
    device: Arc<Mutex<dyn Device>>,
}

impl FileHandler for KeysHandler {
    fn is_read_only(&self) -> bool {
        true
    }

    fn read(&self) -> Vec<u8> {
        let state = self.device.lock().unwrap().get_keypad_state().unwrap_or(0);
        decimal_cache(i64::from(state)).into_bytes()
    }

    fn write(&self, _data: &[u8]) -> Result<u32, WriteError> {
        Err(WriteError::ReadOnly)
    }
}

pub fn keys_handler(device: Arc<Mutex<dyn Device>>) -> Arc<dyn FileHandler> {
    Arc::new(KeysHandler { device })
}

/// `locked`: read-only, recomputed live from the device on every access.
struct LockedHandler {
    device: Arc<Mutex<dyn Device>>,
}

impl FileHandler for LockedHandler {
    fn is_read_only(&self) -> bool {
        true
    }

    fn read(&self) -> Vec<u8> {
        let locked = self.device.lock().unwrap().is_locked().unwrap_or(false);
        decimal_cache(i64::from(locked)).into_bytes()
    }

    fn write(&self, _data: &[u8]) -> Result<u32, WriteError> {
        Err(WriteError::ReadOnly)
    }
}

pub fn locked_handler(device: Arc<Mutex<dyn Device>>) -> Arc<dyn FileHandler> {
    Arc::new(LockedHandler { device })
}

/// `display`: write-only, delegates every byte to the ANSI engine.
struct DisplayHandler {
    device: Arc<Mutex<dyn Device>>,
    engine: Mutex<AnsiEngine>,
}

impl FileHandler for DisplayHandler {
    fn is_read_only(&self) -> bool {
        false
    }

    fn read(&self) -> Vec<u8> {
        Vec::new()
    }

    fn write(&self, data: &[u8]) -> Result<u32, WriteError> {
        let mut device = self.device.lock().unwrap();
        let mut engine = self.engine.lock().unwrap();
        if let Err(err) = engine.feed(&mut *device, data) {
            warn!(%err, "device rejected a byte during sequence playback");
            return Err(WriteError::Device(err));
        }
        Ok(data.len() as u32)
    }
}

pub fn display_handler(device: Arc<Mutex<dyn Device>>) -> Arc<dyn FileHandler> {
    Arc::new(DisplayHandler {
        device,
        engine: Mutex::new(AnsiEngine::new()),
    })
}

/// `info`: read-only, fixed text computed once at construction (§4.3).
struct InfoHandler {
    text: String,
}

impl FileHandler for InfoHandler {
    fn is_read_only(&self) -> bool {
        true
    }

    fn read(&self) -> Vec<u8> {
        self.text.clone().into_bytes()
    }

    fn write(&self, _data: &[u8]) -> Result<u32, WriteError> {
        Err(WriteError::ReadOnly)
    }
}

pub fn info_handler(device: &dyn Device) -> Arc<dyn FileHandler> {
    let caps = device.capabilities();
    let mut text = String::new();
    let mut line = |key: &str, value: String| {
        text.push_str(&format!("{key:<16} : {value}\n"));
    };
    line("rows", caps.rows.to_string());
    line("cols", caps.cols.to_string());
    line("model", caps.model.to_string());
    line("version", caps.version.to_string());
    line("brightness", caps.has_brightness.to_string());
    line("contrast", caps.has_contrast.to_string());
    line("locked", caps.has_lock.to_string());
    Arc::new(InfoHandler { text })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::DummyDevice;

    fn dummy() -> Arc<Mutex<dyn Device>> {
        Arc::new(Mutex::new(DummyDevice::new()))
    }

    #[test]
    fn brightness_clamps_above_and_below_range() {
        let handler = brightness_handler(dummy(), 0);
        let n = handler.write(b"300").unwrap();
        assert_eq!(n, 3);
        assert_eq!(handler.read(), b"255\n");

        handler.write(b"-1").unwrap();
        assert_eq!(handler.read(), b"0\n");
    }

    #[test]
    fn brightness_accepts_hex_with_prefix() {
        let handler = brightness_handler(dummy(), 0);
        handler.write(b"0xff").unwrap();
        assert_eq!(handler.read(), b"255\n");
    }

    #[test]
    fn backlight_accepts_0_1_and_clamps_2() {
        let handler = backlight_handler(dummy(), false);
        handler.write(b"0").unwrap();
        assert_eq!(handler.read(), b"0\n");
        handler.write(b"1").unwrap();
        assert_eq!(handler.read(), b"1\n");
        handler.write(b"2").unwrap();
        assert_eq!(handler.read(), b"1\n");
    }

    #[test]
    fn leds_rejects_non_numeric_and_preserves_cache() {
        let handler = leds_handler(dummy(), 7);
        let n = handler.write(b"abc").unwrap();
        assert_eq!(n, 0);
        assert_eq!(handler.read(), b"7\n");
    }

    #[test]
    fn keys_is_read_only_and_live() {
        let handler = keys_handler(dummy());
        assert!(handler.is_read_only());
        assert_eq!(handler.read(), b"9\n");
        assert!(handler.write(b"0").is_err());
    }

    #[test]
    fn info_has_no_trailing_blank_line() {
        let dev = DummyDevice::new();
        let handler = info_handler(&dev);
        let text = String::from_utf8(handler.read()).unwrap();
        assert!(text.starts_with("rows             : 4\n"));
        assert!(!text.ends_with("\n\n"));
    }
}
