//! An in-memory device for running on a development station without the
//! actual panel hardware attached (§4.1 Bootstrap policy). Every operation
//! is logged at `info` level and otherwise a no-op; state setters keep their
//! last value so `info` (§4.5) can report something other than "unset".

use tracing::info;

use crate::error::DeviceError;

use super::{default_keypad_map, Capabilities, Device, KeypadMap};

/// Stand-in device used when no I2C bus can be acquired, matching the
/// original tool's developer-station fallback.
pub struct DummyDevice {
    caps: Capabilities,
    backlight: bool,
    brightness: u8,
    contrast: u8,
}

impl DummyDevice {
    pub fn new() -> Self {
        Self {
            caps: Capabilities {
                rows: 4,
                cols: 20,
                version: 42,
                model: "dummy",
                has_brightness: false,
                has_contrast: false,
                has_leds: false,
                has_lock: false,
                keypad_map: Some(default_keypad_map()),
            },
            backlight: false,
            brightness: 0,
            contrast: 0,
        }
    }
}

impl Default for DummyDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl Device for DummyDevice {
    fn write_text(&mut self, text: &str) -> Result<(), DeviceError> {
        info!(text, "write text");
        Ok(())
    }

    fn clear(&mut self) -> Result<(), DeviceError> {
        info!("clear display");
        Ok(())
    }

    fn home(&mut self) -> Result<(), DeviceError> {
        info!("cursor home");
        Ok(())
    }

    fn goto_pos(&mut self, pos: u16) -> Result<(), DeviceError> {
        info!(pos, "cursor moved to linear position");
        Ok(())
    }

    fn goto_line_col(&mut self, line: u16, col: u16) -> Result<(), DeviceError> {
        info!(line, col, "cursor moved to position");
        Ok(())
    }

    fn backspace(&mut self) -> Result<(), DeviceError> {
        info!("backspace");
        Ok(())
    }

    fn htab(&mut self) -> Result<(), DeviceError> {
        info!("htab");
        Ok(())
    }

    fn move_down(&mut self) -> Result<(), DeviceError> {
        info!("move_down");
        Ok(())
    }

    fn move_up(&mut self) -> Result<(), DeviceError> {
        info!("move_up");
        Ok(())
    }

    fn cr(&mut self) -> Result<(), DeviceError> {
        info!("cr");
        Ok(())
    }

    fn clear_column(&mut self) -> Result<(), DeviceError> {
        info!("clear_column");
        Ok(())
    }

    fn tab_set(&mut self, pos: u16) -> Result<(), DeviceError> {
        info!(pos, "tab_set");
        Ok(())
    }

    fn set_backlight(&mut self, on: bool) -> Result<(), DeviceError> {
        self.backlight = on;
        info!(on, "back light");
        Ok(())
    }

    fn set_brightness(&mut self, level: u8) -> Result<(), DeviceError> {
        self.brightness = level;
        info!(level, "brightness");
        Ok(())
    }

    fn set_contrast(&mut self, level: u8) -> Result<(), DeviceError> {
        self.contrast = level;
        info!(level, "contrast");
        Ok(())
    }

    fn get_keypad_map(&self) -> Option<&KeypadMap> {
        self.caps.keypad_map.as_ref()
    }

    fn get_keypad_state(&self) -> Result<u32, DeviceError> {
        // keys '1' and '4', matching the station-simulation fixture this
        // device is modeled on.
        Ok(0b0000_0000_1001)
    }

    fn capabilities(&self) -> &Capabilities {
        &self.caps
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keypad_state_is_fixed() {
        let dev = DummyDevice::new();
        assert_eq!(dev.get_keypad_state().unwrap(), 9);
    }

    #[test]
    fn setters_are_reported_and_remembered() {
        let mut dev = DummyDevice::new();
        dev.set_backlight(true).unwrap();
        assert!(dev.backlight);
        dev.set_brightness(200).unwrap();
        assert_eq!(dev.brightness, 200);
    }

    #[test]
    fn leds_and_lock_are_unsupported() {
        let dev = DummyDevice::new();
        assert!(!dev.caps.has_leds);
        assert!(!dev.caps.has_lock);
        assert!(dev.is_locked().is_err());
    }
}
