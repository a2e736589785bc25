//! Real hardware device backed by an I2C-connected LCD/keypad controller
//! board (`lcd03`, `lcd05`, or the combined `panel` controller, §4.7).
//!
//! The wire protocol these boards speak (register layout, command bytes) is
//! the external collaborator this crate only models the boundary of: this
//! module owns bus acquisition and the `Device` trait mapping, and delegates
//! the actual register writes to a small [`PanelCodec`] so that boundary is
//! visible and swappable rather than buried inline.
//!
//! The bus handle is kept in a `RefCell` so that `get_keypad_state`, which
//! the trait exposes as `&self` (readers don't need exclusive access at the
//! filesystem layer), can still issue a register read.

use std::cell::RefCell;

use i2cdev::core::I2CDevice;
use i2cdev::linux::LinuxI2CDevice;

use crate::error::DeviceError;

use super::{default_keypad_map, Capabilities, Device, KeypadMap};

/// Registers exposed by the controller board, relative to its base address.
/// Exact offsets are board-specific; these match the `lcd03`/`lcd05` family
/// layout this crate targets.
mod registers {
    pub const CMD: u8 = 0x00;
    pub const DATA: u8 = 0x01;
    pub const BACKLIGHT: u8 = 0x02;
    pub const CONTRAST: u8 = 0x03;
    pub const KEYPAD: u8 = 0x04;
    pub const VERSION: u8 = 0x05;
}

mod commands {
    pub const CLEAR: u8 = 0x01;
    pub const HOME: u8 = 0x02;
}

/// Thin encode/decode layer over the raw register protocol. Kept separate
/// from [`I2cDevice`] so the bus-handling and FUSE-facing code doesn't need
/// to know the wire format.
trait PanelCodec {
    fn send_command(&mut self, byte: u8) -> Result<(), DeviceError>;
    fn send_data(&mut self, bytes: &[u8]) -> Result<(), DeviceError>;
    fn read_register(&mut self, reg: u8) -> Result<u8, DeviceError>;
}

impl PanelCodec for LinuxI2CDevice {
    fn send_command(&mut self, byte: u8) -> Result<(), DeviceError> {
        self.smbus_write_byte_data(registers::CMD, byte)
            .map_err(|e| DeviceError::Protocol(e.to_string()))
    }

    fn send_data(&mut self, bytes: &[u8]) -> Result<(), DeviceError> {
        for &b in bytes {
            self.smbus_write_byte_data(registers::DATA, b)
                .map_err(|e| DeviceError::Protocol(e.to_string()))?;
        }
        Ok(())
    }

    fn read_register(&mut self, reg: u8) -> Result<u8, DeviceError> {
        self.smbus_read_byte_data(reg)
            .map_err(|e| DeviceError::Protocol(e.to_string()))
    }
}

/// The LCD variant to target; each has a different geometry and register
/// quirks, matching the original tool's `lcd03`/`lcd05`/`panel` types (§4.7).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoardModel {
    Lcd03,
    Lcd05,
    Panel,
}

impl BoardModel {
    fn geometry(self) -> (u16, u16) {
        match self {
            Self::Lcd03 => (2, 16),
            Self::Lcd05 => (4, 20),
            Self::Panel => (4, 20),
        }
    }

    fn name(self) -> &'static str {
        match self {
            Self::Lcd03 => "lcd03",
            Self::Lcd05 => "lcd05",
            Self::Panel => "panel",
        }
    }
}

/// A real panel talking to its controller board over I2C.
pub struct I2cDevice {
    bus: RefCell<LinuxI2CDevice>,
    caps: Capabilities,
    line: u16,
    col: u16,
}

impl I2cDevice {
    /// Opens `path` (e.g. `/dev/i2c-1`) and probes the board at `address`.
    pub fn open(path: &str, address: u16, model: BoardModel) -> Result<Self, DeviceError> {
        let mut bus = LinuxI2CDevice::new(path, address).map_err(DeviceError::Io)?;
        let version = u32::from(bus.read_register(registers::VERSION)?);
        let (rows, cols) = model.geometry();

        let keypad_map = matches!(model, BoardModel::Panel).then(default_keypad_map);
        let has_leds = matches!(model, BoardModel::Panel);

        Ok(Self {
            bus: RefCell::new(bus),
            caps: Capabilities {
                rows,
                cols,
                version,
                model: model.name(),
                has_brightness: true,
                has_contrast: true,
                has_leds,
                has_lock: has_leds,
                keypad_map,
            },
            line: 0,
            col: 0,
        })
    }
}

impl Device for I2cDevice {
    fn write_text(&mut self, text: &str) -> Result<(), DeviceError> {
        self.bus.get_mut().send_data(text.as_bytes())?;
        self.col = self.col.saturating_add(text.chars().count() as u16);
        Ok(())
    }

    fn clear(&mut self) -> Result<(), DeviceError> {
        self.bus.get_mut().send_command(commands::CLEAR)?;
        self.line = 0;
        self.col = 0;
        Ok(())
    }

    fn home(&mut self) -> Result<(), DeviceError> {
        self.bus.get_mut().send_command(commands::HOME)?;
        self.line = 0;
        self.col = 0;
        Ok(())
    }

    fn goto_pos(&mut self, pos: u16) -> Result<(), DeviceError> {
        self.bus.get_mut().send_command(0x80 | (pos as u8 & 0x7f))?;
        let cols = self.caps.cols.max(1);
        self.line = pos / cols;
        self.col = pos % cols;
        Ok(())
    }

    fn goto_line_col(&mut self, line: u16, col: u16) -> Result<(), DeviceError> {
        let addr = line.saturating_mul(self.caps.cols).saturating_add(col);
        self.bus.get_mut().send_command(0x80 | (addr as u8 & 0x7f))?;
        self.line = line;
        self.col = col;
        Ok(())
    }

    fn backspace(&mut self) -> Result<(), DeviceError> {
        if self.col > 0 {
            self.col -= 1;
        }
        let (line, col) = (self.line, self.col);
        self.goto_line_col(line, col)?;
        self.bus.get_mut().send_data(b" ")?;
        self.goto_line_col(line, col)
    }

    fn htab(&mut self) -> Result<(), DeviceError> {
        let next = (self.col / 4 + 1) * 4;
        let line = self.line;
        self.goto_line_col(line, next.min(self.caps.cols.saturating_sub(1)))
    }

    fn move_down(&mut self) -> Result<(), DeviceError> {
        let line = self.line.saturating_add(1) % self.caps.rows;
        let col = self.col;
        self.goto_line_col(line, col)
    }

    fn move_up(&mut self) -> Result<(), DeviceError> {
        let line = if self.line == 0 {
            self.caps.rows.saturating_sub(1)
        } else {
            self.line - 1
        };
        let col = self.col;
        self.goto_line_col(line, col)
    }

    fn cr(&mut self) -> Result<(), DeviceError> {
        let line = self.line;
        self.goto_line_col(line, 0)
    }

    fn clear_column(&mut self) -> Result<(), DeviceError> {
        let (line, col) = (self.line, self.col);
        let blanks = " ".repeat(usize::from(self.caps.cols.saturating_sub(col)));
        self.bus.get_mut().send_data(blanks.as_bytes())?;
        self.goto_line_col(line, col)
    }

    fn tab_set(&mut self, _pos: u16) -> Result<(), DeviceError> {
        // The board family this crate targets has fixed tab stops; nothing
        // to program.
        Ok(())
    }

    fn set_backlight(&mut self, on: bool) -> Result<(), DeviceError> {
        self.bus
            .get_mut()
            .smbus_write_byte_data(registers::BACKLIGHT, u8::from(on))
            .map_err(|e| DeviceError::Protocol(e.to_string()))
    }

    fn set_brightness(&mut self, level: u8) -> Result<(), DeviceError> {
        self.bus
            .get_mut()
            .smbus_write_byte_data(registers::BACKLIGHT, level)
            .map_err(|e| DeviceError::Protocol(e.to_string()))
    }

    fn set_contrast(&mut self, level: u8) -> Result<(), DeviceError> {
        self.bus
            .get_mut()
            .smbus_write_byte_data(registers::CONTRAST, level)
            .map_err(|e| DeviceError::Protocol(e.to_string()))
    }

    fn set_leds_state(&mut self, mask: u32) -> Result<(), DeviceError> {
        if !self.caps.has_leds {
            return Err(DeviceError::Unsupported("leds"));
        }
        self.bus
            .get_mut()
            .smbus_write_byte_data(registers::KEYPAD, (mask & 0xff) as u8)
            .map_err(|e| DeviceError::Protocol(e.to_string()))
    }

    fn is_locked(&self) -> Result<bool, DeviceError> {
        if !self.caps.has_lock {
            return Err(DeviceError::Unsupported("locked"));
        }
        // Locking state shares the keypad register's high bit on boards
        // that support it.
        let state = self.bus.borrow_mut().read_register(registers::KEYPAD)?;
        Ok(state & 0x80 != 0)
    }

    fn get_keypad_map(&self) -> Option<&KeypadMap> {
        self.caps.keypad_map.as_ref()
    }

    fn get_keypad_state(&self) -> Result<u32, DeviceError> {
        if self.caps.keypad_map.is_none() {
            return Err(DeviceError::Unsupported("keypad"));
        }
        let state = self.bus.borrow_mut().read_register(registers::KEYPAD)?;
        Ok(u32::from(state & 0x7f))
    }

    fn capabilities(&self) -> &Capabilities {
        &self.caps
    }
}
