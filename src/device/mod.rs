//! Device abstraction (A): the boundary between the filesystem layer and the
//! physical (or dummy) panel.
//!
//! Mirrors the capability-descriptor pattern used to describe a terminal's
//! feature set: capabilities are probed once, at construction time, and
//! exposed as an immutable [`Capabilities`] record rather than re-queried on
//! every operation. Optional operations (brightness, contrast, LEDs, lock
//! state, keypad map) have default implementations that report
//! [`DeviceError::Unsupported`]; a concrete device only needs to override the
//! ones its `Capabilities` advertises.

mod dummy;
mod i2c;

pub use dummy::DummyDevice;
pub use i2c::{BoardModel, I2cDevice};

use crate::error::DeviceError;

/// A single keypad position mapped to the Linux input-event key it should
/// emit, or `None` if that position is wired to nothing.
pub type KeypadMap = [Option<evdev::Key>; 12];

/// The keypad layout used by the `panel` device type (§4.6): a 3x4 numeric
/// keypad, `[1,2,3,4,5,6,7,8,9,*,0,#]` read top-to-bottom, left-to-right,
/// mapped to the platform's numeric-keypad event codes.
#[must_use]
pub fn default_keypad_map() -> KeypadMap {
    use evdev::Key;
    [
        Some(Key::KEY_KP1),
        Some(Key::KEY_KP2),
        Some(Key::KEY_KP3),
        Some(Key::KEY_KP4),
        Some(Key::KEY_KP5),
        Some(Key::KEY_KP6),
        Some(Key::KEY_KP7),
        Some(Key::KEY_KP8),
        Some(Key::KEY_KP9),
        Some(Key::KEY_KPASTERISK),
        Some(Key::KEY_KP0),
        Some(Key::KEY_NUMERIC_POUND),
    ]
}

/// Fixed, immutable facts about a device, probed once at construction.
///
/// Analogous to a terminal capability profile: the filesystem layer consults
/// this to decide which optional files to expose (§4.2) rather than probing
/// the device on every `readdir`.
#[derive(Debug, Clone)]
pub struct Capabilities {
    /// Number of character rows/lines the display has.
    pub rows: u16,
    /// Number of character columns the display has.
    pub cols: u16,
    /// Firmware/model version reported by the device, for `info` (§4.5).
    pub version: u32,
    /// Human-readable model name, for `info` (§4.5).
    pub model: &'static str,
    /// Whether `brightness` should be exposed (§4.2).
    pub has_brightness: bool,
    /// Whether `contrast` should be exposed (§4.2).
    pub has_contrast: bool,
    /// Whether `leds` should be exposed (§4.2).
    pub has_leds: bool,
    /// Whether `locked` should be exposed (§4.2).
    pub has_lock: bool,
    /// The keypad-position-to-key mapping, if this device has a keypad.
    pub keypad_map: Option<KeypadMap>,
}

/// The device abstraction (A): a character panel with an optional keypad,
/// backlight, brightness/contrast control, and LEDs.
///
/// All cursor-relative operations (`goto_pos`, `backspace`, `htab`, ...)
/// operate in device-local coordinates; translating ANSI escape sequences
/// into these calls is [`crate::ansi::AnsiEngine`]'s job, not this trait's.
pub trait Device: Send {
    /// Writes `text` verbatim at the current cursor position, without
    /// interpreting control characters.
    fn write_text(&mut self, text: &str) -> Result<(), DeviceError>;

    /// Clears the display and homes the cursor.
    fn clear(&mut self) -> Result<(), DeviceError>;

    /// Moves the cursor to the origin (row 0, column 0) without clearing.
    fn home(&mut self) -> Result<(), DeviceError>;

    /// Moves the cursor to an absolute linear position (`line * cols + col`).
    fn goto_pos(&mut self, pos: u16) -> Result<(), DeviceError>;

    /// Moves the cursor to an absolute (line, col) position.
    fn goto_line_col(&mut self, line: u16, col: u16) -> Result<(), DeviceError>;

    /// Moves the cursor back one column and erases the character there.
    fn backspace(&mut self) -> Result<(), DeviceError>;

    /// Advances the cursor to the next horizontal tab stop.
    fn htab(&mut self) -> Result<(), DeviceError>;

    /// Moves the cursor down one line, same column.
    fn move_down(&mut self) -> Result<(), DeviceError>;

    /// Moves the cursor up one line, same column.
    fn move_up(&mut self) -> Result<(), DeviceError>;

    /// Moves the cursor to column 0 of the current line.
    fn cr(&mut self) -> Result<(), DeviceError>;

    /// Erases from the cursor to the end of the current line.
    fn clear_column(&mut self) -> Result<(), DeviceError>;

    /// Sets a horizontal tab stop at `pos`.
    fn tab_set(&mut self, pos: u16) -> Result<(), DeviceError>;

    /// Turns the backlight on or off.
    fn set_backlight(&mut self, on: bool) -> Result<(), DeviceError>;

    /// Sets display brightness, 0-255. Default: unsupported.
    fn set_brightness(&mut self, _level: u8) -> Result<(), DeviceError> {
        Err(DeviceError::Unsupported("brightness"))
    }

    /// Sets display contrast, 0-255. Default: unsupported.
    fn set_contrast(&mut self, _level: u8) -> Result<(), DeviceError> {
        Err(DeviceError::Unsupported("contrast"))
    }

    /// Sets the raw LED bitmask. Default: unsupported.
    fn set_leds_state(&mut self, _mask: u32) -> Result<(), DeviceError> {
        Err(DeviceError::Unsupported("leds"))
    }

    /// Reports whether the device's local input (if any) is locked out.
    /// Default: unsupported.
    fn is_locked(&self) -> Result<bool, DeviceError> {
        Err(DeviceError::Unsupported("locked"))
    }

    /// Returns the keypad layout, if this device has a keypad.
    fn get_keypad_map(&self) -> Option<&KeypadMap> {
        None
    }

    /// Reads the current keypad state as a bitmask (bit N set = key N down).
    fn get_keypad_state(&self) -> Result<u32, DeviceError> {
        Err(DeviceError::Unsupported("keypad"))
    }

    /// The device's fixed capability record.
    fn capabilities(&self) -> &Capabilities;

    /// Convenience accessor for `capabilities().rows`.
    fn height(&self) -> u16 {
        self.capabilities().rows
    }

    /// Convenience accessor for `capabilities().cols`.
    fn width(&self) -> u16 {
        self.capabilities().cols
    }

    /// Convenience accessor for `capabilities().version`.
    fn version(&self) -> u32 {
        self.capabilities().version
    }
}
