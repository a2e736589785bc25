//! ANSI Terminal Engine (B): turns an opaque byte stream into primitive
//! [`crate::device::Device`] calls (§4.2).
//!
//! The parser is a small explicit state machine, in the same style as the
//! teacher crate's own input parser: states transition deterministically on
//! each byte, an invalid or unrecognized sequence drops back to `Ground`
//! without emitting device I/O, and the state survives across `feed` calls
//! so a `write()` that arrives split across kernel calls doesn't lose
//! framing.

use crate::device::Device;
use crate::error::DeviceError;

const FORM_FEED: u8 = 0x0c;
const BACKSPACE: u8 = 0x08;
const HTAB: u8 = 0x09;
const LF: u8 = 0x0a;
const CR: u8 = 0x0d;
const ESC: u8 = 0x1b;

const MAX_CSI_LEN: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq)]
enum State {
    Ground,
    Escape,
    Csi,
    CsiIgnore,
}

/// Stateful ANSI/control-byte interpreter driving a [`Device`].
#[derive(Debug)]
pub struct AnsiEngine {
    state: State,
    run: String,
    csi_params: Vec<u8>,
}

impl Default for AnsiEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl AnsiEngine {
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: State::Ground,
            run: String::new(),
            csi_params: Vec::with_capacity(8),
        }
    }

    /// Feeds `bytes` through the parser, issuing device calls as control
    /// sequences and accumulated text runs complete.
    pub fn feed(&mut self, device: &mut dyn Device, bytes: &[u8]) -> Result<(), DeviceError> {
        for &byte in bytes {
            self.process_byte(device, byte)?;
        }
        self.flush_run(device)
    }

    /// Convenience helper: positions the cursor then writes `text` in one
    /// call, bypassing the byte-level parser entirely.
    pub fn write_at(
        &mut self,
        device: &mut dyn Device,
        text: &str,
        line: u16,
        col: u16,
    ) -> Result<(), DeviceError> {
        device.goto_line_col(line, col)?;
        device.write_text(text)
    }

    fn process_byte(&mut self, device: &mut dyn Device, byte: u8) -> Result<(), DeviceError> {
        match self.state {
            State::Ground => self.process_ground(device, byte),
            State::Escape => self.process_escape(device, byte),
            State::Csi => self.process_csi(device, byte),
            State::CsiIgnore => self.process_csi_ignore(byte),
        }
    }

    fn process_ground(&mut self, device: &mut dyn Device, byte: u8) -> Result<(), DeviceError> {
        match byte {
            ESC => {
                self.flush_run(device)?;
                self.state = State::Escape;
                Ok(())
            }
            FORM_FEED => {
                self.flush_run(device)?;
                device.clear()
            }
            BACKSPACE => {
                self.flush_run(device)?;
                device.backspace()
            }
            HTAB => {
                self.flush_run(device)?;
                device.htab()
            }
            LF => {
                self.flush_run(device)?;
                device.move_down()
            }
            CR => {
                self.flush_run(device)?;
                device.cr()
            }
            0x00..=0x1f | 0x7f => {
                // Unrecognized control byte: drop it, preserving the run.
                Ok(())
            }
            _ => {
                self.run.push(byte as char);
                Ok(())
            }
        }
    }

    fn process_escape(&mut self, device: &mut dyn Device, byte: u8) -> Result<(), DeviceError> {
        match byte {
            b'[' => {
                self.csi_params.clear();
                self.state = State::Csi;
                Ok(())
            }
            _ => {
                // Any other byte following ESC is an unrecognized sequence;
                // drop back to ground without emitting device I/O.
                self.state = State::Ground;
                let _ = device;
                Ok(())
            }
        }
    }

    fn process_csi(&mut self, device: &mut dyn Device, byte: u8) -> Result<(), DeviceError> {
        if self.csi_params.len() >= MAX_CSI_LEN {
            self.state = State::CsiIgnore;
            return Ok(());
        }

        match byte {
            b'0'..=b'9' | b';' => {
                self.csi_params.push(byte);
                Ok(())
            }
            0x40..=0x7e => {
                let result = self.dispatch_csi(device, byte);
                self.state = State::Ground;
                result
            }
            _ => {
                self.state = State::Ground;
                Ok(())
            }
        }
    }

    fn process_csi_ignore(&mut self, byte: u8) -> Result<(), DeviceError> {
        if (0x40..=0x7e).contains(&byte) {
            self.state = State::Ground;
        }
        Ok(())
    }

    fn dispatch_csi(&mut self, device: &mut dyn Device, final_byte: u8) -> Result<(), DeviceError> {
        let params = self.parse_params();
        match final_byte {
            b'H' | b'f' => {
                let row = params.first().copied().unwrap_or(1).max(1);
                let col = params.get(1).copied().unwrap_or(1).max(1);
                device.goto_line_col(row, col)
            }
            _ => {
                // Unknown CSI sequence: silently consumed per the engine's
                // contract.
                Ok(())
            }
        }
    }

    fn parse_params(&self) -> Vec<u16> {
        if self.csi_params.is_empty() {
            return Vec::new();
        }
        // SAFETY-free: csi_params only ever holds ASCII digits and ';'.
        let text = std::str::from_utf8(&self.csi_params).unwrap_or_default();
        text.split(';')
            .map(|p| p.parse::<u16>().unwrap_or(0))
            .collect()
    }

    fn flush_run(&mut self, device: &mut dyn Device) -> Result<(), DeviceError> {
        if self.run.is_empty() {
            return Ok(());
        }
        let text = std::mem::take(&mut self.run);
        device.write_text(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{Capabilities, DummyDevice};

    /// Records every call it receives instead of acting on them, so tests
    /// can assert on the exact device calls a byte sequence produces.
    #[derive(Default)]
    struct RecordingDevice {
        calls: Vec<String>,
        caps: Option<Capabilities>,
    }

    impl RecordingDevice {
        fn new() -> Self {
            Self {
                calls: Vec::new(),
                caps: Some(Capabilities {
                    rows: 4,
                    cols: 20,
                    version: 1,
                    model: "recording",
                    has_brightness: false,
                    has_contrast: false,
                    has_leds: false,
                    has_lock: false,
                    keypad_map: None,
                }),
            }
        }
    }

    impl Device for RecordingDevice {
        fn write_text(&mut self, text: &str) -> Result<(), DeviceError> {
            self.calls.push(format!("write_text({text:?})"));
            Ok(())
        }
        fn clear(&mut self) -> Result<(), DeviceError> {
            self.calls.push("clear".to_string());
            Ok(())
        }
        fn home(&mut self) -> Result<(), DeviceError> {
            Ok(())
        }
        fn goto_pos(&mut self, _pos: u16) -> Result<(), DeviceError> {
            Ok(())
        }
        fn goto_line_col(&mut self, line: u16, col: u16) -> Result<(), DeviceError> {
            self.calls.push(format!("goto_line_col({line}, {col})"));
            Ok(())
        }
        fn backspace(&mut self) -> Result<(), DeviceError> {
            Ok(())
        }
        fn htab(&mut self) -> Result<(), DeviceError> {
            Ok(())
        }
        fn move_down(&mut self) -> Result<(), DeviceError> {
            Ok(())
        }
        fn move_up(&mut self) -> Result<(), DeviceError> {
            Ok(())
        }
        fn cr(&mut self) -> Result<(), DeviceError> {
            Ok(())
        }
        fn clear_column(&mut self) -> Result<(), DeviceError> {
            Ok(())
        }
        fn tab_set(&mut self, _pos: u16) -> Result<(), DeviceError> {
            Ok(())
        }
        fn set_backlight(&mut self, _on: bool) -> Result<(), DeviceError> {
            Ok(())
        }
        fn capabilities(&self) -> &Capabilities {
            self.caps.as_ref().unwrap()
        }
    }

    #[test]
    fn form_feed_clears() {
        let mut engine = AnsiEngine::new();
        let mut device = DummyDevice::new();
        engine.feed(&mut device, &[FORM_FEED]).unwrap();
    }

    #[test]
    fn csi_cursor_position_is_passed_through_one_based() {
        let mut engine = AnsiEngine::new();
        let mut device = RecordingDevice::new();
        engine.feed(&mut device, b"\x1b[2;1HHi").unwrap();
        assert_eq!(
            device.calls,
            vec!["goto_line_col(2, 1)".to_string(), "write_text(\"Hi\")".to_string()]
        );
    }

    #[test]
    fn trailing_run_flushes_at_end_of_input() {
        let mut engine = AnsiEngine::new();
        let mut device = RecordingDevice::new();
        engine.feed(&mut device, b"Hi").unwrap();
        assert_eq!(device.calls, vec!["write_text(\"Hi\")".to_string()]);
        assert!(engine.run.is_empty());
    }

    #[test]
    fn framing_survives_across_feed_calls() {
        let mut engine = AnsiEngine::new();
        let mut device = DummyDevice::new();
        engine.feed(&mut device, b"\x1b[2").unwrap();
        engine.feed(&mut device, b";1H").unwrap();
        assert_eq!(engine.state, State::Ground);
    }

    #[test]
    fn invalid_escape_resets_without_emitting_io() {
        let mut engine = AnsiEngine::new();
        let mut device = DummyDevice::new();
        engine.feed(&mut device, &[ESC, b'z']).unwrap();
        assert_eq!(engine.state, State::Ground);
    }

    #[test]
    fn printable_run_flushes_on_control_byte() {
        let mut engine = AnsiEngine::new();
        let mut device = DummyDevice::new();
        engine.feed(&mut device, b"Hi\r").unwrap();
        assert!(engine.run.is_empty());
    }
}
