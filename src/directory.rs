//! Virtual Directory (D): the fixed, inode-addressed file listing built
//! once at mount (§4.4).
//!
//! `fuser`'s low-level API addresses everything by inode, not path, so the
//! directory is a pair of maps (name → inode, inode → entry) built in one
//! fixed order at mount time: the four always-present entries, then
//! `brightness`/`contrast`/`leds`/`locked` when the device's capability
//! descriptor says they're present.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::device::Device;
use crate::handlers::{self, FileHandler};

/// The root directory's fixed inode number.
pub const ROOT_INO: u64 = 1;

/// One named file: its handler plus the timestamps `getattr` reports.
pub struct FileEntry {
    pub name: &'static str,
    pub handler: Arc<dyn FileHandler>,
    pub atime: i64,
    pub mtime: i64,
}

/// The mount's fixed file listing, addressed by inode.
pub struct Directory {
    entries: HashMap<u64, FileEntry>,
    inode_by_name: HashMap<&'static str, u64>,
    order: Vec<u64>,
}

impl Directory {
    /// Builds the directory for `device`, consulting its capability
    /// descriptor to decide which optional entries to add, and resets every
    /// RW file to its default contents (§4.5 `init`/`reset`).
    pub fn build(device: Arc<Mutex<dyn Device>>, mount_time: i64) -> Self {
        let mut dir = Self {
            entries: HashMap::new(),
            inode_by_name: HashMap::new(),
            order: Vec::new(),
        };

        let caps = device.lock().unwrap().capabilities().clone();

        dir.push("backlight", handlers::backlight_handler(device.clone(), true), mount_time);
        dir.push("keys", handlers::keys_handler(device.clone()), mount_time);
        dir.push("display", handlers::display_handler(device.clone()), mount_time);
        {
            let guard = device.lock().unwrap();
            let info = handlers::info_handler(&*guard);
            drop(guard);
            dir.push("info", info, mount_time);
        }

        if caps.has_brightness {
            dir.push(
                "brightness",
                handlers::brightness_handler(device.clone(), 255),
                mount_time,
            );
        }
        if caps.has_contrast {
            dir.push(
                "contrast",
                handlers::contrast_handler(device.clone(), 255),
                mount_time,
            );
        }
        if caps.has_leds {
            dir.push("leds", handlers::leds_handler(device.clone(), 0), mount_time);
        }
        if caps.has_lock {
            dir.push("locked", handlers::locked_handler(device.clone()), mount_time);
        }

        dir.reset_defaults();
        dir
    }

    /// Applies the default-contents write list (§4.5 `destroy`, §8 laws):
    /// `backlight=1`, `brightness=255`, `contrast=255`, `leds=0`, then
    /// clears the display. Used both when the directory is first built and
    /// again on unmount.
    pub fn reset_defaults(&self) {
        const DEFAULTS: &[(&str, &[u8])] = &[
            ("backlight", b"1"),
            ("brightness", b"255"),
            ("contrast", b"255"),
            ("leds", b"0"),
        ];
        for (name, value) in DEFAULTS {
            if let Some(ino) = self.lookup_name(name) {
                let _ = self.entries[&ino].handler.write(value);
            }
        }
        if let Some(ino) = self.lookup_name("display") {
            let _ = self.entries[&ino].handler.write(b"\x0c");
        }
    }

    fn push(&mut self, name: &'static str, handler: Arc<dyn FileHandler>, now: i64) {
        let ino = ROOT_INO + 1 + self.order.len() as u64;
        self.entries.insert(
            ino,
            FileEntry {
                name,
                handler,
                atime: now,
                mtime: now,
            },
        );
        self.inode_by_name.insert(name, ino);
        self.order.push(ino);
    }

    /// Looks up the inode for a file named `name` (without the leading
    /// `/`).
    pub fn lookup_name(&self, name: &str) -> Option<u64> {
        self.inode_by_name.get(name).copied()
    }

    pub fn entry(&self, ino: u64) -> Option<&FileEntry> {
        self.entries.get(&ino)
    }

    pub fn entry_mut(&mut self, ino: u64) -> Option<&mut FileEntry> {
        self.entries.get_mut(&ino)
    }

    /// All entries in construction order, for `readdir`.
    pub fn iter(&self) -> impl Iterator<Item = (u64, &FileEntry)> {
        self.order.iter().map(move |ino| (*ino, &self.entries[ino]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::DummyDevice;

    #[test]
    fn dummy_device_yields_exactly_four_entries() {
        let device: Arc<Mutex<dyn Device>> = Arc::new(Mutex::new(DummyDevice::new()));
        let dir = Directory::build(device, 0);
        let names: Vec<&str> = dir.iter().map(|(_, e)| e.name).collect();
        assert_eq!(names, vec!["backlight", "keys", "display", "info"]);
    }

    #[test]
    fn inodes_are_stable_and_distinct() {
        let device: Arc<Mutex<dyn Device>> = Arc::new(Mutex::new(DummyDevice::new()));
        let dir = Directory::build(device, 0);
        let backlight_ino = dir.lookup_name("backlight").unwrap();
        let keys_ino = dir.lookup_name("keys").unwrap();
        assert_ne!(backlight_ino, keys_ino);
        assert!(dir.entry(backlight_ino).is_some());
    }

    #[test]
    fn unknown_name_is_not_found() {
        let device: Arc<Mutex<dyn Device>> = Arc::new(Mutex::new(DummyDevice::new()));
        let dir = Directory::build(device, 0);
        assert!(dir.lookup_name("leds").is_none());
    }
}
