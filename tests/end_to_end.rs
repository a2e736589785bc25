//! Black-box scenario tests against the library's public API (§4.9, §8
//! "End-to-end scenarios"), without mounting a real FUSE filesystem — that
//! requires root/`fusermount` and isn't available in a CI sandbox.

use std::sync::{Arc, Mutex};

use lcdfs::device::{Device, DummyDevice};
use lcdfs::directory::Directory;

fn built_directory() -> Directory {
    let device: Arc<Mutex<dyn Device>> = Arc::new(Mutex::new(DummyDevice::new()));
    Directory::build(device, 0)
}

#[test]
fn scenario_mount_and_splash_no_panel_features() {
    let dir = built_directory();
    let names: Vec<&str> = dir.iter().map(|(_, e)| e.name).collect();
    assert_eq!(names, vec!["backlight", "keys", "display", "info"]);

    let info_ino = dir.lookup_name("info").unwrap();
    let info_text = String::from_utf8(dir.entry(info_ino).unwrap().handler.read()).unwrap();
    assert!(info_text.starts_with("rows             : 4\n"));
    assert!(info_text.contains("brightness       : false\n"));
}

#[test]
fn scenario_level_clamp() {
    let device: Arc<Mutex<dyn Device>> = Arc::new(Mutex::new(DummyDevice::new()));
    let handler = lcdfs::handlers::brightness_handler(device, 0);

    let written = handler.write(b"300").unwrap();
    assert_eq!(written, 3);
    assert_eq!(handler.read(), b"255\n");

    handler.write(b"-1").unwrap();
    assert_eq!(handler.read(), b"0\n");
}

#[test]
fn scenario_keys_live_read() {
    let dir = built_directory();
    let keys_ino = dir.lookup_name("keys").unwrap();
    let handler = &dir.entry(keys_ino).unwrap().handler;
    assert_eq!(handler.read(), b"9\n");
    assert_eq!(handler.read(), b"9\n");
}

#[test]
fn scenario_read_only_enforcement() {
    let dir = built_directory();
    let keys_ino = dir.lookup_name("keys").unwrap();
    let handler = &dir.entry(keys_ino).unwrap().handler;
    assert!(handler.write(b"0").is_err());
    assert_eq!(handler.read(), b"9\n");
}

#[test]
fn scenario_unmount_resets_and_clears() {
    let dir = built_directory();
    let backlight_ino = dir.lookup_name("backlight").unwrap();
    dir.entry(backlight_ino).unwrap().handler.write(b"0").unwrap();
    assert_eq!(dir.entry(backlight_ino).unwrap().handler.read(), b"0\n");

    dir.reset_defaults();
    assert_eq!(dir.entry(backlight_ino).unwrap().handler.read(), b"1\n");
}

#[test]
fn capability_absent_files_are_not_listed() {
    let dir = built_directory();
    assert!(dir.lookup_name("brightness").is_none());
    assert!(dir.lookup_name("contrast").is_none());
    assert!(dir.lookup_name("leds").is_none());
    assert!(dir.lookup_name("locked").is_none());
}
