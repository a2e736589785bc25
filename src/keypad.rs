//! Keypad Monitor (F): polls the device for keypad state and republishes
//! transitions as Linux input events on a virtual `uinput` device (§4.6).
//!
//! Structured the same way the teacher crate manages its signal-watcher
//! thread: a background `JoinHandle` plus a cooperative stop flag, joined
//! with a bounded wait rather than detached or hard-killed.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use evdev::uinput::VirtualDeviceBuilder;
use evdev::{AttributeSet, EventType, InputEvent, Key};
use tracing::{info, warn};

use crate::device::{default_keypad_map, Device, KeypadMap};

const POLL_INTERVAL: Duration = Duration::from_millis(100);
const JOIN_GRACE: Duration = Duration::from_secs(1);

/// Background task advertising a virtual `ctrl-panel` input device and
/// pumping keypad transitions into it.
pub struct KeypadMonitor {
    stop: Arc<AtomicBool>,
    done_rx: mpsc::Receiver<()>,
    handle: Option<JoinHandle<()>>,
}

impl KeypadMonitor {
    /// Spawns the polling thread. If a virtual device cannot be created
    /// (e.g. no `/dev/uinput` access), logs a warning and runs a no-op
    /// monitor rather than failing the mount.
    pub fn spawn(device: Arc<Mutex<dyn Device>>) -> Self {
        let stop = Arc::new(AtomicBool::new(false));
        let stop_thread = stop.clone();
        let (done_tx, done_rx) = mpsc::channel();

        let handle = std::thread::spawn(move || {
            run(device, &stop_thread);
            let _ = done_tx.send(());
        });

        Self {
            stop,
            done_rx,
            handle: Some(handle),
        }
    }

    /// Signals the polling loop to stop and waits for it to exit, for up
    /// to [`JOIN_GRACE`] beyond the current poll.
    pub fn stop_and_join(mut self) {
        self.stop.store(true, Ordering::SeqCst);
        let _ = self.done_rx.recv_timeout(POLL_INTERVAL + JOIN_GRACE);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn relevant_mask(map: &KeypadMap) -> u32 {
    map.iter()
        .enumerate()
        .filter(|(_, key)| key.is_some())
        .fold(0u32, |mask, (i, _)| mask | (1 << i))
}

fn build_virtual_device(map: &KeypadMap) -> std::io::Result<evdev::uinput::VirtualDevice> {
    let mut keys = AttributeSet::<Key>::new();
    for key in map.iter().flatten() {
        keys.insert(*key);
    }
    VirtualDeviceBuilder::new()?
        .name("ctrl-panel")
        .with_keys(&keys)?
        .build()
}

fn run(device: Arc<Mutex<dyn Device>>, stop: &AtomicBool) {
    let map = device
        .lock()
        .unwrap()
        .get_keypad_map()
        .cloned()
        .unwrap_or_else(default_keypad_map);
    let mask = relevant_mask(&map);

    let mut virtual_device = match build_virtual_device(&map) {
        Ok(vd) => Some(vd),
        Err(err) => {
            warn!(%err, "could not create virtual keypad device, monitor disabled");
            None
        }
    };

    let mut previous: Option<u32> = None;

    while !stop.load(Ordering::Relaxed) {
        let sample = device
            .lock()
            .unwrap()
            .get_keypad_state()
            .unwrap_or(0)
            & mask;

        let changed = match previous {
            None => mask, // first sample: every relevant bit reads as "changed"
            Some(prev) => prev ^ sample,
        };
        previous = Some(sample);

        if changed != 0 {
            if let Some(vd) = virtual_device.as_mut() {
                emit_changes(vd, &map, changed, sample);
            }
        }

        std::thread::sleep(POLL_INTERVAL);
    }

    if let Some(mut vd) = virtual_device.take() {
        let _ = vd.emit(&[InputEvent::new(EventType::SYNCHRONIZATION, 0, 0)]);
    }
    info!("keypad monitor stopped");
}

fn emit_changes(vd: &mut evdev::uinput::VirtualDevice, map: &KeypadMap, changed: u32, sample: u32) {
    let mut events = Vec::new();
    for (bit, key) in map.iter().enumerate() {
        let Some(key) = key else { continue };
        if changed & (1 << bit) == 0 {
            continue;
        }
        let pressed = sample & (1 << bit) != 0;
        events.push(InputEvent::new(
            EventType::KEY,
            key.code(),
            i32::from(pressed),
        ));
    }
    events.push(InputEvent::new(EventType::SYNCHRONIZATION, 0, 0));
    let _ = vd.emit(&events);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mask_covers_only_present_slots() {
        let mut map: KeypadMap = [None; 12];
        map[0] = Some(Key::KEY_UP);
        map[3] = Some(Key::KEY_DOWN);
        assert_eq!(relevant_mask(&map), 0b1001);
    }

    #[test]
    fn default_map_has_all_twelve_slots_present() {
        let map = default_keypad_map();
        let present = map.iter().filter(|k| k.is_some()).count();
        assert_eq!(present, 12);
    }
}
