//! FUSE Operations (E): maps kernel callbacks onto the virtual directory
//! (§4.5).
//!
//! `fuser` exposes libfuse's low-level, inode-addressed API rather than the
//! path-based `Operations` shape the original tool was built against, so
//! this layer owns the inode bookkeeping the directory (D) doesn't need to
//! know about: a fixed root inode, one stable inode per file assigned at
//! build time, and a monotonically increasing file-handle counter assigned
//! on every `open`.

use std::ffi::OsStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use fuser::{
    consts::FOPEN_DIRECT_IO, FileAttr, FileType, Filesystem, ReplyAttr, ReplyData, ReplyDirectory,
    ReplyEntry, ReplyOpen, ReplyWrite, Request, TimeOrNow,
};
use tracing::{debug, info, warn};

use crate::device::Device;
use crate::directory::{Directory, ROOT_INO};
use crate::error::WriteError;
use crate::keypad::KeypadMonitor;

const TTL: Duration = Duration::from_secs(1);

/// Resolves the `gid` reported in FUSE attributes: the numeric gid of the
/// `lcdfs` group if one is registered on this system (`getgrnam`), else the
/// process's own gid (§4.5 `getattr("/")`).
fn resolve_gid() -> u32 {
    use std::ffi::CString;
    use std::mem::MaybeUninit;

    let Ok(name) = CString::new("lcdfs") else {
        return unsafe { libc::getgid() };
    };

    let mut group = MaybeUninit::<libc::group>::uninit();
    let mut result: *mut libc::group = std::ptr::null_mut();
    let mut buf = vec![0u8; 1024];

    loop {
        let rc = unsafe {
            libc::getgrnam_r(
                name.as_ptr(),
                group.as_mut_ptr(),
                buf.as_mut_ptr().cast(),
                buf.len(),
                &mut result,
            )
        };
        if rc == libc::ERANGE {
            buf.resize(buf.len() * 2, 0);
            continue;
        }
        break;
    }

    if result.is_null() {
        unsafe { libc::getgid() }
    } else {
        unsafe { (*result).gr_gid }
    }
}

fn system_time_from_secs(secs: i64) -> SystemTime {
    if secs >= 0 {
        UNIX_EPOCH + Duration::from_secs(secs as u64)
    } else {
        UNIX_EPOCH
    }
}

/// The running filesystem: the directory model plus the bits `fuser` needs
/// that don't belong in (D) — file-handle allocation, mount-time identity,
/// and the keypad monitor's lifecycle.
pub struct LcdFilesystem {
    device: Arc<Mutex<dyn Device>>,
    directory: Directory,
    mount_time: i64,
    next_fh: AtomicU64,
    uid: u32,
    gid: u32,
    monitor: Option<KeypadMonitor>,
    paint_splash: bool,
}

impl LcdFilesystem {
    pub fn new(device: Arc<Mutex<dyn Device>>, paint_splash: bool) -> Self {
        let mount_time = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or(0);
        let directory = Directory::build(device.clone(), mount_time);
        Self {
            device,
            directory,
            mount_time,
            next_fh: AtomicU64::new(1),
            uid: unsafe { libc::getuid() },
            gid: resolve_gid(),
            monitor: None,
            paint_splash,
        }
    }

    fn root_attr(&self) -> FileAttr {
        let t = system_time_from_secs(self.mount_time);
        FileAttr {
            ino: ROOT_INO,
            size: 0,
            blocks: 0,
            atime: t,
            mtime: t,
            ctime: t,
            crtime: t,
            kind: FileType::Directory,
            perm: 0o755,
            nlink: 2,
            uid: self.uid,
            gid: self.gid,
            rdev: 0,
            blksize: 512,
            flags: 0,
        }
    }

    fn file_attr(&self, ino: u64) -> Option<FileAttr> {
        let entry = self.directory.entry(ino)?;
        let size = entry.handler.size() as u64;
        let perm = if entry.handler.is_read_only() { 0o444 } else { 0o666 };
        let mtime = system_time_from_secs(entry.mtime);
        let atime = system_time_from_secs(entry.atime);
        Some(FileAttr {
            ino,
            size,
            blocks: size.div_ceil(512),
            atime,
            mtime,
            ctime: mtime,
            crtime: mtime,
            kind: FileType::RegularFile,
            perm,
            nlink: 1,
            uid: self.uid,
            gid: self.gid,
            rdev: 0,
            blksize: 512,
            flags: 0,
        })
    }

    fn paint_splash_screen(&self) {
        if !self.paint_splash {
            return;
        }
        let hostname = hostname_best_effort();
        let addr = ipv4_best_effort();
        let mut device = self.device.lock().unwrap();
        if device.clear().is_err() {
            return;
        }
        let _ = device.goto_line_col(0, 0);
        let _ = device.write_text(&hostname);
        let _ = device.goto_line_col(1, 0);
        let _ = device.write_text(&addr);
    }
}

fn hostname_best_effort() -> String {
    std::fs::read_to_string("/etc/hostname")
        .map(|s| s.trim().to_string())
        .unwrap_or_else(|_| "lcdfs".to_string())
}

fn ipv4_best_effort() -> String {
    // Best-effort only: a real implementation would enumerate interfaces.
    // The splash is cosmetic, so an unresolved address degrades gracefully.
    "0.0.0.0".to_string()
}

impl Filesystem for LcdFilesystem {
    fn init(
        &mut self,
        _req: &Request<'_>,
        _config: &mut fuser::KernelConfig,
    ) -> Result<(), libc::c_int> {
        info!("mounted");
        self.paint_splash_screen();
        self.monitor = Some(KeypadMonitor::spawn(self.device.clone()));
        Ok(())
    }

    fn destroy(&mut self) {
        if let Some(monitor) = self.monitor.take() {
            monitor.stop_and_join();
        }
        self.directory.reset_defaults();
        let mut device = self.device.lock().unwrap();
        let _ = device.clear();
        let _ = device.set_backlight(false);
        info!("unmounted");
    }

    fn lookup(&mut self, _req: &Request<'_>, parent: u64, name: &OsStr, reply: ReplyEntry) {
        if parent != ROOT_INO {
            reply.error(libc::ENOENT);
            return;
        }
        let Some(name) = name.to_str() else {
            reply.error(libc::ENOENT);
            return;
        };
        match self.directory.lookup_name(name).and_then(|ino| self.file_attr(ino)) {
            Some(attr) => reply.entry(&TTL, &attr, 0),
            None => reply.error(libc::ENOENT),
        }
    }

    fn getattr(&mut self, _req: &Request<'_>, ino: u64, _fh: Option<u64>, reply: ReplyAttr) {
        if ino == ROOT_INO {
            reply.attr(&TTL, &self.root_attr());
            return;
        }
        match self.file_attr(ino) {
            Some(attr) => reply.attr(&TTL, &attr),
            None => reply.error(libc::ENOENT),
        }
    }

    fn readdir(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        _fh: u64,
        offset: i64,
        mut reply: ReplyDirectory,
    ) {
        if ino != ROOT_INO {
            reply.error(libc::ENOENT);
            return;
        }
        let mut rows: Vec<(u64, FileType, String)> = vec![
            (ROOT_INO, FileType::Directory, ".".to_string()),
            (ROOT_INO, FileType::Directory, "..".to_string()),
        ];
        rows.extend(
            self.directory
                .iter()
                .map(|(ino, e)| (ino, FileType::RegularFile, e.name.to_string())),
        );

        for (i, (ino, kind, name)) in rows.into_iter().enumerate().skip(offset as usize) {
            if reply.add(ino, (i + 1) as i64, kind, name) {
                break;
            }
        }
        reply.ok();
    }

    fn open(&mut self, _req: &Request<'_>, ino: u64, _flags: i32, reply: ReplyOpen) {
        if ino != ROOT_INO && self.directory.entry(ino).is_none() {
            reply.error(libc::ENOENT);
            return;
        }
        let fh = self.next_fh.fetch_add(1, Ordering::Relaxed);
        reply.opened(fh, FOPEN_DIRECT_IO);
    }

    fn read(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        _fh: u64,
        offset: i64,
        size: u32,
        _flags: i32,
        _lock_owner: Option<u64>,
        reply: ReplyData,
    ) {
        let Some(entry) = self.directory.entry_mut(ino) else {
            reply.error(libc::ENOENT);
            return;
        };
        let payload = entry.handler.read();
        entry.atime = now_secs();

        let offset = offset.max(0) as usize;
        if offset >= payload.len() {
            reply.data(&[]);
            return;
        }
        let end = (offset + size as usize).min(payload.len());
        reply.data(&payload[offset..end]);
    }

    fn write(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        _fh: u64,
        _offset: i64,
        data: &[u8],
        _write_flags: u32,
        _flags: i32,
        _lock_owner: Option<u64>,
        reply: ReplyWrite,
    ) {
        let Some(entry) = self.directory.entry_mut(ino) else {
            reply.error(libc::ENOENT);
            return;
        };
        match entry.handler.write(data) {
            Ok(written) => {
                entry.mtime = now_secs();
                entry.atime = entry.mtime;
                reply.written(written);
            }
            Err(WriteError::ReadOnly) => reply.error(libc::EACCES),
            Err(WriteError::Device(err)) => {
                warn!(%err, ino, "device rejected write");
                reply.error(libc::EIO);
            }
        }
    }

    fn setattr(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        _mode: Option<u32>,
        _uid: Option<u32>,
        _gid: Option<u32>,
        size: Option<u64>,
        atime: Option<TimeOrNow>,
        mtime: Option<TimeOrNow>,
        _ctime: Option<SystemTime>,
        _fh: Option<u64>,
        _crtime: Option<SystemTime>,
        _chgtime: Option<SystemTime>,
        _bkuptime: Option<SystemTime>,
        _flags: Option<u32>,
        reply: ReplyAttr,
    ) {
        if ino == ROOT_INO {
            reply.attr(&TTL, &self.root_attr());
            return;
        }
        if self.directory.entry(ino).is_none() {
            reply.error(libc::ENOENT);
            return;
        }
        if let Some(entry) = self.directory.entry_mut(ino) {
            if atime.is_some() {
                entry.atime = now_secs();
            }
            if mtime.is_some() {
                entry.mtime = now_secs();
            }
        }
        // `truncate` (size) and `chmod` (mode, handled above by the
        // underlying no-op) are accepted without effect: fuser's default
        // behavior otherwise denies writes with "read-only filesystem".
        let _ = size;
        debug!(ino, "setattr");
        reply.attr(&TTL, &self.file_attr(ino).expect("checked above"));
    }
}

fn now_secs() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

/// Ensures the mount point exists and has no leftover entries from a
/// previous run (§4.5: "pre-cleaned of files before mounting").
pub fn clean_mount_point(path: &std::path::Path) -> std::io::Result<()> {
    for entry in std::fs::read_dir(path)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            std::fs::remove_dir_all(entry.path())?;
        } else {
            std::fs::remove_file(entry.path())?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::DummyDevice;

    #[test]
    fn file_attr_matches_handler_size() {
        let device: Arc<Mutex<dyn Device>> = Arc::new(Mutex::new(DummyDevice::new()));
        let fs = LcdFilesystem::new(device, false);
        let ino = fs.directory.lookup_name("keys").unwrap();
        let attr = fs.file_attr(ino).unwrap();
        assert_eq!(attr.size, 2); // "9\n"
        assert_eq!(attr.perm, 0o444);
    }

    #[test]
    fn root_attr_is_a_directory() {
        let device: Arc<Mutex<dyn Device>> = Arc::new(Mutex::new(DummyDevice::new()));
        let fs = LcdFilesystem::new(device, false);
        let attr = fs.root_attr();
        assert_eq!(attr.kind, FileType::Directory);
        assert_eq!(attr.perm, 0o755);
        assert_eq!(attr.nlink, 2);
    }

    #[test]
    fn clean_mount_point_removes_leftover_files_and_dirs() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("stale.txt"), b"leftover").unwrap();
        std::fs::create_dir(dir.path().join("stale_dir")).unwrap();
        std::fs::write(dir.path().join("stale_dir/nested"), b"x").unwrap();

        clean_mount_point(dir.path()).unwrap();

        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
