//! POSIX `opendir`/`readdir` + `lstat` scanner backend.
//!
//! Used on Linux (and any other non-macOS Unix target) as the primary
//! backend, and on macOS as the fallback when the `getattrlistbulk` fast
//! path cannot open a directory.

use std::ffi::{CStr, CString, OsStr};
use std::mem::MaybeUninit;
use std::os::unix::ffi::OsStrExt as _;
use std::path::Path;
use std::ptr;

use super::{RawEntry, RawKind};

/// Read one directory via `opendir`/`readdir`, `lstat`-ing each entry.
///
/// An `lstat` failure on a single entry increments the returned error count
/// and skips that entry; an `opendir` failure on the directory itself
/// returns no entries and an error count of `1`.
pub fn scan_one_posix(dir_path: &Path) -> (Vec<RawEntry>, u64) {
    let mut entries = Vec::new();
    let mut errors: u64 = 0;

    let Ok(c_path) = CString::new(dir_path.as_os_str().as_bytes()) else {
        log::warn!("path contains an interior NUL, skipping: {}", dir_path.display());
        return (entries, 1);
    };

    // Safety: c_path is a valid, NUL-terminated C string for the lifetime of
    // this call.
    let dirp = unsafe { libc::opendir(c_path.as_ptr()) };
    if dirp.is_null() {
        log::debug!("opendir failed for {}", dir_path.display());
        return (entries, 1);
    }

    loop {
        // Safety: dirp is a valid, open DIR* from the opendir call above.
        let dirent = unsafe { libc::readdir(dirp) };
        if dirent.is_null() {
            break;
        }

        // Safety: dirent is non-null and valid until the next readdir/closedir.
        let name_ptr = unsafe { ptr::addr_of!((*dirent).d_name) }.cast::<libc::c_char>();
        let name_cstr = unsafe { CStr::from_ptr(name_ptr) };
        let name_bytes = name_cstr.to_bytes();

        if name_bytes == b"." || name_bytes == b".." {
            continue;
        }

        let name = OsStr::from_bytes(name_bytes).to_string_lossy().into_owned();
        let child_path = dir_path.join(&name);

        let Ok(child_c_path) = CString::new(child_path.as_os_str().as_bytes()) else {
            errors += 1;
            continue;
        };

        let mut stat_buf: MaybeUninit<libc::stat> = MaybeUninit::uninit();
        // Safety: child_c_path is a valid C string; stat_buf is large enough
        // for libc::stat and is only read after a successful call.
        let rc = unsafe { libc::lstat(child_c_path.as_ptr(), stat_buf.as_mut_ptr()) };
        if rc != 0 {
            log::debug!("lstat failed for {}", child_path.display());
            errors += 1;
            continue;
        }
        let stat = unsafe { stat_buf.assume_init() };

        let is_dir = (stat.st_mode & libc::S_IFMT) == libc::S_IFDIR;
        let (kind, size_bytes, disk_usage) = if is_dir {
            (RawKind::Directory, 0, 0)
        } else {
            (
                RawKind::File,
                u64::try_from(stat.st_size).unwrap_or(0),
                u64::try_from(stat.st_blocks).unwrap_or(0) * 512,
            )
        };

        entries.push(RawEntry {
            name,
            kind,
            size_bytes,
            disk_usage,
        });
    }

    // Safety: dirp was returned by a successful opendir and has not been
    // closed yet.
    unsafe {
        libc::closedir(dirp);
    }

    (entries, errors)
}
