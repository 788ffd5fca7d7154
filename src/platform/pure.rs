//! Fallback scanner backend built only on `std::fs`.
//!
//! Used in place of the raw-libc `posix` backend when a caller explicitly
//! asks for the dependency-light path (for example, in a sandboxed test
//! environment where raw `opendir`/`lstat` may be restricted but
//! `std::fs::read_dir` is allowed). This backend never needs to release a
//! host interpreter lock around its I/O: Rust has no global interpreter
//! lock to release in the first place, so unlike scanners in other
//! languages this primitive is already as parallel as the OS allows.

use std::fs;
use std::path::Path;

use super::{RawEntry, RawKind};

pub fn scan_one_pure(dir_path: &Path) -> (Vec<RawEntry>, u64) {
    let mut entries = Vec::new();
    let mut errors: u64 = 0;

    let read_dir = match fs::read_dir(dir_path) {
        Ok(rd) => rd,
        Err(_) => {
            log::debug!("read_dir failed for {}", dir_path.display());
            return (entries, 1);
        }
    };

    for item in read_dir {
        let Ok(item) = item else {
            errors += 1;
            continue;
        };
        let Ok(file_type) = item.file_type() else {
            errors += 1;
            continue;
        };
        let name = item.file_name().to_string_lossy().into_owned();

        if file_type.is_symlink() {
            // `file_type()` does not follow the link but `metadata()` does;
            // report the link itself rather than stat-ing (and possibly
            // failing to stat) whatever it points at.
            entries.push(RawEntry {
                name,
                kind: RawKind::File,
                size_bytes: 0,
                disk_usage: 0,
            });
            continue;
        }

        if file_type.is_dir() {
            entries.push(RawEntry {
                name,
                kind: RawKind::Directory,
                size_bytes: 0,
                disk_usage: 0,
            });
            continue;
        }

        let Ok(metadata) = item.metadata() else {
            errors += 1;
            continue;
        };

        #[cfg(unix)]
        let disk_usage = {
            use std::os::unix::fs::MetadataExt as _;
            metadata.blocks() * 512
        };
        #[cfg(not(unix))]
        let disk_usage = metadata.len();

        entries.push(RawEntry {
            name,
            kind: RawKind::File,
            size_bytes: metadata.len(),
            disk_usage,
        });
    }

    (entries, errors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs as stdfs;

    #[test]
    fn matches_posix_backend_for_simple_tree() {
        let dir = tempfile::tempdir().unwrap();
        stdfs::write(dir.path().join("a.txt"), b"hello").unwrap();
        stdfs::create_dir(dir.path().join("sub")).unwrap();

        let (entries, errors) = scan_one_pure(dir.path());
        assert_eq!(errors, 0);
        assert_eq!(entries.len(), 2);
        let file = entries.iter().find(|e| e.name == "a.txt").unwrap();
        assert_eq!(file.size_bytes, 5);
    }

    #[cfg(unix)]
    #[test]
    fn symlink_to_file_is_reported_as_zero_size_file() {
        let dir = tempfile::tempdir().unwrap();
        stdfs::write(dir.path().join("real.txt"), b"hello world").unwrap();
        std::os::unix::fs::symlink(dir.path().join("real.txt"), dir.path().join("link.txt")).unwrap();

        let (entries, errors) = scan_one_pure(dir.path());
        assert_eq!(errors, 0);
        let link = entries.iter().find(|e| e.name == "link.txt").unwrap();
        assert_eq!(link.kind, RawKind::File);
        assert_eq!(link.size_bytes, 0);
        assert_eq!(link.disk_usage, 0);
    }

    #[cfg(unix)]
    #[test]
    fn broken_symlink_is_reported_not_dropped() {
        let dir = tempfile::tempdir().unwrap();
        std::os::unix::fs::symlink(dir.path().join("missing"), dir.path().join("dangling")).unwrap();

        let (entries, errors) = scan_one_pure(dir.path());
        assert_eq!(errors, 0);
        let link = entries.iter().find(|e| e.name == "dangling").unwrap();
        assert_eq!(link.kind, RawKind::File);
        assert_eq!(link.size_bytes, 0);
    }
}
