//! Platform-specific directory scanning primitives.
//!
//! Each backend implements [`scan_one`], reading exactly one directory's
//! immediate children and returning file type, name, apparent size and disk
//! usage for each, plus a count of entries that could not be stat'd. The
//! three backends below trade accuracy of information (mostly: can we get
//! size and disk usage without an extra syscall per entry) for portability.
//!
//! `.` and `..` are never returned by any backend. Symlinks are never
//! followed: a symlink to a directory is reported as [`RawKind::File`] with
//! size `0`.

pub mod posix;
pub mod pure;

#[cfg(target_os = "macos")]
pub mod macos;

use std::path::Path;

use crate::model::NodeKind;

/// The type of a single directory entry as reported by a scanner backend,
/// before it is turned into a [`crate::model::ScanNode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawKind {
    File,
    Directory,
}

impl From<RawKind> for NodeKind {
    fn from(value: RawKind) -> Self {
        match value {
            RawKind::File => Self::File,
            RawKind::Directory => Self::Directory,
        }
    }
}

/// One entry read from a directory, prior to being wrapped in a `ScanNode`.
#[derive(Debug, Clone)]
pub struct RawEntry {
    pub name: String,
    pub kind: RawKind,
    /// Apparent size in bytes; always `0` for directories.
    pub size_bytes: u64,
    /// Disk usage in bytes (blocks actually allocated); always `0` for
    /// directories — the walker fills this in during finalization.
    pub disk_usage: u64,
}

/// Read the immediate children of `dir_path`.
///
/// Returns the entries successfully read plus a count of entries that could
/// not be read or stat'd (each such failure is logged and skipped, per the
/// access-error policy described in `error`). A wholly unreadable directory
/// (e.g. `opendir` itself fails) returns an empty entry list and an error
/// count of `1` rather than propagating a fatal error: a single unreadable
/// subtree should not abort the rest of the scan.
pub fn scan_one(dir_path: &Path) -> (Vec<RawEntry>, u64) {
    #[cfg(target_os = "macos")]
    {
        match macos::scan_one_bulk(dir_path) {
            Some(result) => result,
            None => posix::scan_one_posix(dir_path),
        }
    }
    #[cfg(not(target_os = "macos"))]
    {
        posix::scan_one_posix(dir_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn scan_one_skips_dot_and_dotdot() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), b"hi").unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();

        let (entries, errors) = scan_one(dir.path());
        assert_eq!(errors, 0);
        let names: Vec<_> = entries.iter().map(|e| e.name.as_str()).collect();
        assert!(names.contains(&"a.txt"));
        assert!(names.contains(&"sub"));
        assert!(!names.contains(&"."));
        assert!(!names.contains(&".."));
    }

    #[test]
    fn scan_one_reports_error_for_missing_directory() {
        let (entries, errors) = scan_one(Path::new("/does/not/exist/at/all"));
        assert!(entries.is_empty());
        assert_eq!(errors, 1);
    }

    #[test]
    fn symlink_to_directory_is_reported_as_file() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("real_dir");
        fs::create_dir(&target).unwrap();
        let link = dir.path().join("link_dir");
        #[cfg(unix)]
        std::os::unix::fs::symlink(&target, &link).unwrap();

        let (entries, _) = scan_one(dir.path());
        let linked = entries.iter().find(|e| e.name == "link_dir");
        if let Some(entry) = linked {
            assert_eq!(entry.kind, RawKind::File);
        }
    }
}
