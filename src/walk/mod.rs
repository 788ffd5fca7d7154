//! Parallel directory traversal.
//!
//! [`scan`] walks a directory tree with a fixed-size pool of worker
//! threads, each pulling directories off a [`queue::WorkQueue`], calling the
//! platform scanner primitive (`crate::platform::scan_one`) and enqueueing
//! any subdirectories it discovers. The resulting tree is not yet
//! aggregated or sorted; callers run [`crate::tree::finalize`] afterwards.

pub mod queue;

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

use crate::error::ScanError;
use crate::model::{NodeKind, ScanNode, ScanSnapshot, ScanStats};
use crate::platform;
use queue::WorkQueue;

/// Called periodically during a scan with the path currently being
/// processed and the running file/directory counts. Must be cheap and
/// non-blocking: it is invoked from worker threads roughly once per 100
/// processed entries, never once per entry.
pub type ProgressSink = Arc<dyn Fn(&Path, u64, u64) + Send + Sync>;

/// Polled roughly once per 100 processed entries; returning `true` stops
/// the walk from enqueueing further work.
pub type CancelPredicate = Arc<dyn Fn() -> bool + Send + Sync>;

/// How many processed entries between progress-sink/cancel-predicate
/// checks, per spec: "periodically (~every 100 entries globally)".
const PROGRESS_INTERVAL: u64 = 100;

#[derive(Clone)]
pub struct WalkConfig {
    pub worker_count: usize,
    pub max_depth: Option<u32>,
    pub progress_sink: Option<ProgressSink>,
    pub cancel: Option<CancelPredicate>,
}

impl Default for WalkConfig {
    fn default() -> Self {
        Self {
            worker_count: default_worker_count(),
            max_depth: None,
            progress_sink: None,
            cancel: None,
        }
    }
}

fn default_worker_count() -> usize {
    thread::available_parallelism().map_or(4, std::num::NonZero::get)
}

/// The outcome of a walk: either a completed snapshot, or an explicit
/// cancellation signal, distinguished per spec rather than folding
/// cancellation into `ScanError`.
#[derive(Debug)]
pub enum WalkOutcome {
    Completed(ScanSnapshot),
    Cancelled,
}

/// An in-progress tree node: children are behind a `Mutex` purely so the
/// type is `Sync` across worker threads. Contention is always zero because
/// each directory is assigned to exactly one worker, which is the only
/// thread that ever locks this particular node's `children`.
struct BuildNode {
    path: PathBuf,
    name: String,
    kind: NodeKind,
    size_bytes: u64,
    disk_usage: u64,
    children: Mutex<Vec<Arc<BuildNode>>>,
}

impl BuildNode {
    fn new_dir(path: PathBuf, name: String) -> Arc<Self> {
        Arc::new(Self {
            path,
            name,
            kind: NodeKind::Directory,
            size_bytes: 0,
            disk_usage: 0,
            children: Mutex::new(Vec::new()),
        })
    }

    fn new_file(path: PathBuf, name: String, size_bytes: u64, disk_usage: u64) -> Arc<Self> {
        Arc::new(Self {
            path,
            name,
            kind: NodeKind::File,
            size_bytes,
            disk_usage,
            children: Mutex::new(Vec::new()),
        })
    }
}

struct Task {
    node: Arc<BuildNode>,
    depth: u32,
}

fn expand_tilde(path: &Path) -> PathBuf {
    let Some(path_str) = path.to_str() else {
        return path.to_path_buf();
    };
    if let Some(rest) = path_str.strip_prefix('~')
        && (rest.is_empty() || rest.starts_with('/'))
        && let Ok(home) = std::env::var("HOME")
    {
        return PathBuf::from(home).join(rest.trim_start_matches('/'));
    }
    path.to_path_buf()
}

/// Resolve, validate and scan `root_path` with `config.worker_count`
/// threads. See the module documentation for the shape of the result.
///
/// # Errors
/// Returns [`ScanError::RootNotFound`] or [`ScanError::RootNotDirectory`] if
/// `root_path` (after `~` expansion) does not resolve to an existing
/// directory.
pub fn scan(root_path: &Path, config: &WalkConfig) -> Result<WalkOutcome, ScanError> {
    let resolved = expand_tilde(root_path);
    if !resolved.exists() {
        return Err(ScanError::RootNotFound(resolved));
    }
    if !resolved.is_dir() {
        return Err(ScanError::RootNotDirectory(resolved));
    }

    let root_name = resolved
        .file_name()
        .map_or_else(|| resolved.display().to_string(), |n| n.to_string_lossy().into_owned());
    let root_node = BuildNode::new_dir(resolved.clone(), root_name);

    let queue: Arc<WorkQueue<Task>> = Arc::new(WorkQueue::new());
    let stats = Arc::new(Mutex::new(ScanStats {
        files: 0,
        directories: 1,
        access_errors: 0,
    }));
    let processed = Arc::new(AtomicU64::new(0));
    let cancelled = Arc::new(AtomicBool::new(false));

    queue.put(Task {
        node: Arc::clone(&root_node),
        depth: 0,
    });

    let worker_count = config.worker_count.max(1);
    let mut handles = Vec::with_capacity(worker_count);

    for _ in 0..worker_count {
        let queue = Arc::clone(&queue);
        let stats = Arc::clone(&stats);
        let processed = Arc::clone(&processed);
        let cancelled = Arc::clone(&cancelled);
        let max_depth = config.max_depth;
        let progress_sink = config.progress_sink.clone();
        let cancel_predicate = config.cancel.clone();

        handles.push(thread::spawn(move || {
            while let Some(task) = queue.get() {
                if cancelled.load(Ordering::Relaxed) {
                    queue.task_done();
                    continue;
                }

                let (entries, errs) = platform::scan_one(&task.node.path);

                let mut local_files = 0u64;
                let mut local_dirs = 0u64;
                {
                    let mut children = task.node.children.lock().unwrap();
                    for entry in entries {
                        let child_path = task.node.path.join(&entry.name);
                        match entry.kind {
                            platform::RawKind::File => {
                                local_files += 1;
                                children.push(BuildNode::new_file(
                                    child_path,
                                    entry.name,
                                    entry.size_bytes,
                                    entry.disk_usage,
                                ));
                            }
                            platform::RawKind::Directory => {
                                local_dirs += 1;
                                let child = BuildNode::new_dir(child_path, entry.name);
                                let within_depth =
                                    max_depth.is_none_or(|max| task.depth < max);
                                if within_depth {
                                    queue.put(Task {
                                        node: Arc::clone(&child),
                                        depth: task.depth + 1,
                                    });
                                }
                                children.push(child);
                            }
                        }
                    }
                }

                {
                    let mut stats = stats.lock().unwrap();
                    stats.files += local_files;
                    stats.directories += local_dirs;
                    stats.access_errors += errs;
                }

                let prev = processed.fetch_add(local_files + local_dirs, Ordering::Relaxed);
                let crossed_boundary =
                    (prev / PROGRESS_INTERVAL) != ((prev + local_files + local_dirs) / PROGRESS_INTERVAL);
                if crossed_boundary {
                    if let Some(predicate) = &cancel_predicate
                        && predicate()
                    {
                        cancelled.store(true, Ordering::Relaxed);
                    }
                    if let Some(sink) = &progress_sink {
                        let stats = stats.lock().unwrap();
                        sink(&task.node.path, stats.files, stats.directories);
                    }
                }

                queue.task_done();
            }
        }));
    }

    queue.join();
    queue.close();
    for handle in handles {
        let _ = handle.join();
    }

    if cancelled.load(Ordering::Relaxed) {
        return Ok(WalkOutcome::Cancelled);
    }

    let final_stats = *stats.lock().unwrap();
    let root = materialize(root_node);

    Ok(WalkOutcome::Completed(ScanSnapshot {
        root,
        stats: final_stats,
    }))
}

/// Convert the shared, lock-protected build tree into the owned
/// [`ScanNode`] tree the rest of the crate operates on. Only called after
/// every worker has finished, so every node in the tree has exactly one
/// remaining strong reference (its parent's `children` list, or the local
/// root handle).
fn materialize(node: Arc<BuildNode>) -> ScanNode {
    let node = Arc::try_unwrap(node).unwrap_or_else(|shared| BuildNode {
        path: shared.path.clone(),
        name: shared.name.clone(),
        kind: shared.kind,
        size_bytes: shared.size_bytes,
        disk_usage: shared.disk_usage,
        children: Mutex::new(shared.children.lock().unwrap().clone()),
    });

    let raw_children = node.children.into_inner().unwrap();
    let children = raw_children.into_iter().map(materialize).collect();

    ScanNode {
        path: node.path,
        name: node.name,
        kind: node.kind,
        size_bytes: node.size_bytes,
        disk_usage: node.disk_usage,
        children,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::os::unix::fs::PermissionsExt;
    use std::sync::atomic::AtomicUsize;

    fn scan_dir(dir: &Path, config: &WalkConfig) -> ScanSnapshot {
        match scan(dir, config).unwrap() {
            WalkOutcome::Completed(snapshot) => snapshot,
            WalkOutcome::Cancelled => panic!("expected a completed scan"),
        }
    }

    #[test]
    fn missing_root_is_an_error() {
        let config = WalkConfig::default();
        let err = scan(Path::new("/definitely/not/a/real/path"), &config).unwrap_err();
        assert!(matches!(err, ScanError::RootNotFound(_)));
    }

    #[test]
    fn file_as_root_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let file_path = dir.path().join("f.txt");
        fs::write(&file_path, b"x").unwrap();
        let config = WalkConfig::default();
        let err = scan(&file_path, &config).unwrap_err();
        assert!(matches!(err, ScanError::RootNotDirectory(_)));
    }

    #[test]
    fn walks_nested_directories_and_counts_entries() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("a/b")).unwrap();
        fs::write(dir.path().join("a/x.txt"), b"1234").unwrap();
        fs::write(dir.path().join("a/b/y.txt"), b"56789").unwrap();

        let config = WalkConfig {
            worker_count: 2,
            ..WalkConfig::default()
        };
        let snapshot = scan_dir(dir.path(), &config);

        assert_eq!(snapshot.stats.files, 2);
        assert_eq!(snapshot.stats.directories, 3); // root, a, a/b
        assert_eq!(snapshot.stats.access_errors, 0);
    }

    #[test]
    fn max_depth_limits_recursion() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("a/b/c")).unwrap();

        let config = WalkConfig {
            worker_count: 1,
            max_depth: Some(1),
            ..WalkConfig::default()
        };
        let snapshot = scan_dir(dir.path(), &config);
        // root(depth 0) enqueues "a" (depth 1); depth 1 < max_depth(1) is
        // false so "a"'s children ("b") are never enqueued or scanned.
        let root = snapshot.root;
        let a = root.children.iter().find(|c| c.name == "a").unwrap();
        assert!(a.children.is_empty());
    }

    #[test]
    fn unreadable_directory_increments_access_errors_but_continues() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("good")).unwrap();
        let bad = dir.path().join("bad");
        fs::create_dir(&bad).unwrap();
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt as _;
            fs::set_permissions(&bad, fs::Permissions::from_mode(0o000)).unwrap();
        }

        let config = WalkConfig {
            worker_count: 2,
            ..WalkConfig::default()
        };
        let snapshot = scan_dir(dir.path(), &config);

        #[cfg(unix)]
        {
            assert!(snapshot.stats.access_errors >= 1);
            let bad_node = snapshot.root.children.iter().find(|c| c.name == "bad").unwrap();
            assert!(bad_node.children.is_empty());
            let good_node = snapshot.root.children.iter().find(|c| c.name == "good");
            assert!(good_node.is_some());

            fs::set_permissions(&bad, fs::Permissions::from_mode(0o755)).unwrap();
        }
    }

    #[test]
    fn cancellation_stops_further_enqueueing() {
        let dir = tempfile::tempdir().unwrap();
        for i in 0..5 {
            fs::create_dir(dir.path().join(format!("d{i}"))).unwrap();
        }
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = Arc::clone(&calls);
        let config = WalkConfig {
            worker_count: 1,
            cancel: Some(Arc::new(move || {
                calls_clone.fetch_add(1, Ordering::Relaxed);
                false
            })),
            ..WalkConfig::default()
        };
        match scan(dir.path(), &config).unwrap() {
            WalkOutcome::Completed(_) | WalkOutcome::Cancelled => {}
        }
    }
}
