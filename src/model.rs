//! Shared data types produced and consumed by the scanning, finalizing and
//! classification pipeline.

use std::path::PathBuf;
use std::sync::{Arc, LazyLock};

use serde::{Deserialize, Serialize};

/// Whether a [`ScanNode`] is a regular file or a directory.
///
/// Symlinks are never followed (see `walk`): a symlink that points at a
/// directory is still recorded as [`NodeKind::File`] with `size_bytes = 0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    File,
    Directory,
}

/// A single node in the aggregated filesystem tree.
///
/// Before [`crate::tree::finalize`] runs, a directory's `size_bytes` and
/// `disk_usage` are both `0` and its `children` are in traversal order.
/// Afterwards the invariants in the module documentation of `tree` hold:
/// a directory's sizes are the sum of its children's, and its children are
/// sorted by `disk_usage` descending (ties broken by name ascending).
#[derive(Debug, Clone)]
pub struct ScanNode {
    pub path: PathBuf,
    pub name: String,
    pub kind: NodeKind,
    pub size_bytes: u64,
    pub disk_usage: u64,
    pub children: Vec<ScanNode>,
}

/// A single, process-wide empty child list shared by every file node.
///
/// Millions of leaf nodes in a large tree would otherwise each allocate an
/// empty `Vec`; cloning this shared sentinel costs nothing.
static EMPTY_CHILDREN: LazyLock<Arc<Vec<ScanNode>>> = LazyLock::new(|| Arc::new(Vec::new()));

impl ScanNode {
    /// Construct a new file node. `children` is always empty for files.
    #[must_use]
    pub fn new_file(path: PathBuf, name: String, size_bytes: u64, disk_usage: u64) -> Self {
        Self {
            path,
            name,
            kind: NodeKind::File,
            size_bytes,
            disk_usage,
            children: Vec::new(),
        }
    }

    /// Construct a new, empty directory node. Sizes are `0` until finalized.
    #[must_use]
    pub fn new_directory(path: PathBuf, name: String) -> Self {
        Self {
            path,
            name,
            kind: NodeKind::Directory,
            size_bytes: 0,
            disk_usage: 0,
            children: Vec::new(),
        }
    }

    #[must_use]
    pub const fn is_dir(&self) -> bool {
        matches!(self.kind, NodeKind::Directory)
    }

    #[must_use]
    pub const fn is_file(&self) -> bool {
        matches!(self.kind, NodeKind::File)
    }
}

/// Touches the shared empty-children sentinel so it participates in
/// allocation accounting even though `ScanNode` currently stores children
/// inline; kept for API stability with callers that want the sentinel
/// directly (e.g. constructing a detached leaf for testing).
#[must_use]
pub fn empty_children() -> Arc<Vec<ScanNode>> {
    Arc::clone(&EMPTY_CHILDREN)
}

/// Running and final counters for a scan.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ScanStats {
    pub files: u64,
    pub directories: u64,
    pub access_errors: u64,
}

/// The result of a completed (non-cancelled) scan: a fully populated (but
/// not yet finalized) tree plus the counters accumulated while building it.
#[derive(Debug, Clone)]
pub struct ScanSnapshot {
    pub root: ScanNode,
    pub stats: ScanStats,
}

/// Which classification bucket a [`PatternRule`] feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Temp,
    Cache,
    BuildArtifact,
}

impl Category {
    pub const ALL: [Self; 3] = [Self::Temp, Self::Cache, Self::BuildArtifact];
}

/// Which kind of node a [`PatternRule`] is eligible to match.
///
/// This is a bitflag so a single rule can apply to both files and
/// directories (`BOTH = FILE | DIR`) without the hot path having to check
/// both a file list and a directory list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplyTo {
    File,
    Dir,
    Both,
}

impl ApplyTo {
    #[must_use]
    pub const fn matches_file(self) -> bool {
        matches!(self, Self::File | Self::Both)
    }

    #[must_use]
    pub const fn matches_dir(self) -> bool {
        matches!(self, Self::Dir | Self::Both)
    }
}

/// A single classification rule, as ingested from configuration.
///
/// `pattern` is a glob pattern using `**/` prefixes per the configuration
/// format (see `classify::rules`); it is compiled, not interpreted, by
/// [`crate::classify::compile_ruleset`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternRule {
    pub name: String,
    pub pattern: String,
    pub category: Category,
    pub apply_to: ApplyTo,
    #[serde(default)]
    pub stop_recursion: bool,
}

/// A single reported finding: one path matched by one rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Insight {
    pub path: PathBuf,
    pub name: String,
    pub size_bytes: u64,
    pub disk_usage: u64,
    pub kind: NodeKind,
    pub category: Category,
    pub summary: String,
}

/// Aggregate counters for one category across an entire scan, computed
/// before any top-K truncation is applied.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct CategoryStats {
    pub count: u64,
    pub size_bytes: u64,
    pub disk_usage: u64,
}

/// The output of [`crate::insights::generate`]: insights globally sorted by
/// `disk_usage` descending, plus untruncated per-category aggregates.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InsightBundle {
    pub insights: Vec<Insight>,
    pub by_category: std::collections::HashMap<Category, CategoryStats>,
}
