//! Bottom-up, recursion-free tree aggregation.
//!
//! [`finalize`] makes two passes over the tree with an explicit stack:
//! a pre-order walk collecting every directory, then a single reverse
//! pass that sums each directory's children and sorts them. No call stack
//! is used, so this scales to arbitrarily deep trees regardless of the
//! process's stack size.

use crate::model::ScanNode;

/// Finalize `root` in place: every directory's `size_bytes`/`disk_usage`
/// becomes the sum of its children's, and every directory's `children` is
/// sorted by `disk_usage` descending, ties broken by `name` ascending.
///
/// Idempotent: calling this twice in a row produces the same tree, since
/// file nodes are untouched and a directory's already-correct aggregate is
/// recomputed to the same value.
pub fn finalize(root: &mut ScanNode) {
    // Pass 1: collect every directory, pre-order, as raw pointers. The
    // pointers are valid for the remainder of this function because `root`
    // is borrowed mutably for the whole call and nothing reallocates a
    // `children` Vec once this pass finishes walking into it.
    let mut directories: Vec<*mut ScanNode> = Vec::new();
    let mut stack: Vec<*mut ScanNode> = vec![root as *mut ScanNode];

    while let Some(ptr) = stack.pop() {
        // Safety: ptr was derived from `root`'s own tree structure and no
        // other alias to it exists while this function runs.
        let node = unsafe { &mut *ptr };
        if !node.is_dir() {
            continue;
        }
        directories.push(ptr);
        for child in &mut node.children {
            stack.push(child as *mut ScanNode);
        }
    }

    // Pass 2: reverse (post-order w.r.t. discovery) so every directory's
    // children are already aggregated by the time we reach it.
    for ptr in directories.into_iter().rev() {
        // Safety: see above.
        let node = unsafe { &mut *ptr };
        let mut size_bytes = 0u64;
        let mut disk_usage = 0u64;
        for child in &node.children {
            size_bytes += child.size_bytes;
            disk_usage += child.disk_usage;
        }
        node.size_bytes = size_bytes;
        node.disk_usage = disk_usage;
        node.children
            .sort_by(|a, b| b.disk_usage.cmp(&a.disk_usage).then_with(|| a.name.cmp(&b.name)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ScanNode;
    use std::path::PathBuf;

    fn file(name: &str, size: u64, blocks_512: u64) -> ScanNode {
        ScanNode::new_file(PathBuf::from(format!("/r/{name}")), name.to_owned(), size, blocks_512 * 512)
    }

    fn dir(name: &str, children: Vec<ScanNode>) -> ScanNode {
        let mut node = ScanNode::new_directory(PathBuf::from(format!("/r/{name}")), name.to_owned());
        node.children = children;
        node
    }

    // Scenario A from the scanning/classification spec: /r/a/x(100,1blk),
    // /r/a/y(50,1blk), /r/b/z(200,2blk), block size 512.
    #[test]
    fn scenario_a_aggregation_and_ordering() {
        let mut root = dir(
            "r",
            vec![
                dir("a", vec![file("x", 100, 1), file("y", 50, 1)]),
                dir("b", vec![file("z", 200, 2)]),
            ],
        );

        finalize(&mut root);

        assert_eq!(root.disk_usage, 2048);
        assert_eq!(root.size_bytes, 350);
        assert_eq!(root.children[0].name, "b");
        assert_eq!(root.children[0].disk_usage, 1024);
        assert_eq!(root.children[1].name, "a");
        assert_eq!(root.children[1].disk_usage, 1024);
    }

    #[test]
    fn ties_break_by_name_ascending() {
        let mut root = dir(
            "r",
            vec![
                dir("zeta", vec![file("f", 10, 1)]),
                dir("alpha", vec![file("g", 10, 1)]),
            ],
        );
        finalize(&mut root);
        assert_eq!(root.children[0].name, "alpha");
        assert_eq!(root.children[1].name, "zeta");
    }

    #[test]
    fn empty_directory_has_zero_sizes() {
        let mut root = dir("r", vec![dir("empty", vec![])]);
        finalize(&mut root);
        assert_eq!(root.children[0].size_bytes, 0);
        assert_eq!(root.children[0].disk_usage, 0);
    }

    #[test]
    fn finalize_is_idempotent() {
        let mut root = dir(
            "r",
            vec![dir("a", vec![file("x", 100, 1)]), dir("b", vec![file("y", 50, 1)])],
        );
        finalize(&mut root);
        let first_pass = (root.size_bytes, root.disk_usage);
        finalize(&mut root);
        assert_eq!((root.size_bytes, root.disk_usage), first_pass);
    }

    #[test]
    fn handles_deep_trees_without_recursion() {
        let mut leaf = file("deep", 1, 1);
        let mut depth = 2000;
        let mut current = dir("bottom", vec![]);
        current.children.push(std::mem::replace(&mut leaf, file("unused", 0, 0)));
        while depth > 0 {
            current = dir("level", vec![current]);
            depth -= 1;
        }
        finalize(&mut current);
        assert_eq!(current.disk_usage, 512);
    }
}
