//! Bounded, ranked classification of a finalized tree against a compiled
//! ruleset.
//!
//! [`generate`] walks the tree with an explicit stack (no recursion, so
//! traversal depth is not limited by the call stack) and evaluates each
//! node's dispatch tiers in the fixed order the rule compiler assumes:
//! exact basename, automaton (merged CONTAINS/ENDSWITH), prefix trie
//! (STARTSWITH), glob fallback, then caller-supplied additional paths.
//! Within one node, the first tier to match a given category wins; no
//! node is ever reported twice for the same category.

use std::cell::RefCell;
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, HashSet};

use crate::classify::CompiledRuleSet;
use crate::model::{Category, CategoryStats, Insight, InsightBundle, PatternRule, ScanNode};

thread_local! {
    /// Reused across every `match_node` call on this thread so lowercasing
    /// a path does not allocate a fresh `String` per visited node.
    static LOWER_PATH: RefCell<String> = const { RefCell::new(String::new()) };
    static LOWER_NAME: RefCell<String> = const { RefCell::new(String::new()) };
}

/// Limits on how many insights are retained per category. The engine still
/// scans every node; this only bounds how much of the long tail it keeps.
#[derive(Debug, Clone, Copy)]
pub struct InsightLimits {
    pub max_insights_per_category: usize,
}

impl Default for InsightLimits {
    fn default() -> Self {
        Self {
            max_insights_per_category: 1000,
        }
    }
}

/// One accepted classification, before it is turned into an [`Insight`].
enum Matched<'a> {
    Rule(&'a PatternRule),
    Additional(Category),
}

impl Matched<'_> {
    const fn category(&self) -> Category {
        match self {
            Self::Rule(rule) => rule.category,
            Self::Additional(category) => *category,
        }
    }

    const fn stop_recursion(&self) -> bool {
        match self {
            Self::Rule(rule) => rule.stop_recursion,
            Self::Additional(_) => false,
        }
    }

    fn summary(&self) -> String {
        match self {
            Self::Rule(rule) => format!("matched rule '{}'", rule.name),
            Self::Additional(_) => "matched an additional configured path".to_owned(),
        }
    }
}

fn lowercase_into(buf: &mut String, src: &str) {
    buf.clear();
    buf.extend(src.chars().flat_map(char::to_lowercase));
}

fn match_node<'a>(node: &ScanNode, ruleset: &'a CompiledRuleSet) -> Vec<Matched<'a>> {
    let dispatch = if node.is_dir() { &ruleset.for_dir } else { &ruleset.for_file };

    LOWER_PATH.with_borrow_mut(|lower_path| {
        LOWER_NAME.with_borrow_mut(|lower_name| {
            lowercase_into(lower_path, &node.path.to_string_lossy());
            lowercase_into(lower_name, &node.name);

            let mut matched = Vec::new();
            let mut seen = HashSet::new();

            if let Some(rules) = dispatch.exact.get(lower_name.as_str()) {
                for rule in rules {
                    if seen.insert(rule.category) {
                        matched.push(Matched::Rule(rule));
                    }
                }
            }

            if let Ok(hits) = dispatch.automaton.find(lower_path.as_bytes()) {
                for (end_index, (rule, end_only)) in hits {
                    if *end_only && end_index != lower_path.len().saturating_sub(1) {
                        continue;
                    }
                    if seen.insert(rule.category) {
                        matched.push(Matched::Rule(rule));
                    }
                }
            }

            if let Ok(hits) = dispatch.prefix_trie.find(lower_name.as_bytes()) {
                for rule in hits {
                    if seen.insert(rule.category) {
                        matched.push(Matched::Rule(rule));
                    }
                }
            }

            for (regex, rule) in &dispatch.glob {
                if seen.contains(&rule.category) {
                    continue;
                }
                if regex.is_match(lower_path.as_bytes()) && seen.insert(rule.category) {
                    matched.push(Matched::Rule(rule));
                }
            }

            for (prefix, category) in &dispatch.additional {
                if seen.contains(category) {
                    continue;
                }
                if lower_path.starts_with(prefix.as_str()) && seen.insert(*category) {
                    matched.push(Matched::Additional(*category));
                }
            }

            matched
        })
    })
}

struct HeapEntry {
    disk_usage: u64,
    insight: Insight,
}

impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.disk_usage == other.disk_usage
    }
}
impl Eq for HeapEntry {}
impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.disk_usage.cmp(&other.disk_usage)
    }
}

struct Frame<'a> {
    node: &'a ScanNode,
    in_temp_or_cache: bool,
}

/// Walk `root` and classify every node against `ruleset`, returning a
/// bundle of globally disk-usage-sorted insights and untruncated
/// per-category aggregates.
#[must_use]
pub fn generate(root: &ScanNode, ruleset: &CompiledRuleSet, limits: &InsightLimits) -> InsightBundle {
    let mut heaps: HashMap<Category, BinaryHeap<Reverse<HeapEntry>>> = HashMap::new();
    let mut seen_best: HashMap<Category, HashMap<std::path::PathBuf, u64>> = HashMap::new();
    let mut by_category: HashMap<Category, CategoryStats> = HashMap::new();

    let mut stack = vec![Frame {
        node: root,
        in_temp_or_cache: false,
    }];

    while let Some(frame) = stack.pop() {
        let node = frame.node;

        if frame.in_temp_or_cache {
            // Already counted by an ancestor's aggregate; do not classify
            // or descend further.
            continue;
        }

        let matched = match_node(node, ruleset);
        let any_stop = matched.iter().any(Matched::stop_recursion);
        let any_temp_or_cache = matched
            .iter()
            .any(|m| matches!(m.category(), Category::Temp | Category::Cache));

        for rule_match in &matched {
            let category = rule_match.category();
            let insight = Insight {
                path: node.path.clone(),
                name: node.name.clone(),
                size_bytes: node.size_bytes,
                disk_usage: node.disk_usage,
                kind: node.kind,
                category,
                summary: rule_match.summary(),
            };
            record(&mut heaps, &mut seen_best, &mut by_category, insight, limits);
        }

        if any_stop {
            continue;
        }

        let children_are_temp_or_cache = !matched.is_empty() && any_temp_or_cache;
        for child in &node.children {
            stack.push(Frame {
                node: child,
                in_temp_or_cache: children_are_temp_or_cache,
            });
        }
    }

    let insights = extract(heaps, &seen_best, limits);
    InsightBundle { insights, by_category }
}

fn record(
    heaps: &mut HashMap<Category, BinaryHeap<Reverse<HeapEntry>>>,
    seen_best: &mut HashMap<Category, HashMap<std::path::PathBuf, u64>>,
    by_category: &mut HashMap<Category, CategoryStats>,
    insight: Insight,
    limits: &InsightLimits,
) {
    let stats = by_category.entry(insight.category).or_default();
    stats.count += 1;
    stats.size_bytes += insight.size_bytes;
    stats.disk_usage += insight.disk_usage;

    seen_best
        .entry(insight.category)
        .or_default()
        .insert(insight.path.clone(), insight.disk_usage);

    let heap = heaps.entry(insight.category).or_default();
    let disk_usage = insight.disk_usage;
    if heap.len() < limits.max_insights_per_category {
        heap.push(Reverse(HeapEntry { disk_usage, insight }));
    } else if let Some(Reverse(min_entry)) = heap.peek()
        && disk_usage > min_entry.disk_usage
    {
        heap.pop();
        heap.push(Reverse(HeapEntry { disk_usage, insight }));
    }
}

fn extract(
    heaps: HashMap<Category, BinaryHeap<Reverse<HeapEntry>>>,
    seen_best: &HashMap<Category, HashMap<std::path::PathBuf, u64>>,
    _limits: &InsightLimits,
) -> Vec<Insight> {
    let mut all = Vec::new();
    for (category, heap) in heaps {
        let best_for_category = seen_best.get(&category);
        for Reverse(entry) in heap {
            let is_stale = best_for_category
                .and_then(|best| best.get(&entry.insight.path))
                .is_some_and(|&best_usage| entry.disk_usage < best_usage);
            if !is_stale {
                all.push(entry.insight);
            }
        }
    }
    all.sort_by(|a, b| b.disk_usage.cmp(&a.disk_usage));
    all
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::compile_ruleset;
    use crate::model::{ApplyTo, PatternRule};
    use crate::tree::finalize;
    use std::path::PathBuf;

    fn file(path: &str, size: u64, disk_usage: u64) -> ScanNode {
        let name = path.rsplit('/').next().unwrap().to_owned();
        ScanNode::new_file(PathBuf::from(path), name, size, disk_usage)
    }

    fn dir(path: &str, children: Vec<ScanNode>) -> ScanNode {
        let name = path.rsplit('/').next().unwrap().to_owned();
        let mut node = ScanNode::new_directory(PathBuf::from(path), name);
        node.children = children;
        node
    }

    fn rule(name: &str, pattern: &str, category: Category, apply_to: ApplyTo, stop_recursion: bool) -> PatternRule {
        PatternRule {
            name: name.to_owned(),
            pattern: pattern.to_owned(),
            category,
            apply_to,
            stop_recursion,
        }
    }

    // Scenario B: exact match `**/.DS_Store` -> TEMP; nothing else matches.
    #[test]
    fn scenario_b_exact_match() {
        let rules = vec![rule("ds", "**/.DS_Store", Category::Temp, ApplyTo::File, false)];
        let ruleset = compile_ruleset(&rules, &HashMap::new()).unwrap();

        let mut root = dir("/r", vec![file("/r/.DS_Store", 10, 512)]);
        finalize(&mut root);

        let bundle = generate(&root, &ruleset, &InsightLimits::default());
        assert_eq!(bundle.insights.len(), 1);
        assert_eq!(bundle.insights[0].category, Category::Temp);
    }

    // Scenario C: CONTAINS `**/tmp/**` (automaton end-only key) and EXACT
    // `**/tmp` both match the `/r/tmp` directory itself -> one deduped
    // insight there, and temp/cache subtree pruning drops its child from
    // the results entirely (the parent's aggregate already covers it).
    #[test]
    fn scenario_c_multi_hit_dedup() {
        let rules = vec![
            rule("tmp_contains", "**/tmp/**", Category::Temp, ApplyTo::Both, false),
            rule("tmp_exact", "**/tmp", Category::Temp, ApplyTo::Dir, false),
        ];
        let ruleset = compile_ruleset(&rules, &HashMap::new()).unwrap();

        let mut root = dir("/r", vec![dir("/r/tmp", vec![file("/r/tmp/a.log", 10, 512)])]);
        finalize(&mut root);

        let bundle = generate(&root, &ruleset, &InsightLimits::default());
        let dir_insights: Vec<_> = bundle
            .insights
            .iter()
            .filter(|i| i.path == PathBuf::from("/r/tmp"))
            .collect();
        assert_eq!(dir_insights.len(), 1);
        assert!(bundle.insights.iter().all(|i| i.path != PathBuf::from("/r/tmp/a.log")));
        assert_eq!(bundle.by_category[&Category::Temp].count, 1);
    }

    // Scenario D: stop_recursion on node_modules means descendants never
    // appear.
    #[test]
    fn scenario_d_stop_recursion_hides_descendants() {
        let rules = vec![rule(
            "nm",
            "**/node_modules/**",
            Category::BuildArtifact,
            ApplyTo::Dir,
            true,
        )];
        let ruleset = compile_ruleset(&rules, &HashMap::new()).unwrap();

        let mut root = dir(
            "/r",
            vec![dir(
                "/r/node_modules",
                vec![dir("/r/node_modules/react", vec![file("/r/node_modules/react/index.js", 5, 512)])],
            )],
        );
        finalize(&mut root);

        let bundle = generate(&root, &ruleset, &InsightLimits::default());
        assert_eq!(bundle.insights.len(), 1);
        assert_eq!(bundle.insights[0].path, PathBuf::from("/r/node_modules"));
    }

    // Scenario E: top-K eviction keeps the largest two of three matches but
    // counts all three.
    #[test]
    fn scenario_e_top_k_eviction() {
        let rules = vec![rule("cache", "**/.cache/**", Category::Cache, ApplyTo::Dir, true)];
        let ruleset = compile_ruleset(&rules, &HashMap::new()).unwrap();

        let mut root = dir(
            "/r",
            vec![
                dir("/r/.cache", vec![]),
                dir("/r/a", vec![dir("/r/a/.cache", vec![])]),
                dir("/r/b", vec![dir("/r/b/.cache", vec![])]),
            ],
        );
        root.children[0].disk_usage = 100;
        root.children[1].children[0].disk_usage = 200;
        root.children[2].children[0].disk_usage = 300;
        // Bypass finalize since we hand-set disk_usage directly above and
        // finalize would zero it back out for these empty directories.

        let limits = InsightLimits {
            max_insights_per_category: 2,
        };
        let bundle = generate(&root, &ruleset, &limits);

        let cache_insights: Vec<u64> = bundle
            .insights
            .iter()
            .filter(|i| i.category == Category::Cache)
            .map(|i| i.disk_usage)
            .collect();
        assert_eq!(cache_insights, vec![300, 200]);
        assert_eq!(bundle.by_category[&Category::Cache].count, 3);
    }

    #[test]
    fn insight_count_never_exceeds_limit() {
        let rules = vec![rule("log", "**/*.log", Category::Temp, ApplyTo::File, false)];
        let ruleset = compile_ruleset(&rules, &HashMap::new()).unwrap();

        let children: Vec<ScanNode> = (0..20)
            .map(|i| file(&format!("/r/{i}.log"), i, i * 512))
            .collect();
        let mut root = dir("/r", children);
        finalize(&mut root);

        let limits = InsightLimits {
            max_insights_per_category: 5,
        };
        let bundle = generate(&root, &ruleset, &limits);
        let temp_count = bundle.insights.iter().filter(|i| i.category == Category::Temp).count();
        assert_eq!(temp_count, 5);
        assert_eq!(bundle.by_category[&Category::Temp].count, 20);
    }
}
