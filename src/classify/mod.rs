//! Compiling [`PatternRule`]s into a dispatch table the insight generator
//! can evaluate once per visited node without re-parsing any pattern.
//!
//! See the module documentation on [`aho_corasick`] and [`prefix_trie`] for
//! the two hand-rolled multi-pattern structures this compiler builds on.

pub mod aho_corasick;
pub mod glob;
pub mod prefix_trie;
pub mod rules;

use std::collections::HashMap;
use std::path::PathBuf;

use regex::bytes::Regex as BytesRegex;

use crate::error::CompileError;
use crate::model::{Category, PatternRule};
use aho_corasick::AhoCorasick;
use prefix_trie::PrefixTrie;

/// One registered pattern, tagged with whether an automaton hit only
/// counts when it lands at the very end of the searched path.
type AutomatonEntry = (PatternRule, bool);

/// The compiled dispatch table for one node role (file or directory).
pub struct RuleDispatch {
    pub exact: HashMap<String, Vec<PatternRule>>,
    pub automaton: AhoCorasick<AutomatonEntry>,
    pub prefix_trie: PrefixTrie<PatternRule>,
    pub glob: Vec<(BytesRegex, PatternRule)>,
    pub additional: Vec<(String, Category)>,
}

impl RuleDispatch {
    fn new() -> Self {
        Self {
            exact: HashMap::new(),
            automaton: AhoCorasick::new(),
            prefix_trie: PrefixTrie::new(),
            glob: Vec::new(),
            additional: Vec::new(),
        }
    }

    fn freeze(&mut self) {
        self.automaton.freeze();
        self.prefix_trie.freeze();
    }
}

/// The full compiled ruleset: one dispatch table per node role, built once
/// and read concurrently by every insight-generator worker.
pub struct CompiledRuleSet {
    pub for_file: RuleDispatch,
    pub for_dir: RuleDispatch,
}

enum MatcherKind {
    Exact(String),
    Contains(String),
    EndsWith(String),
    StartsWith(String),
    Glob(String),
}

fn has_wildcard(segment: &str) -> bool {
    segment.contains(['*', '?', '['])
}

/// Classify one already brace-expanded, already-lowercased glob pattern
/// into the tier the rule compiler uses to dispatch it.
fn classify_pattern(pattern: &str) -> MatcherKind {
    if let Some(rest) = pattern.strip_prefix("**/") {
        if let Some(seg) = rest.strip_suffix("/**")
            && !seg.is_empty()
            && !has_wildcard(seg)
        {
            return MatcherKind::Contains(seg.to_owned());
        }
        if let Some(ext) = rest.strip_prefix("*.")
            && !ext.is_empty()
            && !ext.contains('/')
            && !has_wildcard(ext)
        {
            return MatcherKind::EndsWith(format!(".{ext}"));
        }
        if let Some(prefix) = rest.strip_suffix('*')
            && !prefix.is_empty()
            && !prefix.contains('/')
            && !has_wildcard(prefix)
        {
            return MatcherKind::StartsWith(prefix.to_owned());
        }
        if !rest.is_empty() && !has_wildcard(rest) && !rest.contains('/') {
            return MatcherKind::Exact(rest.to_owned());
        }
    }
    MatcherKind::Glob(pattern.to_owned())
}

/// Expand `{a,b,c}` alternations into the cross product of literal
/// patterns. Does not support nested alternations, matching the glob
/// dialect this crate otherwise accepts.
fn expand_braces(pattern: &str) -> Result<Vec<String>, CompileError> {
    let Some(open) = pattern.find('{') else {
        return Ok(vec![pattern.to_owned()]);
    };
    let Some(rel_close) = pattern[open..].find('}') else {
        return Err(CompileError::UnclosedAlternation {
            pattern: pattern.to_owned(),
        });
    };
    let close = open + rel_close;
    let prefix = &pattern[..open];
    let alternatives = &pattern[open + 1..close];
    let suffix = &pattern[close + 1..];

    let mut results = Vec::new();
    for alt in alternatives.split(',') {
        let combined = format!("{prefix}{alt}{suffix}");
        results.extend(expand_braces(&combined)?);
    }
    Ok(results)
}

fn add_to_dispatch(dispatch: &mut RuleDispatch, pattern: &str, rule: &PatternRule) -> Result<(), CompileError> {
    match classify_pattern(pattern) {
        MatcherKind::Exact(key) => {
            dispatch.exact.entry(key).or_default().push(rule.clone());
        }
        MatcherKind::Contains(seg) => {
            dispatch
                .automaton
                .add_key(format!("/{seg}/").as_bytes(), (rule.clone(), false))
                .expect("dispatch automaton is never frozen before compile_ruleset returns");
            dispatch
                .automaton
                .add_key(format!("/{seg}").as_bytes(), (rule.clone(), true))
                .expect("dispatch automaton is never frozen before compile_ruleset returns");
        }
        MatcherKind::EndsWith(suffix) => {
            dispatch
                .automaton
                .add_key(suffix.as_bytes(), (rule.clone(), true))
                .expect("dispatch automaton is never frozen before compile_ruleset returns");
        }
        MatcherKind::StartsWith(prefix) => {
            dispatch
                .prefix_trie
                .add_key(prefix.as_bytes(), rule.clone())
                .expect("dispatch trie is never frozen before compile_ruleset returns");
        }
        MatcherKind::Glob(residual) => {
            let regex = glob::glob_to_regex(&residual).map_err(|err| CompileError::InvalidGlob {
                pattern: residual.clone(),
                reason: err.to_string(),
            })?;
            let bytes_regex = BytesRegex::new(regex.as_str()).map_err(|err| CompileError::InvalidGlob {
                pattern: residual,
                reason: err.to_string(),
            })?;
            dispatch.glob.push((bytes_regex, rule.clone()));
        }
    }
    Ok(())
}

/// Compile a list of rules and a set of caller-supplied additional paths
/// into a [`CompiledRuleSet`].
///
/// Compilation is order-independent: the resulting dispatch tables match
/// regardless of the order `rules` is given in (see the crate's tests for
/// this property).
///
/// # Errors
/// Returns [`CompileError`] if a pattern contains an unclosed `{...}`
/// alternation or a glob fragment that fails to parse.
pub fn compile_ruleset(
    rules: &[PatternRule],
    additional_paths: &HashMap<Category, Vec<PathBuf>>,
) -> Result<CompiledRuleSet, CompileError> {
    let mut for_file = RuleDispatch::new();
    let mut for_dir = RuleDispatch::new();

    for rule in rules {
        let lowered_pattern = rule.pattern.to_lowercase();
        let expanded = expand_braces(&lowered_pattern)?;

        for pattern in expanded {
            let mut compiled_rule = rule.clone();
            compiled_rule.pattern = pattern.clone();
            compiled_rule.name = rule.name.clone();

            if rule.apply_to.matches_file() {
                add_to_dispatch(&mut for_file, &pattern, &compiled_rule)?;
            }
            if rule.apply_to.matches_dir() {
                add_to_dispatch(&mut for_dir, &pattern, &compiled_rule)?;
            }
        }
    }

    for_file.freeze();
    for_dir.freeze();

    for (category, paths) in additional_paths {
        for path in paths {
            let lowered = path.to_string_lossy().to_lowercase();
            for_file.additional.push((lowered.clone(), *category));
            for_dir.additional.push((lowered, *category));
        }
    }

    Ok(CompiledRuleSet { for_file, for_dir })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ApplyTo;

    fn rule(name: &str, pattern: &str, category: Category, apply_to: ApplyTo, stop_recursion: bool) -> PatternRule {
        PatternRule {
            name: name.to_owned(),
            pattern: pattern.to_owned(),
            category,
            apply_to,
            stop_recursion,
        }
    }

    #[test]
    fn brace_expansion_produces_cross_product() {
        let expanded = expand_braces("**/*.{log,tmp}").unwrap();
        assert_eq!(expanded, vec!["**/*.log", "**/*.tmp"]);
    }

    #[test]
    fn unclosed_alternation_is_an_error() {
        assert!(matches!(
            expand_braces("**/*.{log"),
            Err(CompileError::UnclosedAlternation { .. })
        ));
    }

    #[test]
    fn classifies_each_tier_correctly() {
        assert!(matches!(classify_pattern("**/.ds_store"), MatcherKind::Exact(_)));
        assert!(matches!(classify_pattern("**/tmp/**"), MatcherKind::Contains(_)));
        assert!(matches!(classify_pattern("**/*.log"), MatcherKind::EndsWith(_)));
        assert!(matches!(classify_pattern("**/node_modules*"), MatcherKind::StartsWith(_)));
        assert!(matches!(classify_pattern("**/a?b"), MatcherKind::Glob(_)));
    }

    #[test]
    fn exact_rule_matches_only_exact_basename() {
        let rules = vec![rule(
            "ds_store",
            "**/.DS_Store",
            Category::Temp,
            ApplyTo::File,
            false,
        )];
        let compiled = compile_ruleset(&rules, &HashMap::new()).unwrap();
        assert!(compiled.for_file.exact.contains_key(".ds_store"));
        assert!(compiled.for_dir.exact.is_empty());
    }

    #[test]
    fn compilation_is_order_independent() {
        let a = rule("tmp", "**/tmp/**", Category::Temp, ApplyTo::Both, false);
        let b = rule("log", "**/*.log", Category::Temp, ApplyTo::Both, false);

        let forward = compile_ruleset(&[a.clone(), b.clone()], &HashMap::new()).unwrap();
        let backward = compile_ruleset(&[b, a], &HashMap::new()).unwrap();

        let path = b"/r/tmp/a.log";
        let forward_hits = forward.for_file.automaton.find(path).unwrap().len();
        let backward_hits = backward.for_file.automaton.find(path).unwrap().len();
        assert_eq!(forward_hits, backward_hits);
    }
}
