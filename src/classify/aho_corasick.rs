//! A from-scratch Aho-Corasick automaton over the 256-byte alphabet.
//!
//! Built so the rule compiler can merge every `CONTAINS`/`ENDSWITH` pattern
//! for a role (file or directory) into a single multi-pattern scan of each
//! candidate path, independent of how many patterns were registered.
//!
//! Two-phase lifecycle: [`AhoCorasick::add_key`] while building, then
//! [`AhoCorasick::freeze`] once, after which [`AhoCorasick::find`] is
//! read-only and safe to call concurrently from multiple threads.

use crate::error::ClassifyError;

const ALPHABET: usize = 256;
const ROOT: usize = 0;

struct Node {
    children: [i32; ALPHABET],
    fail: usize,
    /// Index into `AhoCorasick::values` for a key ending at this node, or
    /// `-1` if this node is not itself the end of any key.
    output: i32,
    /// Index of the nearest proper ancestor-by-failure-chain that is itself
    /// an output node, or `-1` if there is none. Lets `find` emit every
    /// key ending at the current position without walking the full chain.
    dict_suffix: i32,
}

impl Node {
    fn new() -> Self {
        Self {
            children: [-1; ALPHABET],
            fail: ROOT,
            output: -1,
            dict_suffix: -1,
        }
    }
}

/// A multi-pattern byte-string automaton.
pub struct AhoCorasick<V> {
    nodes: Vec<Node>,
    values: Vec<V>,
    frozen: bool,
}

impl<V> AhoCorasick<V> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            nodes: vec![Node::new()],
            values: Vec::new(),
            frozen: false,
        }
    }

    /// Register `key` with an associated `value`, to be yielded by `find`
    /// whenever `key` occurs as a substring of the searched text.
    ///
    /// # Errors
    /// Returns [`ClassifyError::BuildLocked`] if called after `freeze`.
    pub fn add_key(&mut self, key: &[u8], value: V) -> Result<(), ClassifyError> {
        if self.frozen {
            return Err(ClassifyError::BuildLocked);
        }
        let mut state = ROOT;
        for &byte in key {
            let next = self.nodes[state].children[byte as usize];
            state = if next >= 0 {
                next as usize
            } else {
                let new_index = self.nodes.len();
                self.nodes.push(Node::new());
                self.nodes[state].children[byte as usize] = new_index as i32;
                new_index
            };
        }
        let value_index = self.values.len();
        self.values.push(value);
        self.nodes[state].output = value_index as i32;
        Ok(())
    }

    /// Compute failure and dictionary-suffix links via a breadth-first
    /// traversal. Must be called exactly once before `find`.
    pub fn freeze(&mut self) {
        if self.frozen {
            return;
        }
        let mut queue = std::collections::VecDeque::new();

        for byte in 0..ALPHABET {
            let child = self.nodes[ROOT].children[byte];
            if child >= 0 {
                self.nodes[child as usize].fail = ROOT;
                queue.push_back(child as usize);
            }
        }

        while let Some(u) = queue.pop_front() {
            for byte in 0..ALPHABET {
                let v = self.nodes[u].children[byte];
                if v < 0 {
                    continue;
                }
                let v = v as usize;

                let mut f = self.nodes[u].fail;
                while f != ROOT && self.nodes[f].children[byte] < 0 {
                    f = self.nodes[f].fail;
                }
                let candidate = self.nodes[f].children[byte];
                let fail_target = if candidate >= 0 && candidate as usize != v {
                    candidate as usize
                } else {
                    ROOT
                };
                self.nodes[v].fail = fail_target;
                self.nodes[v].dict_suffix = if self.nodes[fail_target].output >= 0 {
                    fail_target as i32
                } else {
                    self.nodes[fail_target].dict_suffix
                };

                queue.push_back(v);
            }
        }

        self.frozen = true;
    }

    /// Scan `text`, yielding `(end_index, value)` for every registered key
    /// ending at that byte offset. Amortized O(n + m) for text length n and
    /// total match count m, independent of how many keys were registered.
    ///
    /// # Errors
    /// Returns [`ClassifyError::QueryBeforeFreeze`] if called before
    /// `freeze`.
    pub fn find(&self, text: &[u8]) -> Result<Vec<(usize, &V)>, ClassifyError> {
        if !self.frozen {
            return Err(ClassifyError::QueryBeforeFreeze);
        }
        let mut out = Vec::new();
        let mut state = ROOT;

        for (i, &byte) in text.iter().enumerate() {
            while state != ROOT && self.nodes[state].children[byte as usize] < 0 {
                state = self.nodes[state].fail;
            }
            let next = self.nodes[state].children[byte as usize];
            if next >= 0 {
                state = next as usize;
            }

            let mut cursor = state as i32;
            while cursor != ROOT as i32 {
                let node = &self.nodes[cursor as usize];
                if node.output >= 0 {
                    out.push((i, &self.values[node.output as usize]));
                }
                cursor = node.dict_suffix;
                if cursor < 0 {
                    break;
                }
            }
        }

        Ok(out)
    }

    #[must_use]
    pub const fn is_frozen(&self) -> bool {
        self.frozen
    }
}

impl<V> Default for AhoCorasick<V> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn naive_find<'a>(text: &[u8], keys: &'a [(&'a [u8], &'a str)]) -> Vec<(usize, &'a str)> {
        let mut out = Vec::new();
        for (key, value) in keys {
            if key.is_empty() {
                continue;
            }
            for start in 0..=text.len().saturating_sub(key.len()) {
                if &text[start..start + key.len()] == *key {
                    out.push((start + key.len() - 1, *value));
                }
            }
        }
        out.sort();
        out
    }

    #[test]
    fn matches_naive_reference_for_various_insertion_orders() {
        let keys: Vec<(&[u8], &str)> = vec![
            (b"he", "A"),
            (b"she", "B"),
            (b"his", "C"),
            (b"hers", "D"),
        ];
        let text = b"ushershis";

        for perm_seed in 0..keys.len() {
            let mut ac: AhoCorasick<&str> = AhoCorasick::new();
            let mut ordered = keys.clone();
            ordered.rotate_left(perm_seed);
            for (key, value) in &ordered {
                ac.add_key(key, *value).unwrap();
            }
            ac.freeze();

            let mut got: Vec<(usize, &str)> = ac
                .find(text)
                .unwrap()
                .into_iter()
                .map(|(i, v)| (i, *v))
                .collect();
            got.sort();

            let mut expected = naive_find(text, &keys);
            expected.sort();

            assert_eq!(got, expected, "insertion order rotation {perm_seed}");
        }
    }

    #[test]
    fn query_before_freeze_is_an_error() {
        let ac: AhoCorasick<&str> = AhoCorasick::new();
        assert!(matches!(ac.find(b"x"), Err(ClassifyError::QueryBeforeFreeze)));
    }

    #[test]
    fn add_key_after_freeze_is_an_error() {
        let mut ac: AhoCorasick<&str> = AhoCorasick::new();
        ac.add_key(b"a", "A").unwrap();
        ac.freeze();
        assert!(matches!(ac.add_key(b"b", "B"), Err(ClassifyError::BuildLocked)));
    }

    #[test]
    fn empty_automaton_finds_nothing() {
        let mut ac: AhoCorasick<&str> = AhoCorasick::new();
        ac.freeze();
        assert!(ac.find(b"anything").unwrap().is_empty());
    }
}
