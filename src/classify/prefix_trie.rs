//! A from-scratch 256-wide prefix trie.
//!
//! Used for the `STARTSWITH` tier of the rule compiler: one structure
//! answers "which registered prefixes does this basename start with" in a
//! single walk, worst case O(min(text length, longest key)).

use crate::error::ClassifyError;

const ALPHABET: usize = 256;
const ROOT: usize = 0;

struct Node {
    children: [i32; ALPHABET],
    output: i32,
}

impl Node {
    fn new() -> Self {
        Self {
            children: [-1; ALPHABET],
            output: -1,
        }
    }
}

pub struct PrefixTrie<V> {
    nodes: Vec<Node>,
    values: Vec<V>,
    frozen: bool,
}

impl<V> PrefixTrie<V> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            nodes: vec![Node::new()],
            values: Vec::new(),
            frozen: false,
        }
    }

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

    pub fn freeze(&mut self) {
        self.frozen = true;
    }

    /// Yield every registered key's value where `text` starts with that
    /// key, in order of increasing key length.
    ///
    /// # Errors
    /// Returns [`ClassifyError::QueryBeforeFreeze`] if called before
    /// `freeze`.
    pub fn find(&self, text: &[u8]) -> Result<Vec<&V>, ClassifyError> {
        if !self.frozen {
            return Err(ClassifyError::QueryBeforeFreeze);
        }
        let mut out = Vec::new();
        let mut state = ROOT;
        for &byte in text {
            if self.nodes[state].output >= 0 {
                out.push(&self.values[self.nodes[state].output as usize]);
            }
            let next = self.nodes[state].children[byte as usize];
            match next {
                n if n >= 0 => state = n as usize,
                _ => return Ok(out),
            }
        }
        if self.nodes[state].output >= 0 {
            out.push(&self.values[self.nodes[state].output as usize]);
        }
        Ok(out)
    }

    #[must_use]
    pub const fn is_frozen(&self) -> bool {
        self.frozen
    }
}

impl<V> Default for PrefixTrie<V> {
    fn default() -> Self {
        Self::new()
    }
}
