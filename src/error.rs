//! Error types for scanning, rule compilation and classification.
//!
//! These are hand-rolled `enum`s implementing [`std::error::Error`] directly
//! rather than pulling in a helper crate; the set of failure modes is small
//! and closed, so a derive macro buys nothing here.

use std::fmt;
use std::io;
use std::path::PathBuf;

/// Errors returned by [`crate::walk::scan`].
#[derive(Debug)]
pub enum ScanError {
    /// The root path supplied to `scan` does not exist.
    RootNotFound(PathBuf),
    /// The root path exists but is not a directory.
    RootNotDirectory(PathBuf),
    /// The root path could not be canonicalised or its metadata read.
    RootUnreadable(PathBuf, io::Error),
}

impl fmt::Display for ScanError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RootNotFound(path) => {
                write!(f, "root path does not exist: {}", path.display())
            }
            Self::RootNotDirectory(path) => {
                write!(f, "root path is not a directory: {}", path.display())
            }
            Self::RootUnreadable(path, err) => {
                write!(f, "could not read root path {}: {err}", path.display())
            }
        }
    }
}

impl std::error::Error for ScanError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::RootUnreadable(_, err) => Some(err),
            Self::RootNotFound(_) | Self::RootNotDirectory(_) => None,
        }
    }
}

/// Errors returned when building or querying the Aho-Corasick automaton or
/// prefix trie used by the rule compiler.
#[derive(Debug)]
pub enum ClassifyError {
    /// An `add_key` call arrived after the structure was frozen.
    BuildLocked,
    /// A `find` call arrived before the structure was frozen.
    QueryBeforeFreeze,
}

impl fmt::Display for ClassifyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BuildLocked => write!(f, "cannot add a key after the structure is frozen"),
            Self::QueryBeforeFreeze => write!(f, "cannot query a structure before it is frozen"),
        }
    }
}

impl std::error::Error for ClassifyError {}

/// Errors returned when compiling a [`crate::model::PatternRule`] list into a
/// [`crate::classify::CompiledRuleSet`].
#[derive(Debug)]
pub enum CompileError {
    /// A glob pattern failed to parse.
    InvalidGlob { pattern: String, reason: String },
    /// A `{a,b,c}` alternation was left unclosed.
    UnclosedAlternation { pattern: String },
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidGlob { pattern, reason } => {
                write!(f, "invalid glob pattern {pattern:?}: {reason}")
            }
            Self::UnclosedAlternation { pattern } => {
                write!(f, "unclosed {{...}} alternation in pattern {pattern:?}")
            }
        }
    }
}

impl std::error::Error for CompileError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scan_error_displays_path() {
        let err = ScanError::RootNotFound(PathBuf::from("/does/not/exist"));
        assert!(err.to_string().contains("/does/not/exist"));
    }

    #[test]
    fn classify_error_messages_are_distinct() {
        assert_ne!(
            ClassifyError::BuildLocked.to_string(),
            ClassifyError::QueryBeforeFreeze.to_string()
        );
    }
}
