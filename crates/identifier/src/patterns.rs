//! Ordered identifier patterns.

use deity_common::config::DEFAULT_PATTERNS;
use deity_common::{Error, Result};
use regex::{Regex, RegexBuilder};
use std::sync::LazyLock;
use tracing::trace;

/// The default pattern set, compiled case-insensitively.
pub static DEFAULT_PATTERN_SET: LazyLock<IdentifierPatterns> = LazyLock::new(|| {
    let patterns: Vec<String> = DEFAULT_PATTERNS.iter().map(|p| p.to_string()).collect();
    IdentifierPatterns::compile(&patterns, true).unwrap()
});

/// An identifier located in a filename.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentifierMatch {
    /// The matched text, exactly as it appears in the filename.
    pub identifier: String,
    /// Byte offset where the identifier starts.
    pub start: usize,
    /// Byte offset one past the end of the identifier.
    pub end: usize,
    /// Position of the winning pattern in the set.
    pub pattern_index: usize,
}

/// Compiled identifier patterns, tried strictly in order.
#[derive(Debug, Clone)]
pub struct IdentifierPatterns {
    patterns: Vec<Regex>,
    case_insensitive: bool,
}

impl IdentifierPatterns {
    /// Compile patterns in priority order.
    pub fn compile(patterns: &[String], case_insensitive: bool) -> Result<Self> {
        let patterns = patterns
            .iter()
            .map(|p| {
                RegexBuilder::new(p)
                    .case_insensitive(case_insensitive)
                    .build()
                    .map_err(|e| Error::InvalidPattern {
                        pattern: p.clone(),
                        reason: e.to_string(),
                    })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            patterns,
            case_insensitive,
        })
    }

    /// Find the identifier in a filename.
    ///
    /// The first pattern that matches anywhere in the name wins, and its
    /// leftmost match is returned. Later patterns are not consulted even if
    /// they would match earlier in the name.
    pub fn find(&self, filename: &str) -> Option<IdentifierMatch> {
        self.patterns
            .iter()
            .enumerate()
            .find_map(|(pattern_index, pattern)| {
                pattern.find(filename).map(|mat| IdentifierMatch {
                    identifier: mat.as_str().to_string(),
                    start: mat.start(),
                    end: mat.end(),
                    pattern_index,
                })
            })
            .inspect(|found| {
                trace!(
                    "Pattern {} matched '{}' in {}",
                    found.pattern_index,
                    found.identifier,
                    filename
                )
            })
    }

    /// Pattern sources in priority order.
    pub fn sources(&self) -> Vec<&str> {
        self.patterns.iter().map(|p| p.as_str()).collect()
    }

    /// Whether the patterns were compiled to ignore case.
    pub fn is_case_insensitive(&self) -> bool {
        self.case_insensitive
    }

    /// Number of compiled patterns.
    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    /// True if there are no patterns, in which case nothing ever matches.
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

impl Default for IdentifierPatterns {
    fn default() -> Self {
        DEFAULT_PATTERN_SET.clone()
    }
}
