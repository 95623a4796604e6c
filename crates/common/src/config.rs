//! Runtime configuration.
//!
//! Every component receives the configuration it needs as an explicit value.
//! Defaults match the identifier formats in use at the lab; a YAML file can
//! override any field.

use crate::hash::{check_num_chars, DEFAULT_NUM_CHARS};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// Default identifier patterns, in priority order.
pub const DEFAULT_PATTERNS: [&str; 3] = [
    r"[SL]([A-Z]?[SDFNA]?)-\d{2}-\d{5,6}",
    r"[SL][AHP]-\d{2}-\d{5,6}",
    r"[A-Z]{1,2}-?\d{2}-\d{3,6}",
];

/// Default extension filter for file enumeration.
pub const DEFAULT_EXTENSIONS: &str = "jpg,png";

/// Configuration shared by the encode and decode pipelines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeityConfig {
    /// Identifier patterns, tried in order; the first pattern that matches wins.
    pub patterns: Vec<String>,
    /// Match patterns without regard to case.
    pub case_insensitive: bool,
    /// Number of hex characters of the digest substituted into filenames.
    pub num_chars: usize,
    /// Extensions enumerated when encoding.
    pub extensions: Vec<String>,
    /// Extensions probed when a tracked file has moved to a different suffix.
    /// Empty means "same as `extensions`".
    pub alternate_extensions: Vec<String>,
}

impl Default for DeityConfig {
    fn default() -> Self {
        Self {
            patterns: DEFAULT_PATTERNS.iter().map(|p| p.to_string()).collect(),
            case_insensitive: true,
            num_chars: DEFAULT_NUM_CHARS,
            extensions: parse_extensions(DEFAULT_EXTENSIONS),
            alternate_extensions: Vec::new(),
        }
    }
}

impl DeityConfig {
    /// Load configuration from a YAML file. Missing fields take their defaults.
    pub fn from_yaml_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        let config = Self::from_yaml_str(&content)?;
        debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Parse configuration from YAML text.
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let mut config: DeityConfig = serde_yaml::from_str(content)?;
        config.extensions = normalize_extensions(&config.extensions);
        config.alternate_extensions = normalize_extensions(&config.alternate_extensions);
        config.validate()?;
        Ok(config)
    }

    /// Check the configuration for values no component can work with.
    pub fn validate(&self) -> Result<()> {
        if self.patterns.is_empty() {
            return Err(Error::Config(
                "at least one identifier pattern is required".to_string(),
            ));
        }
        check_num_chars(self.num_chars).map_err(|e| Error::Config(e.to_string()))?;
        Ok(())
    }

    /// Extensions probed during decode.
    pub fn recovery_extensions(&self) -> &[String] {
        if self.alternate_extensions.is_empty() {
            &self.extensions
        } else {
            &self.alternate_extensions
        }
    }
}

/// Split a comma-separated extension list such as `"jpg, .png,tif"`.
///
/// Leading dots and surrounding whitespace are dropped, as are empty items.
pub fn parse_extensions(list: &str) -> Vec<String> {
    list.split(',')
        .map(|ext| ext.trim().trim_start_matches('.').to_string())
        .filter(|ext| !ext.is_empty())
        .collect()
}

fn normalize_extensions(exts: &[String]) -> Vec<String> {
    exts.iter().flat_map(|e| parse_extensions(e)).collect()
}
