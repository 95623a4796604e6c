//! Tracking row model.

use serde::Serialize;
use std::path::PathBuf;

/// A persisted rename, enough to reverse it later.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrackingRow {
    /// Row id assigned by the store; `None` until the row is written.
    pub id: Option<i64>,
    /// Identifier removed from the filename.
    pub identifier: String,
    /// Digest prefix written into the filename.
    pub short_hash: String,
    /// Complete digest of the identifier.
    pub full_hash: String,
    /// Path before encoding.
    pub old_filepath: PathBuf,
    /// Path after encoding.
    pub filepath: PathBuf,
}

impl TrackingRow {
    pub fn new(
        identifier: impl Into<String>,
        short_hash: impl Into<String>,
        full_hash: impl Into<String>,
        old_filepath: impl Into<PathBuf>,
        filepath: impl Into<PathBuf>,
    ) -> Self {
        Self {
            id: None,
            identifier: identifier.into(),
            short_hash: short_hash.into(),
            full_hash: full_hash.into(),
            old_filepath: old_filepath.into(),
            filepath: filepath.into(),
        }
    }
}
