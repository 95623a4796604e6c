//! Rename planning.

use crate::patterns::IdentifierPatterns;
use deity_common::hash::{self, Digest};
use deity_common::Result;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::debug;

/// A proposed rename with the identifier and digest that justify it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlanEntry {
    /// Identifier found in the filename, if any.
    pub identifier: Option<String>,
    /// Path of the file as it exists now.
    pub old_path: PathBuf,
    /// Path the file will have after encoding.
    pub new_path: PathBuf,
    /// Digest of the identifier.
    pub digest: Option<Digest>,
}

impl PlanEntry {
    fn unchanged(path: &Path) -> Self {
        Self {
            identifier: None,
            old_path: path.to_path_buf(),
            new_path: path.to_path_buf(),
            digest: None,
        }
    }

    /// True when the file keeps its name.
    pub fn is_noop(&self) -> bool {
        self.identifier.is_none()
    }

    pub fn full_digest(&self) -> Option<&str> {
        self.digest.as_ref().map(|d| d.full.as_str())
    }

    pub fn short_digest(&self) -> Option<&str> {
        self.digest.as_ref().map(|d| d.short.as_str())
    }

    /// The filesystem operation this entry calls for, if any.
    pub fn rename_op(&self) -> Option<RenameOp> {
        if self.is_noop() || self.old_path == self.new_path {
            return None;
        }
        Some(RenameOp {
            from: self.old_path.clone(),
            to: self.new_path.clone(),
        })
    }
}

/// A single file rename.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenameOp {
    pub from: PathBuf,
    pub to: PathBuf,
}

/// Plan for a batch of files, in input order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct EncodePlan {
    pub entries: Vec<PlanEntry>,
}

impl EncodePlan {
    /// Entries whose filename carries an identifier.
    pub fn matched(&self) -> impl Iterator<Item = &PlanEntry> {
        self.entries.iter().filter(|e| !e.is_noop())
    }

    /// Renames to perform, skipping no-op entries.
    pub fn renames(&self) -> Vec<RenameOp> {
        self.entries.iter().filter_map(PlanEntry::rename_op).collect()
    }

    pub fn matched_count(&self) -> usize {
        self.matched().count()
    }

    pub fn unmatched_count(&self) -> usize {
        self.entries.len() - self.matched_count()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Plan the encoded name of one file.
///
/// The new name is the old name with the matched identifier replaced by the
/// short digest; every other character is kept. The file lands in
/// `output_dir` when that directory exists, otherwise next to the original.
/// A name without an identifier yields an entry whose new path is the old
/// path.
pub fn plan_one(
    path: &Path,
    patterns: &IdentifierPatterns,
    num_chars: usize,
    output_dir: Option<&Path>,
) -> Result<PlanEntry> {
    let Some(filename) = path.file_name().and_then(|n| n.to_str()) else {
        debug!("Skipping path without a UTF-8 file name: {:?}", path);
        return Ok(PlanEntry::unchanged(path));
    };

    let Some(found) = patterns.find(filename) else {
        debug!("No identifier in {}", filename);
        return Ok(PlanEntry::unchanged(path));
    };

    let digest = hash::encode(&found.identifier, num_chars)?;

    let mut new_filename = filename.to_string();
    new_filename.replace_range(found.start..found.end, &digest.short);

    let target_dir = match output_dir {
        Some(dir) if dir.is_dir() => dir.to_path_buf(),
        _ => path.parent().map(Path::to_path_buf).unwrap_or_default(),
    };

    Ok(PlanEntry {
        identifier: Some(found.identifier),
        old_path: path.to_path_buf(),
        new_path: target_dir.join(new_filename),
        digest: Some(digest),
    })
}

/// Plan every path, preserving input order.
pub fn plan_many<P: AsRef<Path>>(
    paths: &[P],
    patterns: &IdentifierPatterns,
    num_chars: usize,
    output_dir: Option<&Path>,
) -> Result<EncodePlan> {
    let entries = paths
        .iter()
        .map(|p| plan_one(p.as_ref(), patterns, num_chars, output_dir))
        .collect::<Result<Vec<_>>>()?;

    let plan = EncodePlan { entries };
    debug!(
        "Planned {} file(s): {} with identifiers, {} unchanged",
        plan.entries.len(),
        plan.matched_count(),
        plan.unmatched_count()
    );
    Ok(plan)
}
