//! Encode and decode pipelines.
//!
//! Encoding records every rename in the tracking store before touching any
//! file, so the store always knows how to undo what is on disk. Decoding
//! either restores every tracked file or none of them.

use crate::executor::{check_destinations, commit, DryRunRenamer, FsRenamer, Renamer};
use crate::recovery::{find_existing_file, restore_extension};
use deity_common::hash::DEFAULT_NUM_CHARS;
use deity_common::{Error, Result, TableKind};
use deity_identifier::{plan_many, EncodePlan, IdentifierPatterns, PlanEntry, RenameOp};
use deity_tracking::{export_path, write_csv, TrackingRow, TrackingStore};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

/// Settings for one encode run.
#[derive(Debug, Clone)]
pub struct EncodeOptions {
    /// Table the renames are recorded in.
    pub table: TableKind,
    /// Digest characters substituted into each filename.
    pub num_chars: usize,
    /// Directory encoded files are moved to; their own directory if unset or missing.
    pub output_dir: Option<PathBuf>,
    /// Plan and check without writing rows or renaming files.
    pub dry_run: bool,
}

impl EncodeOptions {
    pub fn new(table: TableKind) -> Self {
        Self {
            table,
            num_chars: DEFAULT_NUM_CHARS,
            output_dir: None,
            dry_run: false,
        }
    }
}

/// Outcome of an encode run.
#[derive(Debug, Clone, Serialize)]
pub struct EncodeReport {
    pub table: TableKind,
    pub dry_run: bool,
    /// Every input file, in input order.
    pub entries: Vec<PlanEntry>,
    pub matched: usize,
    pub unmatched: usize,
    pub persisted: usize,
    pub renamed: usize,
    /// CSV snapshot written for this run.
    pub export: Option<PathBuf>,
}

/// A tracked file restored to its original name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RestoredFile {
    pub id: Option<i64>,
    pub from: PathBuf,
    pub to: PathBuf,
    /// The file was found under a different extension than recorded.
    pub extension_recovered: bool,
}

/// Outcome of a decode run.
#[derive(Debug, Clone, Serialize)]
pub struct DecodeReport {
    pub table: TableKind,
    pub dry_run: bool,
    pub restored: Vec<RestoredFile>,
    pub renamed: usize,
}

impl DecodeReport {
    pub fn recovered_count(&self) -> usize {
        self.restored.iter().filter(|r| r.extension_recovered).count()
    }
}

/// Tracking rows for every entry that carries an identifier.
pub fn tracking_rows(plan: &EncodePlan) -> Vec<TrackingRow> {
    plan.matched()
        .filter_map(|entry| {
            let identifier = entry.identifier.as_ref()?;
            let digest = entry.digest.as_ref()?;
            Some(TrackingRow::new(
                identifier.as_str(),
                digest.short.as_str(),
                digest.full.as_str(),
                entry.old_path.as_path(),
                entry.new_path.as_path(),
            ))
        })
        .collect()
}

/// Encode `paths`: plan, record the plan, then rename.
///
/// Missing sources and taken destinations are reported before anything is
/// written. A duplicate identifier stops the batch at the offending row:
/// the files whose rows were recorded ahead of it are renamed, the rest are
/// left alone, and the `DuplicateKey` error is returned.
pub fn encode_files<P: AsRef<Path>>(
    paths: &[P],
    patterns: &IdentifierPatterns,
    store: &TrackingStore,
    options: &EncodeOptions,
) -> Result<EncodeReport> {
    let table = options.table;
    info!("Encoding {} file(s) into table {}", paths.len(), table);

    let plan = plan_many(paths, patterns, options.num_chars, options.output_dir.as_deref())?;
    let rows = tracking_rows(&plan);
    let renames = plan.renames();

    let missing: Vec<PathBuf> = renames
        .iter()
        .filter(|op| !op.from.exists())
        .map(|op| op.from.clone())
        .collect();
    if !missing.is_empty() {
        error!("{} source file(s) missing, nothing encoded", missing.len());
        return Err(Error::FilesNotFound(missing));
    }
    check_destinations(&renames)?;

    let mut report = EncodeReport {
        table,
        dry_run: options.dry_run,
        matched: plan.matched_count(),
        unmatched: plan.unmatched_count(),
        entries: Vec::new(),
        persisted: 0,
        renamed: 0,
        export: None,
    };

    if options.dry_run {
        if let Some((index, reason)) = store.first_conflict(table, &rows)? {
            error!(
                "[dry run] file {} of {} would be rejected: {}",
                index + 1,
                rows.len(),
                reason
            );
            return Err(Error::DuplicateKey {
                table: table.table_name().to_string(),
                persisted: 0,
                reason,
            });
        }
        commit(&renames, &DryRunRenamer)?;
        report.entries = plan.entries;
        return Ok(report);
    }

    report.persisted = match store.persist(table, &rows) {
        Ok(persisted) => persisted,
        Err(Error::DuplicateKey {
            table: name,
            persisted,
            reason,
        }) => {
            // Keep the disk in step with the rows that did land.
            let renamed = commit(&row_renames(&rows[..persisted]), &FsRenamer)?;
            warn!(
                "Renamed {} recorded file(s) before the duplicate, {} left unchanged",
                renamed,
                rows.len() - persisted
            );
            return Err(Error::DuplicateKey {
                table: name,
                persisted,
                reason,
            });
        }
        Err(e) => return Err(e),
    };

    if report.persisted > 0 {
        if let Some(db_path) = store.path() {
            let csv_path = export_path(db_path, table);
            write_csv(&csv_path, table, &rows)?;
            report.export = Some(csv_path);
        }
    }

    report.renamed = commit(&renames, &FsRenamer)?;
    report.entries = plan.entries;

    info!(
        "Encoded {} file(s), {} left unchanged",
        report.renamed, report.unmatched
    );
    Ok(report)
}

fn row_renames(rows: &[TrackingRow]) -> Vec<RenameOp> {
    rows.iter()
        .map(|row| RenameOp {
            from: row.old_filepath.clone(),
            to: row.filepath.clone(),
        })
        .collect()
}

/// Restore every file recorded in `table` to its original name.
///
/// A file that is no longer at its recorded path is looked up under each of
/// `extensions`; when found, the restored name takes the extension the file
/// has now. If any file cannot be found, or any original name is taken,
/// nothing is renamed.
pub fn decode_all<S: AsRef<str>>(
    store: &TrackingStore,
    table: TableKind,
    extensions: &[S],
    dry_run: bool,
) -> Result<DecodeReport> {
    let rows = store.load(table)?;
    info!("Reverting {} file(s) from table {}", rows.len(), table);

    let mut restored = Vec::with_capacity(rows.len());
    let mut missing = Vec::new();

    for row in &rows {
        let found = find_existing_file(&row.filepath, extensions);
        if !found.exists() {
            missing.push(row.filepath.clone());
            continue;
        }

        let extension_recovered = found != row.filepath;
        let to = if extension_recovered {
            warn!(
                "{} has moved to {}",
                row.filepath.display(),
                found.display()
            );
            restore_extension(&row.old_filepath, &found)
        } else {
            row.old_filepath.clone()
        };

        restored.push(RestoredFile {
            id: row.id,
            from: found,
            to,
            extension_recovered,
        });
    }

    if !missing.is_empty() {
        error!(
            "{} of {} tracked file(s) not found, nothing reverted",
            missing.len(),
            rows.len()
        );
        return Err(Error::FilesNotFound(missing));
    }

    let ops: Vec<RenameOp> = restored
        .iter()
        .map(|r| RenameOp {
            from: r.from.clone(),
            to: r.to.clone(),
        })
        .collect();
    check_destinations(&ops)?;

    let renamer: &dyn Renamer = if dry_run { &DryRunRenamer } else { &FsRenamer };
    let renamed = commit(&ops, renamer)?;

    Ok(DecodeReport {
        table,
        dry_run,
        restored,
        renamed,
    })
}
