//! Filesystem renames for the encode and decode directions.

use deity_common::{Error, Result};
use deity_identifier::RenameOp;
use std::collections::HashSet;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info};

/// Trait for performing renames.
pub trait Renamer {
    /// Move `from` to `to`.
    fn rename(&self, from: &Path, to: &Path) -> io::Result<()>;

    /// True if nothing on disk is changed.
    fn is_dry_run(&self) -> bool {
        false
    }
}

/// Renames files on the local filesystem.
///
/// An existing file at the destination is never replaced.
pub struct FsRenamer;

impl Renamer for FsRenamer {
    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        if to.exists() {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("destination {} already exists", to.display()),
            ));
        }
        std::fs::rename(from, to)?;
        debug!("Renamed {} -> {}", from.display(), to.display());
        Ok(())
    }
}

/// Applies the same checks as [`FsRenamer`] and logs the rename instead of
/// doing it.
pub struct DryRunRenamer;

impl Renamer for DryRunRenamer {
    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        if !from.exists() {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("{} not found", from.display()),
            ));
        }
        if to.exists() {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("destination {} already exists", to.display()),
            ));
        }
        info!("[dry run] {} -> {}", from.display(), to.display());
        Ok(())
    }

    fn is_dry_run(&self) -> bool {
        true
    }
}

/// Fail with every destination in `renames` that is already on disk or is
/// claimed by an earlier rename in the same batch.
pub fn check_destinations(renames: &[RenameOp]) -> Result<()> {
    let mut claimed = HashSet::new();
    let mut taken: Vec<PathBuf> = Vec::new();

    for op in renames.iter().filter(|op| op.from != op.to) {
        if (op.to.exists() || !claimed.insert(op.to.as_path())) && !taken.contains(&op.to) {
            taken.push(op.to.clone());
        }
    }

    if taken.is_empty() {
        return Ok(());
    }
    error!("{} destination(s) already taken, nothing renamed", taken.len());
    Err(Error::DestinationsExist(taken))
}

/// Perform `renames` in order and return how many were carried out.
///
/// Sources that turn out to be missing are collected and reported together
/// once every other rename has been attempted. Any other I/O failure stops
/// the batch immediately.
pub fn commit(renames: &[RenameOp], renamer: &dyn Renamer) -> Result<usize> {
    let mut missing = Vec::new();
    let mut renamed = 0;

    for (i, op) in renames.iter().enumerate() {
        if op.from == op.to {
            continue;
        }
        match renamer.rename(&op.from, &op.to) {
            Ok(()) => renamed += 1,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                error!(
                    "File {} of {} not found: {}",
                    i + 1,
                    renames.len(),
                    op.from.display()
                );
                missing.push(op.from.clone());
            }
            Err(e) => {
                error!(
                    "Failed to rename file {} of {} ({}): {}",
                    i + 1,
                    renames.len(),
                    op.from.display(),
                    e
                );
                return Err(Error::Io(e));
            }
        }
    }

    if !missing.is_empty() {
        return Err(Error::FilesNotFound(missing));
    }

    if !renamer.is_dry_run() {
        info!("Renamed {} file(s)", renamed);
    }
    Ok(renamed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn op(from: PathBuf, to: PathBuf) -> RenameOp {
        RenameOp { from, to }
    }

    #[test]
    fn test_commit_renames_files() {
        let dir = tempdir().unwrap();
        let a = dir.path().join("SHS-00-11111.jpg");
        let b = dir.path().join("SHS-00-22222.jpg");
        fs::write(&a, b"a").unwrap();
        fs::write(&b, b"b").unwrap();

        let ops = vec![
            op(a.clone(), dir.path().join("aaaa.jpg")),
            op(b.clone(), dir.path().join("bbbb.jpg")),
        ];
        assert_eq!(commit(&ops, &FsRenamer).unwrap(), 2);

        assert!(!a.exists());
        assert!(!b.exists());
        assert_eq!(fs::read(dir.path().join("aaaa.jpg")).unwrap(), b"a");
        assert_eq!(fs::read(dir.path().join("bbbb.jpg")).unwrap(), b"b");
    }

    #[test]
    fn test_commit_collects_every_missing_file() {
        let dir = tempdir().unwrap();
        let present = dir.path().join("present.jpg");
        fs::write(&present, b"x").unwrap();
        let gone1 = dir.path().join("gone1.jpg");
        let gone2 = dir.path().join("gone2.jpg");

        let ops = vec![
            op(gone1.clone(), dir.path().join("n1.jpg")),
            op(present.clone(), dir.path().join("n2.jpg")),
            op(gone2.clone(), dir.path().join("n3.jpg")),
        ];

        match commit(&ops, &FsRenamer).unwrap_err() {
            Error::FilesNotFound(paths) => assert_eq!(paths, vec![gone1, gone2]),
            other => panic!("expected FilesNotFound, got {:?}", other),
        }
        assert!(dir.path().join("n2.jpg").exists());
    }

    #[test]
    fn test_fs_renamer_refuses_to_overwrite() {
        let dir = tempdir().unwrap();
        let from = dir.path().join("from.jpg");
        let to = dir.path().join("to.jpg");
        fs::write(&from, b"from").unwrap();
        fs::write(&to, b"to").unwrap();

        let err = commit(&[op(from.clone(), to.clone())], &FsRenamer).unwrap_err();
        assert!(matches!(err, Error::Io(ref e) if e.kind() == io::ErrorKind::AlreadyExists));
        assert_eq!(fs::read(&to).unwrap(), b"to");
        assert!(from.exists());
    }

    #[test]
    fn test_dry_run_changes_nothing() {
        let dir = tempdir().unwrap();
        let from = dir.path().join("SHS-00-11111.jpg");
        fs::write(&from, b"x").unwrap();
        let to = dir.path().join("new.jpg");

        assert_eq!(commit(&[op(from.clone(), to.clone())], &DryRunRenamer).unwrap(), 1);
        assert!(from.exists());
        assert!(!to.exists());
    }

    #[test]
    fn test_dry_run_refuses_an_existing_destination() {
        let dir = tempdir().unwrap();
        let from = dir.path().join("SHS-00-11111.jpg");
        let to = dir.path().join("taken.jpg");
        fs::write(&from, b"from").unwrap();
        fs::write(&to, b"to").unwrap();

        let err = commit(&[op(from.clone(), to.clone())], &DryRunRenamer).unwrap_err();
        assert!(matches!(err, Error::Io(ref e) if e.kind() == io::ErrorKind::AlreadyExists));
        assert_eq!(fs::read(&to).unwrap(), b"to");
        assert!(from.exists());
    }

    #[test]
    fn test_check_destinations_reports_every_collision() {
        let dir = tempdir().unwrap();
        let taken = dir.path().join("taken.jpg");
        fs::write(&taken, b"x").unwrap();
        let shared = dir.path().join("shared.jpg");

        let ops = vec![
            op(dir.path().join("a.jpg"), taken.clone()),
            op(dir.path().join("b.jpg"), shared.clone()),
            op(dir.path().join("c.jpg"), dir.path().join("free.jpg")),
            op(dir.path().join("d.jpg"), shared.clone()),
        ];

        match check_destinations(&ops).unwrap_err() {
            Error::DestinationsExist(paths) => assert_eq!(paths, vec![taken, shared]),
            other => panic!("expected DestinationsExist, got {:?}", other),
        }
    }

    #[test]
    fn test_check_destinations_ignores_noop_ops() {
        let dir = tempdir().unwrap();
        let same = dir.path().join("same.jpg");
        fs::write(&same, b"x").unwrap();

        check_destinations(&[op(same.clone(), same)]).unwrap();
        check_destinations(&[]).unwrap();
    }

    #[test]
    fn test_noop_ops_are_skipped() {
        let path = PathBuf::from("/does/not/exist.jpg");
        assert_eq!(commit(&[op(path.clone(), path)], &FsRenamer).unwrap(), 0);
    }
}
