//! Input file enumeration.

use deity_common::{Error, Result};
use std::io;
use std::path::{Path, PathBuf};
use tracing::{error, info};
use walkdir::WalkDir;

/// Recursively list files under `input_dir` whose extension is in `extensions`.
///
/// Extensions are given without a leading dot. Results are sorted so the
/// same directory always yields the same plan. Finding nothing is an error.
pub fn get_file_list<S: AsRef<str>>(input_dir: &Path, extensions: &[S]) -> Result<Vec<PathBuf>> {
    if !input_dir.is_dir() {
        return Err(Error::Io(io::Error::new(
            io::ErrorKind::NotFound,
            format!("input directory {} does not exist", input_dir.display()),
        )));
    }

    let wanted: Vec<&str> = extensions
        .iter()
        .map(|e| e.as_ref().trim_start_matches('.'))
        .collect();

    let mut files = Vec::new();
    for entry in WalkDir::new(input_dir).follow_links(false) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                if err.io_error().map(|e| e.kind()) == Some(io::ErrorKind::PermissionDenied) {
                    error!("Access denied: {}", err);
                    continue;
                }
                return Err(Error::Io(err.into()));
            }
        };

        if !entry.file_type().is_file() {
            continue;
        }

        let matches = entry
            .path()
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| wanted.contains(&ext));
        if matches {
            files.push(entry.into_path());
        }
    }

    if files.is_empty() {
        return Err(Error::NoFilesFound {
            dir: input_dir.to_path_buf(),
            extensions: wanted.join(","),
        });
    }

    files.sort();
    info!("Found {} file(s) in {}", files.len(), input_dir.display());
    Ok(files)
}
