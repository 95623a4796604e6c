//! Locating tracked files whose extension changed after encoding.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Find `path` on disk, trying alternate extensions if it is gone.
///
/// Returns `path` itself when it exists, otherwise the first variant with one
/// of `extensions` that exists. If nothing is found the original `path` comes
/// back unchanged and it is up to the caller to treat it as missing.
pub fn find_existing_file<S: AsRef<str>>(path: &Path, extensions: &[S]) -> PathBuf {
    if path.exists() {
        return path.to_path_buf();
    }

    for ext in extensions {
        let ext = ext.as_ref().trim().trim_start_matches('.');
        if ext.is_empty() {
            continue;
        }
        let candidate = path.with_extension(ext);
        if candidate.exists() {
            debug!(
                "{} not found, using {}",
                path.display(),
                candidate.display()
            );
            return candidate;
        }
    }

    path.to_path_buf()
}

/// Give `original` the extension of the file that was actually found.
pub fn restore_extension(original: &Path, found: &Path) -> PathBuf {
    if original.extension() == found.extension() {
        return original.to_path_buf();
    }
    original.with_extension(found.extension().unwrap_or(OsStr::new("")))
}
