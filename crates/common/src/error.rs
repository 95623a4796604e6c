//! Common error types for deity.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Common error type for deity operations.
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid identifier pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("Duplicate key in table '{table}' after {persisted} row(s) were committed: {reason}")]
    DuplicateKey {
        table: String,
        persisted: usize,
        reason: String,
    },

    #[error("File(s) not found: {}", PathList(.0))]
    FilesNotFound(Vec<PathBuf>),

    #[error("Destination(s) already taken: {}", PathList(.0))]
    DestinationsExist(Vec<PathBuf>),

    #[error("Tracking store unavailable at {}: {reason}", .path.display())]
    StoreUnavailable { path: PathBuf, reason: String },

    #[error("Table '{table}' does not exist in the tracking store")]
    TableNotFound { table: String },

    #[error("No files with extension(s) {extensions} found in {}", .dir.display())]
    NoFilesFound { dir: PathBuf, extensions: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

/// Result type alias using common Error.
pub type Result<T> = std::result::Result<T, Error>;

impl From<anyhow::Error> for Error {
    fn from(e: anyhow::Error) -> Self {
        Error::Other(e.to_string())
    }
}

struct PathList<'a>(&'a [PathBuf]);

impl fmt::Display for PathList<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, path) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", path.display())?;
        }
        Ok(())
    }
}
