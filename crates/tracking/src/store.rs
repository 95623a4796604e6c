//! SQLite-backed tracking store.

use crate::models::TrackingRow;
use deity_common::{Error, Result, TableKind};
use rusqlite::{params, Connection, ErrorCode, OpenFlags, OptionalExtension};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info};

/// Connection to the tracking database for one invocation.
///
/// The connection is released when the store is dropped; `close` does the
/// same while reporting any error from SQLite.
pub struct TrackingStore {
    conn: Connection,
    path: Option<PathBuf>,
}

impl TrackingStore {
    /// Open the database at `path`, creating it if needed.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path).map_err(|e| unavailable(path, e))?;
        Self::init(conn, Some(path.to_path_buf()))
    }

    /// Open an existing database without creating one.
    pub fn open_existing(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(Error::StoreUnavailable {
                path: path.to_path_buf(),
                reason: "database file does not exist".to_string(),
            });
        }
        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_URI
            | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        let conn = Connection::open_with_flags(path, flags).map_err(|e| unavailable(path, e))?;
        Self::init(conn, Some(path.to_path_buf()))
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|e| Error::StoreUnavailable {
            path: PathBuf::from(":memory:"),
            reason: e.to_string(),
        })?;
        Self::init(conn, None)
    }

    fn init(conn: Connection, path: Option<PathBuf>) -> Result<Self> {
        // Rows must be on disk before any file is renamed.
        conn.execute_batch(
            "PRAGMA synchronous = FULL;
             PRAGMA busy_timeout = 5000;",
        )
        .map_err(|e| Error::StoreUnavailable {
            path: path.clone().unwrap_or_else(|| PathBuf::from(":memory:")),
            reason: e.to_string(),
        })?;
        if let Some(ref p) = path {
            debug!("Tracking store opened at {}", p.display());
        }
        Ok(Self { conn, path })
    }

    /// Database file, or `None` for an in-memory store.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn table_exists(&self, table: TableKind) -> Result<bool> {
        let found: Option<String> = self
            .conn
            .query_row(
                "SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?1",
                params![table.table_name()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    fn create_table(&self, table: TableKind) -> Result<()> {
        let id = table.id_column();
        self.conn.execute_batch(&format!(
            "CREATE TABLE IF NOT EXISTS {table} (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                {id} TEXT NOT NULL UNIQUE,
                {short} TEXT NOT NULL UNIQUE,
                {full} TEXT NOT NULL UNIQUE,
                old_filepath TEXT NOT NULL,
                filepath TEXT NOT NULL
            );",
            table = table.table_name(),
            id = id,
            short = table.short_hash_column(),
            full = table.full_hash_column(),
        ))?;
        Ok(())
    }

    /// Append rows to `table`, creating it on the first non-empty write.
    ///
    /// Rows are inserted in order and each one is committed as it lands. A
    /// uniqueness violation stops the batch with `DuplicateKey`; rows written
    /// before it stay in the table. An empty batch does nothing.
    pub fn persist(&self, table: TableKind, rows: &[TrackingRow]) -> Result<usize> {
        if rows.is_empty() {
            debug!("No rows to persist in {}", table);
            return Ok(0);
        }

        self.create_table(table)?;

        let sql = format!(
            "INSERT INTO {} ({}, {}, {}, old_filepath, filepath) VALUES (?1, ?2, ?3, ?4, ?5)",
            table.table_name(),
            table.id_column(),
            table.short_hash_column(),
            table.full_hash_column(),
        );
        let mut stmt = self.conn.prepare(&sql)?;

        for (persisted, row) in rows.iter().enumerate() {
            let old_filepath = path_text(&row.old_filepath)?;
            let filepath = path_text(&row.filepath)?;

            let result = stmt.execute(params![
                row.identifier,
                row.short_hash,
                row.full_hash,
                old_filepath,
                filepath
            ]);

            match result {
                Ok(_) => debug!("Recorded {} -> {}", old_filepath, filepath),
                Err(e) if e.sqlite_error_code() == Some(ErrorCode::ConstraintViolation) => {
                    error!(
                        "Duplicate identifier '{}' for {} in {}: {}",
                        row.identifier, old_filepath, table, e
                    );
                    return Err(Error::DuplicateKey {
                        table: table.table_name().to_string(),
                        persisted,
                        reason: e.to_string(),
                    });
                }
                Err(e) => {
                    error!("Failed to record {} in {}: {}", old_filepath, table, e);
                    return Err(e.into());
                }
            }
        }

        info!("Recorded {} row(s) in {}", rows.len(), table);
        Ok(rows.len())
    }

    /// Index and reason for the first row that `persist` would reject.
    ///
    /// A row conflicts when its identifier or either digest is already in
    /// `table` or repeats a row ahead of it in `rows`. Nothing is written.
    pub fn first_conflict(
        &self,
        table: TableKind,
        rows: &[TrackingRow],
    ) -> Result<Option<(usize, String)>> {
        let mut stmt = if self.table_exists(table)? {
            Some(self.conn.prepare(&format!(
                "SELECT {id} FROM {table} WHERE {id} = ?1 OR {short} = ?2 OR {full} = ?3 LIMIT 1",
                table = table.table_name(),
                id = table.id_column(),
                short = table.short_hash_column(),
                full = table.full_hash_column(),
            ))?)
        } else {
            None
        };

        let mut identifiers = HashSet::new();
        let mut short_hashes = HashSet::new();
        let mut full_hashes = HashSet::new();

        for (index, row) in rows.iter().enumerate() {
            let repeated = !identifiers.insert(row.identifier.as_str())
                | !short_hashes.insert(row.short_hash.as_str())
                | !full_hashes.insert(row.full_hash.as_str());
            if repeated {
                return Ok(Some((
                    index,
                    format!("'{}' repeats an earlier file in the batch", row.identifier),
                )));
            }

            if let Some(stmt) = stmt.as_mut() {
                let recorded: Option<String> = stmt
                    .query_row(
                        params![row.identifier, row.short_hash, row.full_hash],
                        |r| r.get(0),
                    )
                    .optional()?;
                if let Some(recorded) = recorded {
                    return Ok(Some((
                        index,
                        format!(
                            "'{}' collides with '{}' already recorded in {}",
                            row.identifier, recorded, table
                        ),
                    )));
                }
            }
        }
        Ok(None)
    }

    /// Read every row of `table` in insertion order.
    pub fn load(&self, table: TableKind) -> Result<Vec<TrackingRow>> {
        if !self.table_exists(table)? {
            return Err(Error::TableNotFound {
                table: table.table_name().to_string(),
            });
        }

        let sql = format!(
            "SELECT id, {}, {}, {}, old_filepath, filepath FROM {} ORDER BY id",
            table.id_column(),
            table.short_hash_column(),
            table.full_hash_column(),
            table.table_name(),
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map([], |row| {
                Ok(TrackingRow {
                    id: Some(row.get(0)?),
                    identifier: row.get(1)?,
                    short_hash: row.get(2)?,
                    full_hash: row.get(3)?,
                    old_filepath: PathBuf::from(row.get::<_, String>(4)?),
                    filepath: PathBuf::from(row.get::<_, String>(5)?),
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        debug!("Loaded {} row(s) from {}", rows.len(), table);
        Ok(rows)
    }

    /// Number of rows in `table`, zero if it does not exist yet.
    pub fn row_count(&self, table: TableKind) -> Result<usize> {
        if !self.table_exists(table)? {
            return Ok(0);
        }
        let count: i64 = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", table.table_name()),
            [],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    /// Close the connection, surfacing any error SQLite reports.
    pub fn close(self) -> Result<()> {
        self.conn.close().map_err(|(_, e)| {
            error!("Failed to close tracking store: {}", e);
            Error::Database(e)
        })
    }
}

fn unavailable(path: &Path, e: rusqlite::Error) -> Error {
    error!("Cannot open tracking store {}: {}", path.display(), e);
    Error::StoreUnavailable {
        path: path.to_path_buf(),
        reason: e.to_string(),
    }
}

fn path_text(path: &Path) -> Result<&str> {
    path.to_str().ok_or_else(|| {
        Error::InvalidInput(format!("path is not valid UTF-8: {:?}", path))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn row(id: &str, short: &str, full: &str, n: u32) -> TrackingRow {
        TrackingRow::new(
            id,
            short,
            full,
            format!("/data/{}_{}.jpg", id, n),
            format!("/data/{}_{}.jpg", short, n),
        )
    }

    #[test]
    fn test_persist_and_load() {
        let store = TrackingStore::open_in_memory().unwrap();
        let rows = vec![
            row("SHS-00-12345", "short1", "full1", 1),
            row("SHS-99-54321", "short2", "full2", 2),
        ];

        assert_eq!(store.persist(TableKind::Specimens, &rows).unwrap(), 2);

        let loaded = store.load(TableKind::Specimens).unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].id, Some(1));
        assert_eq!(loaded[1].id, Some(2));
        assert_eq!(loaded[0].identifier, "SHS-00-12345");
        assert_eq!(loaded[1].filepath, PathBuf::from("/data/short2_2.jpg"));
        assert_eq!(loaded[1].old_filepath, PathBuf::from("/data/SHS-99-54321_2.jpg"));
    }

    #[test]
    fn test_subject_table_uses_mrn_columns() {
        let store = TrackingStore::open_in_memory().unwrap();
        store
            .persist(TableKind::Subjects, &[row("MR-12-3456", "s", "f", 1)])
            .unwrap();

        let mrn: String = store
            .conn
            .query_row(
                "SELECT mrn FROM subjects WHERE mrn_short_hash = 's' AND mrn_full_hash = 'f'",
                [],
                |r| r.get(0),
            )
            .unwrap();
        assert_eq!(mrn, "MR-12-3456");
        assert!(!store.table_exists(TableKind::Specimens).unwrap());
    }

    #[test]
    fn test_empty_persist_does_not_create_table() {
        let store = TrackingStore::open_in_memory().unwrap();
        assert_eq!(store.persist(TableKind::Specimens, &[]).unwrap(), 0);
        assert!(!store.table_exists(TableKind::Specimens).unwrap());
    }

    #[test]
    fn test_appends_across_calls() {
        let store = TrackingStore::open_in_memory().unwrap();
        store
            .persist(TableKind::Specimens, &[row("SHS-00-00001", "a", "aa", 1)])
            .unwrap();
        store
            .persist(TableKind::Specimens, &[row("SHS-00-00002", "b", "bb", 2)])
            .unwrap();
        assert_eq!(store.row_count(TableKind::Specimens).unwrap(), 2);
    }

    #[test]
    fn test_duplicate_identifier_is_rejected() {
        let store = TrackingStore::open_in_memory().unwrap();
        let rows = vec![
            row("SHS-99-54321", "dup", "dupfull", 1),
            row("SHS-99-54321", "dup", "dupfull", 2),
        ];

        let err = store.persist(TableKind::Specimens, &rows).unwrap_err();
        match err {
            Error::DuplicateKey {
                table, persisted, ..
            } => {
                assert_eq!(table, "specimens");
                assert_eq!(persisted, 1);
            }
            other => panic!("expected DuplicateKey, got {:?}", other),
        }

        let loaded = store.load(TableKind::Specimens).unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].old_filepath, PathBuf::from("/data/SHS-99-54321_1.jpg"));
    }

    #[test]
    fn test_reencoding_same_identifier_later_is_rejected() {
        let store = TrackingStore::open_in_memory().unwrap();
        store
            .persist(TableKind::Specimens, &[row("SHS-00-12345", "x", "xx", 1)])
            .unwrap();
        let err = store
            .persist(TableKind::Specimens, &[row("SHS-00-12345", "x", "xx", 2)])
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateKey { persisted: 0, .. }));
    }

    #[test]
    fn test_first_conflict_within_batch() {
        let store = TrackingStore::open_in_memory().unwrap();
        let rows = vec![
            row("SHS-00-12345", "a", "aa", 1),
            row("SHS-99-54321", "b", "bb", 2),
            row("SHS-99-54321", "b", "bb", 3),
        ];

        let (index, reason) = store
            .first_conflict(TableKind::Specimens, &rows)
            .unwrap()
            .unwrap();
        assert_eq!(index, 2);
        assert!(reason.contains("SHS-99-54321"));
        assert!(!store.table_exists(TableKind::Specimens).unwrap());
    }

    #[test]
    fn test_first_conflict_against_recorded_rows() {
        let store = TrackingStore::open_in_memory().unwrap();
        store
            .persist(TableKind::Specimens, &[row("SHS-00-11111", "x", "xx", 1)])
            .unwrap();

        let clean = [row("SHS-00-22222", "y", "yy", 2)];
        assert_eq!(store.first_conflict(TableKind::Specimens, &clean).unwrap(), None);

        let rows = [
            row("SHS-00-22222", "y", "yy", 2),
            row("SHS-00-11111", "x", "xx", 3),
        ];
        let (index, reason) = store
            .first_conflict(TableKind::Specimens, &rows)
            .unwrap()
            .unwrap();
        assert_eq!(index, 1);
        assert!(reason.contains("already recorded"));
        assert_eq!(store.row_count(TableKind::Specimens).unwrap(), 1);
    }

    #[test]
    fn test_load_missing_table() {
        let store = TrackingStore::open_in_memory().unwrap();
        assert!(matches!(
            store.load(TableKind::Subjects),
            Err(Error::TableNotFound { .. })
        ));
        assert_eq!(store.row_count(TableKind::Subjects).unwrap(), 0);
    }

    #[test]
    fn test_open_existing_requires_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.db");
        assert!(matches!(
            TrackingStore::open_existing(&path),
            Err(Error::StoreUnavailable { .. })
        ));
        assert!(!path.exists());
    }

    #[test]
    fn test_rows_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("deity.db");

        let store = TrackingStore::open(&path).unwrap();
        store
            .persist(TableKind::Specimens, &[row("SHS-00-12345", "s", "f", 1)])
            .unwrap();
        store.close().unwrap();

        let store = TrackingStore::open_existing(&path).unwrap();
        assert_eq!(store.path(), Some(path.as_path()));
        assert_eq!(store.load(TableKind::Specimens).unwrap().len(), 1);
    }
}
