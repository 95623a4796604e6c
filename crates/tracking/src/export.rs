//! Flat-file snapshot of tracking rows for human audit.

use crate::models::TrackingRow;
use deity_common::{Result, TableKind};
use std::path::{Path, PathBuf};
use tracing::info;

/// Location of the CSV snapshot for `table`: `<database_file>_<table>.csv`
/// next to the database.
pub fn export_path(database_file: &Path, table: TableKind) -> PathBuf {
    let name = database_file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    database_file.with_file_name(format!("{}_{}.csv", name, table.table_name()))
}

/// Write `rows` to `path`, replacing any previous snapshot.
pub fn write_csv(path: &Path, table: TableKind, rows: &[TrackingRow]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(table.columns())?;

    for row in rows {
        let old_filepath = row.old_filepath.to_string_lossy();
        let filepath = row.filepath.to_string_lossy();
        writer.write_record([
            row.identifier.as_str(),
            row.short_hash.as_str(),
            row.full_hash.as_str(),
            old_filepath.as_ref(),
            filepath.as_ref(),
        ])?;
    }

    writer.flush()?;
    info!("Exported {} row(s) to {}", rows.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_export_path() {
        assert_eq!(
            export_path(Path::new("/data/run1/deity.db"), TableKind::Specimens),
            PathBuf::from("/data/run1/deity.db_specimens.csv")
        );
        assert_eq!(
            export_path(Path::new("tracking.sqlite"), TableKind::Subjects),
            PathBuf::from("tracking.sqlite_subjects.csv")
        );
    }

    #[test]
    fn test_write_csv() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("deity.db_specimens.csv");
        let rows = vec![TrackingRow::new(
            "SHS-00-12345",
            "abcd",
            "abcdef",
            "/data/SHS-00-12345_1.jpg",
            "/data/abcd_1.jpg",
        )];

        write_csv(&path, TableKind::Specimens, &rows).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(
            lines,
            vec![
                "accession,accession_short_hash,accession_full_hash,old_filepath,filepath",
                "SHS-00-12345,abcd,abcdef,/data/SHS-00-12345_1.jpg,/data/abcd_1.jpg",
            ]
        );
    }
}
