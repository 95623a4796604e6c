//! Tracking table definitions.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Domain table a batch of identifiers is recorded in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TableKind {
    /// Specimen accession numbers.
    Specimens,
    /// Subject medical record numbers.
    Subjects,
}

impl TableKind {
    /// Name of the table in the tracking store.
    pub fn table_name(&self) -> &'static str {
        match self {
            TableKind::Specimens => "specimens",
            TableKind::Subjects => "subjects",
        }
    }

    /// Column holding the original identifier.
    pub fn id_column(&self) -> &'static str {
        match self {
            TableKind::Specimens => "accession",
            TableKind::Subjects => "mrn",
        }
    }

    /// Column holding the short digest.
    pub fn short_hash_column(&self) -> String {
        format!("{}_short_hash", self.id_column())
    }

    /// Column holding the full digest.
    pub fn full_hash_column(&self) -> String {
        format!("{}_full_hash", self.id_column())
    }

    /// Record columns in export order.
    pub fn columns(&self) -> [String; 5] {
        [
            self.id_column().to_string(),
            self.short_hash_column(),
            self.full_hash_column(),
            "old_filepath".to_string(),
            "filepath".to_string(),
        ]
    }
}

impl fmt::Display for TableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.table_name())
    }
}

impl FromStr for TableKind {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "specimens" => Ok(TableKind::Specimens),
            "subjects" => Ok(TableKind::Subjects),
            _ => Err(crate::Error::Config(format!(
                "unknown table '{}', expected 'specimens' or 'subjects'",
                s
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_table_kind() {
        assert_eq!(TableKind::from_str("specimens").unwrap(), TableKind::Specimens);
        assert_eq!(TableKind::from_str("Specimens").unwrap(), TableKind::Specimens);
        assert_eq!(TableKind::from_str("SUBJECTS").unwrap(), TableKind::Subjects);
        assert!(TableKind::from_str("patients").is_err());
    }

    #[test]
    fn test_column_names() {
        assert_eq!(TableKind::Specimens.id_column(), "accession");
        assert_eq!(TableKind::Specimens.short_hash_column(), "accession_short_hash");
        assert_eq!(TableKind::Subjects.full_hash_column(), "mrn_full_hash");
        assert_eq!(
            TableKind::Subjects.columns(),
            [
                "mrn".to_string(),
                "mrn_short_hash".to_string(),
                "mrn_full_hash".to_string(),
                "old_filepath".to_string(),
                "filepath".to_string(),
            ]
        );
    }

    #[test]
    fn test_display_table_kind() {
        assert_eq!(TableKind::Specimens.to_string(), "specimens");
        assert_eq!(TableKind::Subjects.to_string(), "subjects");
    }
}
