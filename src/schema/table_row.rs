//! Untyped table rows and row-level validation issues

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

use crate::error::ComputeError;

/// One table row, keyed by column name
pub type TableRow = serde_json::Map<String, serde_json::Value>;

/// Supported table encodings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TableFormat {
    /// Comma-separated values with a header row
    Csv,
    /// JSON array of row objects
    Json,
    /// Newline-delimited JSON (one row object per line)
    Ndjson,
}

impl TableFormat {
    /// Guess the format from a file extension
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "csv" | "dat" | "txt" => Some(TableFormat::Csv),
            "json" => Some(TableFormat::Json),
            "ndjson" | "jsonl" => Some(TableFormat::Ndjson),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TableFormat::Csv => "csv",
            TableFormat::Json => "json",
            TableFormat::Ndjson => "ndjson",
        }
    }
}

/// What is wrong with a field
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IssueKind {
    /// Column absent, null or blank
    Missing,
    /// Present but not coercible; carries the raw value
    NonNumeric(String),
}

/// A problem found in one field of one row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowIssue {
    /// Zero-based row position in the concatenated input
    pub row: usize,
    pub field: String,
    pub kind: IssueKind,
}

impl RowIssue {
    pub fn missing(row: usize, field: &str) -> Self {
        Self {
            row,
            field: field.to_string(),
            kind: IssueKind::Missing,
        }
    }

    pub fn non_numeric(row: usize, field: &str, value: impl Into<String>) -> Self {
        Self {
            row,
            field: field.to_string(),
            kind: IssueKind::NonNumeric(value.into()),
        }
    }
}

impl fmt::Display for RowIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            IssueKind::Missing => write!(f, "row {}: missing field '{}'", self.row, self.field),
            IssueKind::NonNumeric(value) => write!(
                f,
                "row {}: field '{}' is not numeric ({})",
                self.row, self.field, value
            ),
        }
    }
}

impl From<RowIssue> for ComputeError {
    fn from(issue: RowIssue) -> Self {
        match issue.kind {
            IssueKind::Missing => {
                ComputeError::MissingField(format!("{} (row {})", issue.field, issue.row))
            }
            IssueKind::NonNumeric(value) => ComputeError::NonNumericField {
                row: issue.row,
                field: issue.field,
                value,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_from_path() {
        assert_eq!(
            TableFormat::from_path(Path::new("logger/node1.CSV")),
            Some(TableFormat::Csv)
        );
        assert_eq!(
            TableFormat::from_path(Path::new("rows.jsonl")),
            Some(TableFormat::Ndjson)
        );
        assert_eq!(TableFormat::from_path(Path::new("rows")), None);
    }

    #[test]
    fn test_issue_into_error() {
        let err: ComputeError = RowIssue::non_numeric(3, "temp1", "abc").into();
        assert_eq!(err.to_string(), "Row 3: field 'temp1' is not numeric (abc)");

        let err: ComputeError = RowIssue::missing(0, "nodeId").into();
        assert!(matches!(err, ComputeError::MissingField(_)));
    }
}
