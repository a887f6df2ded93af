use std::fmt;

use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SheetError {
    #[error("sheet '{sheet}' is unparseable: {reason}")]
    UnparseableSheet { sheet: String, reason: String },

    #[error("sheet '{sheet}' has {found} year-like header cells, need at least {required}")]
    NoYearColumns {
        sheet: String,
        found: usize,
        required: usize,
    },

    #[error("{parser} sheet '{sheet}' did not contain any values")]
    EmptyRecordSet { parser: &'static str, sheet: String },
}

impl SheetError {
    pub fn kind(&self) -> SheetErrorKind {
        match self {
            SheetError::UnparseableSheet { .. } => SheetErrorKind::UnparseableSheet,
            SheetError::NoYearColumns { .. } => SheetErrorKind::NoYearColumns,
            SheetError::EmptyRecordSet { .. } => SheetErrorKind::EmptyRecordSet,
        }
    }
}

/// Error category used when tallying skipped sheets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SheetErrorKind {
    UnparseableSheet,
    NoYearColumns,
    EmptyRecordSet,
}

impl SheetErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SheetErrorKind::UnparseableSheet => "unparseable_sheet",
            SheetErrorKind::NoYearColumns => "no_year_columns",
            SheetErrorKind::EmptyRecordSet => "empty_record_set",
        }
    }
}

impl fmt::Display for SheetErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
