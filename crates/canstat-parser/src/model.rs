use std::fmt;

use serde::{Deserialize, Serialize};

/// A spreadsheet cell, classified once at the workbook boundary.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub enum Cell {
    #[default]
    Empty,
    Number(f64),
    Text(String),
}

static EMPTY_CELL: Cell = Cell::Empty;

impl Cell {
    /// Builds a text cell; an empty string is treated as an empty cell.
    pub fn text(value: impl Into<String>) -> Self {
        let value = value.into();
        if value.is_empty() {
            Cell::Empty
        } else {
            Cell::Text(value)
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Cell::Empty)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Cell::Text(value) => Some(value.as_str()),
            _ => None,
        }
    }

    /// Renders the cell as text without trimming. Integral numbers print without a
    /// fractional part.
    pub fn to_text(&self) -> Option<String> {
        match self {
            Cell::Empty => None,
            Cell::Number(value) => Some(format_number(*value)),
            Cell::Text(value) => Some(value.clone()),
        }
    }
}

fn format_number(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}

impl From<f64> for Cell {
    fn from(value: f64) -> Self {
        Cell::Number(value)
    }
}

impl From<i64> for Cell {
    fn from(value: i64) -> Self {
        Cell::Number(value as f64)
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Cell::text(value)
    }
}

impl From<String> for Cell {
    fn from(value: String) -> Self {
        Cell::text(value)
    }
}

impl<T: Into<Cell>> From<Option<T>> for Cell {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Cell::Empty)
    }
}

/// One worksheet as read from a source workbook.
#[derive(Debug, Clone)]
pub struct RawSheet {
    pub source_id: String,
    pub table_id: String,
    pub topic: String,
    pub rows: Vec<Vec<Cell>>,
}

impl RawSheet {
    pub fn new(
        source_id: impl Into<String>,
        table_id: impl Into<String>,
        topic: impl Into<String>,
        rows: Vec<Vec<Cell>>,
    ) -> Self {
        Self {
            source_id: source_id.into(),
            table_id: table_id.into(),
            topic: topic.into(),
            rows,
        }
    }

    pub fn row(&self, index: usize) -> &[Cell] {
        self.rows.get(index).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn cell(&self, row: usize, column: usize) -> &Cell {
        self.row(row).get(column).unwrap_or(&EMPTY_CELL)
    }

    pub fn is_blank_row(&self, index: usize) -> bool {
        self.row(index).iter().all(Cell::is_empty)
    }

    pub fn non_empty_rows(&self) -> usize {
        (0..self.rows.len())
            .filter(|idx| !self.is_blank_row(*idx))
            .count()
    }
}

/// A year token found in a header or leading cell.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Year {
    pub year: i32,
    pub label: String,
}

impl Year {
    pub fn new(year: i32, label: impl Into<String>) -> Self {
        Self {
            year,
            label: label.into(),
        }
    }
}

impl fmt::Display for Year {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label)
    }
}

/// Orientation of the data region inside a sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SheetShape {
    /// Years run down the first column; `header_row` names the variables.
    Long { header_row: usize, data_start: usize },
    /// Years run across `year_row`; each following row is one variable.
    Wide { year_row: usize },
}

impl SheetShape {
    pub fn as_str(&self) -> &'static str {
        match self {
            SheetShape::Long { .. } => "long",
            SheetShape::Wide { .. } => "wide",
        }
    }
}

impl fmt::Display for SheetShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One normalized observation with full provenance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalRecord {
    pub source_id: String,
    pub table_id: String,
    pub table_title: Option<String>,
    pub topic: String,
    pub variable: String,
    pub year: i32,
    pub year_label: String,
    pub value: f64,
}

impl CanonicalRecord {
    pub fn series_id(&self) -> String {
        format!("{}|{}|{}", self.source_id, self.table_id, self.variable)
    }
}
