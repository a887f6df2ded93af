use std::collections::HashMap;
use std::fs;
use std::io::Cursor;
use std::path::PathBuf;

use blake3::Hasher;
use calamine::{open_workbook_auto_from_rs, Data, Range, Reader};
use canstat_parser::Cell;
use serde::Serialize;
use tracing::warn;

use crate::config::SourceSpec;
use crate::error::{PipelineError, Result};

/// A worksheet as a dense grid of classified cells, indexed from the sheet's A1.
#[derive(Debug, Clone, Serialize)]
pub struct SheetGrid {
    pub name: String,
    pub rows: Vec<Vec<Cell>>,
}

impl SheetGrid {
    pub fn new(name: impl Into<String>, rows: Vec<Vec<Cell>>) -> Self {
        Self {
            name: name.into(),
            rows,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LoadedWorkbook {
    pub content_hash: String,
    pub sheets: Vec<SheetGrid>,
}

/// Where workbooks come from. The pipeline only ever asks for the sheets of one
/// registered source at a time.
pub trait WorkbookSource {
    fn load(&self, source: &SourceSpec) -> Result<LoadedWorkbook>;
}

/// Reads `.xlsx`/`.xls` files from a publications directory.
#[derive(Debug, Clone)]
pub struct FileWorkbooks {
    root: PathBuf,
}

impl FileWorkbooks {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn path_for(&self, source: &SourceSpec) -> PathBuf {
        self.root.join(&source.file)
    }
}

impl WorkbookSource for FileWorkbooks {
    fn load(&self, source: &SourceSpec) -> Result<LoadedWorkbook> {
        let path = self.path_for(source);
        if !path.is_file() {
            return Err(PipelineError::MissingSourceFile {
                source_id: source.id.clone(),
                path,
            });
        }

        let bytes = fs::read(&path)?;
        let content_hash = compute_hash(&bytes);
        let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes))?;

        let mut sheets = Vec::new();
        for name in workbook.sheet_names().to_vec() {
            // An unreadable sheet stays in the list with no rows so it is reported
            // as unparseable rather than silently dropped.
            let rows = match workbook.worksheet_range(&name) {
                Ok(range) => range_to_rows(&range),
                Err(err) => {
                    warn!(source = %source.id, sheet = %name, error = %err, "worksheet could not be read");
                    Vec::new()
                }
            };
            sheets.push(SheetGrid { name, rows });
        }

        Ok(LoadedWorkbook {
            content_hash,
            sheets,
        })
    }
}

/// In-memory workbooks keyed by file name.
#[derive(Debug, Clone, Default)]
pub struct MemoryWorkbooks {
    workbooks: HashMap<String, Vec<SheetGrid>>,
}

impl MemoryWorkbooks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, file: impl Into<String>, sheets: Vec<SheetGrid>) {
        self.workbooks.insert(file.into(), sheets);
    }

    pub fn with_workbook(mut self, file: impl Into<String>, sheets: Vec<SheetGrid>) -> Self {
        self.insert(file, sheets);
        self
    }
}

impl WorkbookSource for MemoryWorkbooks {
    fn load(&self, source: &SourceSpec) -> Result<LoadedWorkbook> {
        let sheets = self
            .workbooks
            .get(&source.file)
            .cloned()
            .ok_or_else(|| PipelineError::MissingSourceFile {
                source_id: source.id.clone(),
                path: PathBuf::from(&source.file),
            })?;
        let content_hash = compute_hash(&serde_json::to_vec(&sheets)?);
        Ok(LoadedWorkbook {
            content_hash,
            sheets,
        })
    }
}

/// Expands a calamine range into rows anchored at A1, so row and column indices
/// match what a reader sees in the spreadsheet.
fn range_to_rows(range: &Range<Data>) -> Vec<Vec<Cell>> {
    let Some((start_row, start_col)) = range.start() else {
        return Vec::new();
    };

    let mut rows: Vec<Vec<Cell>> = vec![Vec::new(); start_row as usize];
    for row in range.rows() {
        let mut cells = vec![Cell::Empty; start_col as usize];
        cells.extend(row.iter().map(cell_from_data));
        rows.push(cells);
    }
    rows
}

pub fn cell_from_data(data: &Data) -> Cell {
    match data {
        Data::Empty | Data::Error(_) => Cell::Empty,
        Data::Int(value) => Cell::Number(*value as f64),
        Data::Float(value) => Cell::Number(*value),
        Data::String(value) => Cell::text(value.clone()),
        Data::Bool(value) => Cell::text(value.to_string()),
        Data::DateTime(value) => Cell::Number(value.as_f64()),
        Data::DateTimeIso(value) | Data::DurationIso(value) => Cell::text(value.clone()),
    }
}

fn compute_hash(contents: &[u8]) -> String {
    let mut hasher = Hasher::new();
    hasher.update(contents);
    let hash = hasher.finalize();
    hash.to_hex().to_string()
}
