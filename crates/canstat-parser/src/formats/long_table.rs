use std::collections::HashMap;

use crate::errors::SheetError;
use crate::model::{CanonicalRecord, Cell, RawSheet};
use crate::registry::{ParseOptions, SheetParser};

use super::{is_navigation_text, normalize_name, normalize_value, parse_year, RecordBuilder};

/// Years down the first column, one variable per column.
#[derive(Debug, Clone, Copy)]
pub struct LongTableParser {
    pub header_row: usize,
    pub data_start: usize,
}

impl LongTableParser {
    const NAME: &'static str = "long_table";
}

impl SheetParser for LongTableParser {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn parse(
        &self,
        sheet: &RawSheet,
        options: &ParseOptions,
    ) -> Result<Vec<CanonicalRecord>, SheetError> {
        let group_row = (self.header_row > 0).then(|| sheet.row(self.header_row - 1));
        let headers = resolve_headers(sheet.row(self.header_row), group_row);

        let mut builder = RecordBuilder::new(Self::NAME, sheet, options.substance.as_deref());
        for row in sheet.rows.iter().skip(self.data_start) {
            let Some(year) = row.first().and_then(parse_year) else {
                continue;
            };
            for (column, variable) in headers.iter().enumerate().skip(1) {
                if let Some(value) = row.get(column).and_then(normalize_value) {
                    builder.push(variable, &year, value);
                }
            }
        }
        builder.finish()
    }
}

/// Builds column names from a header row and the optional group row above it.
///
/// A group label carries forward to every later column until the next non-empty
/// group cell. The first column holds the year and never takes a group.
pub fn resolve_headers(header: &[Cell], group_row: Option<&[Cell]>) -> Vec<String> {
    let mut current_group: Option<String> = None;
    let mut names = Vec::with_capacity(header.len());

    for (idx, cell) in header.iter().enumerate() {
        let group_text = group_row
            .and_then(|row| row.get(idx))
            .and_then(Cell::as_str)
            .map(str::trim)
            .filter(|text| !text.is_empty() && !is_navigation_text(text));
        if let Some(text) = group_text {
            current_group = Some(normalize_name(text));
        }

        let sub = cell
            .to_text()
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty())
            .map(|text| normalize_name(&text));
        let group = current_group.as_deref().filter(|_| idx > 0);

        let name = match (group, sub) {
            (Some(group), Some(sub)) => format!("{group}__{sub}"),
            (None, Some(sub)) => sub,
            (Some(group), None) => group.to_string(),
            (None, None) => format!("col_{idx}"),
        };
        names.push(name);
    }

    make_unique(names)
}

/// Appends `_1`, `_2`, ... to repeated names, leaving the first occurrence as is.
pub fn make_unique(names: Vec<String>) -> Vec<String> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    names
        .into_iter()
        .map(|name| match seen.get_mut(&name) {
            Some(count) => {
                *count += 1;
                format!("{name}_{count}")
            }
            None => {
                seen.insert(name.clone(), 0);
                name
            }
        })
        .collect()
}
