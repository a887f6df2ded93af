use crate::errors::SheetError;
use crate::model::{CanonicalRecord, Cell, RawSheet, Year};
use crate::registry::{ParseOptions, SheetParser};
use crate::shape::MIN_YEAR_COLUMNS;

use super::{is_footnote_label, normalize_name, normalize_value, parse_year, RecordBuilder};

/// Years across one header row, one variable per following row.
#[derive(Debug, Clone, Copy)]
pub struct WideTableParser {
    pub year_row: usize,
}

impl WideTableParser {
    const NAME: &'static str = "wide_table";

    fn year_columns(&self, sheet: &RawSheet) -> Result<Vec<(usize, Year)>, SheetError> {
        let years: Vec<(usize, Year)> = sheet
            .row(self.year_row)
            .iter()
            .enumerate()
            .filter_map(|(column, cell)| parse_year(cell).map(|year| (column, year)))
            .collect();

        if years.len() < MIN_YEAR_COLUMNS {
            return Err(SheetError::NoYearColumns {
                sheet: sheet.table_id.clone(),
                found: years.len(),
                required: MIN_YEAR_COLUMNS,
            });
        }
        Ok(years)
    }
}

impl SheetParser for WideTableParser {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn parse(
        &self,
        sheet: &RawSheet,
        _options: &ParseOptions,
    ) -> Result<Vec<CanonicalRecord>, SheetError> {
        let years = self.year_columns(sheet)?;
        let data_rows = sheet.rows.get(self.year_row + 1..).unwrap_or(&[]);

        let labels: Vec<Option<String>> = data_rows
            .iter()
            .map(|row| row.first().and_then(Cell::to_text))
            .collect();
        let variables = resolve_row_labels(labels.iter().map(Option::as_deref));

        let mut builder = RecordBuilder::new(Self::NAME, sheet, None);
        for (row, variable) in data_rows.iter().zip(variables) {
            let Some(variable) = variable else {
                continue;
            };
            for (column, year) in &years {
                if let Some(value) = row.get(*column).and_then(normalize_value) {
                    builder.push(&variable, year, value);
                }
            }
        }
        builder.finish()
    }
}

/// Names each row label, nesting indented labels under the last unindented one.
///
/// Returns one entry per input label; `None` marks rows that carry no variable
/// (blank labels, footnotes, source citations).
pub fn resolve_row_labels<'a, I>(labels: I) -> Vec<Option<String>>
where
    I: IntoIterator<Item = Option<&'a str>>,
{
    let (_, variables) = labels.into_iter().fold(
        (None, Vec::new()),
        |(parent, mut variables): (Option<String>, Vec<Option<String>>), label| {
            let (parent, variable) = resolve_label(parent, label);
            variables.push(variable);
            (parent, variables)
        },
    );
    variables
}

/// One step of the label walk: takes the current parent and a raw label, returns
/// the next parent and the variable name for this row.
pub fn resolve_label(
    parent: Option<String>,
    label: Option<&str>,
) -> (Option<String>, Option<String>) {
    let Some(raw) = label else {
        return (parent, None);
    };
    let stripped = raw.trim();
    if stripped.is_empty() || is_footnote_label(stripped) {
        return (parent, None);
    }

    let indented = raw.trim_start().len() < raw.len();
    match parent {
        Some(parent) if indented => {
            let variable = format!("{}__{}", normalize_name(&parent), normalize_name(stripped));
            (Some(parent), Some(variable))
        }
        _ => (Some(stripped.to_string()), Some(normalize_name(stripped))),
    }
}
