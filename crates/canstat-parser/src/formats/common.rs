use once_cell::sync::Lazy;
use regex::Regex;

use crate::errors::SheetError;
use crate::model::{CanonicalRecord, Cell, RawSheet, Year};

pub const YEAR_MIN: i32 = 1960;
pub const YEAR_MAX: i32 = 2030;

/// Tokens the publications use for "no value".
pub const MISSING_TOKENS: &[&str] = &[".", "..", "–", "-", "…", "", "None", "none", "*"];

/// Link text that sits in header rows but never labels a column.
pub const NAVIGATION_PHRASES: &[&str] = &["tillbaka", "innehåll", "back to contents"];

/// Row labels that start footnotes or source citations below a table.
pub const FOOTNOTE_PREFIXES: &[&str] = &["Källa", "Not", "a)", "b)", "Anm"];

pub const UNKNOWN_NAME: &str = "unknown";

const TITLE_SCAN_ROWS: usize = 5;
const TITLE_MIN_CHARS: usize = 15;

static YEAR_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([0-9]{4})([A-Za-z]?)$").expect("year token pattern"));
static NAME_DISALLOWED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^\w\såäö]").expect("name filter pattern"));
static NAME_SEPARATORS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\s_]+").expect("name separator pattern"));

fn in_year_range(year: i64) -> bool {
    (YEAR_MIN as i64..=YEAR_MAX as i64).contains(&year)
}

fn year_from_number(value: f64) -> Option<Year> {
    if !value.is_finite() {
        return None;
    }
    let year = value.trunc() as i64;
    in_year_range(year).then(|| Year::new(year as i32, year.to_string()))
}

/// Reads a year token such as `2019`, ` 2019 ` or `2012B`. Suffixed tokens keep
/// their original spelling as the label.
pub fn parse_year(cell: &Cell) -> Option<Year> {
    match cell {
        Cell::Empty => None,
        Cell::Number(value) => year_from_number(*value),
        Cell::Text(raw) => {
            let trimmed = raw.trim();
            if let Some(caps) = YEAR_TOKEN.captures(trimmed) {
                let year: i64 = caps[1].parse().ok()?;
                if in_year_range(year) {
                    let label = if caps[2].is_empty() {
                        year.to_string()
                    } else {
                        trimmed.to_string()
                    };
                    return Some(Year::new(year as i32, label));
                }
            }
            trimmed.parse::<f64>().ok().and_then(year_from_number)
        }
    }
}

pub fn is_year_like(cell: &Cell) -> bool {
    parse_year(cell).is_some()
}

/// Converts a data cell to a number, mapping missing-value markers to `None`.
pub fn normalize_value(cell: &Cell) -> Option<f64> {
    match cell {
        Cell::Empty => None,
        Cell::Number(value) => (!value.is_nan()).then_some(*value),
        Cell::Text(raw) => {
            let trimmed = raw.trim();
            if MISSING_TOKENS.contains(&trimmed) {
                return None;
            }
            let compact: String = trimmed
                .chars()
                .filter(|ch| *ch != ' ' && *ch != '\u{a0}')
                .collect();
            compact.parse::<f64>().ok().filter(|value| !value.is_nan())
        }
    }
}

/// Lower-cases a label and folds it into `snake_case`, keeping letters, digits
/// and the Swedish vowels. Produces `unknown` when nothing survives.
pub fn normalize_name(raw: &str) -> String {
    let lowered = raw.trim().to_lowercase();
    let filtered = NAME_DISALLOWED.replace_all(&lowered, "");
    let joined = NAME_SEPARATORS.replace_all(&filtered, "_");
    let name = joined.trim_matches('_');
    if name.is_empty() {
        UNKNOWN_NAME.to_string()
    } else {
        name.to_string()
    }
}

pub fn is_navigation_text(text: &str) -> bool {
    let lower = text.to_lowercase();
    NAVIGATION_PHRASES
        .iter()
        .any(|phrase| lower.contains(phrase))
}

pub fn is_footnote_label(stripped: &str) -> bool {
    FOOTNOTE_PREFIXES
        .iter()
        .any(|prefix| stripped.starts_with(prefix))
}

/// First long text cell near the top of the sheet, ignoring navigation links.
pub fn extract_table_title(sheet: &RawSheet) -> Option<String> {
    sheet
        .rows
        .iter()
        .take(TITLE_SCAN_ROWS)
        .flat_map(|row| row.iter())
        .filter_map(Cell::as_str)
        .find(|text| text.chars().count() > TITLE_MIN_CHARS && !is_navigation_text(text))
        .map(|text| text.trim().to_string())
}

/// Accumulates the records of one sheet. A sheet either yields a non-empty batch
/// or an error, never a partial one.
pub(crate) struct RecordBuilder<'a> {
    parser: &'static str,
    sheet: &'a RawSheet,
    title: Option<String>,
    substance: Option<String>,
    records: Vec<CanonicalRecord>,
}

impl<'a> RecordBuilder<'a> {
    pub fn new(parser: &'static str, sheet: &'a RawSheet, substance: Option<&str>) -> Self {
        Self {
            parser,
            sheet,
            title: extract_table_title(sheet),
            substance: substance.map(str::to_string),
            records: Vec::new(),
        }
    }

    pub fn push(&mut self, variable: &str, year: &Year, value: f64) {
        let variable = match &self.substance {
            Some(substance) => format!("{substance}__{variable}"),
            None => variable.to_string(),
        };
        self.records.push(CanonicalRecord {
            source_id: self.sheet.source_id.clone(),
            table_id: self.sheet.table_id.clone(),
            table_title: self.title.clone(),
            topic: self.sheet.topic.clone(),
            variable,
            year: year.year,
            year_label: year.label.clone(),
            value,
        });
    }

    pub fn finish(self) -> Result<Vec<CanonicalRecord>, SheetError> {
        if self.records.is_empty() {
            return Err(SheetError::EmptyRecordSet {
                parser: self.parser,
                sheet: self.sheet.table_id.clone(),
            });
        }
        Ok(self.records)
    }
}
