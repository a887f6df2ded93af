use crate::errors::SheetError;
use crate::formats::{LongTableParser, WideTableParser};
use crate::model::{CanonicalRecord, RawSheet, SheetShape};
use crate::shape::{detect_shape, DEFAULT_DETECTION_WINDOW};

pub trait SheetParser {
    fn name(&self) -> &'static str;
    fn parse(
        &self,
        sheet: &RawSheet,
        options: &ParseOptions,
    ) -> Result<Vec<CanonicalRecord>, SheetError>;
}

#[derive(Debug, Clone)]
pub struct ParseOptions {
    /// Number of leading rows searched for a year anchor.
    pub detection_window: usize,
    /// Prefix applied verbatim to every variable of a long-shape sheet, as
    /// `substance__variable`. Wide sheets ignore it.
    pub substance: Option<String>,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            detection_window: DEFAULT_DETECTION_WINDOW,
            substance: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ParsedSheet {
    pub shape: SheetShape,
    pub parser: &'static str,
    pub records: Vec<CanonicalRecord>,
}

pub fn parser_for_shape(shape: SheetShape) -> Box<dyn SheetParser> {
    match shape {
        SheetShape::Long {
            header_row,
            data_start,
        } => Box::new(LongTableParser {
            header_row,
            data_start,
        }),
        SheetShape::Wide { year_row } => Box::new(WideTableParser { year_row }),
    }
}

/// Detects the layout of a sheet and normalizes it into canonical records.
pub fn parse_sheet(sheet: &RawSheet, options: &ParseOptions) -> Result<ParsedSheet, SheetError> {
    let shape = detect_shape(sheet, options.detection_window)?;
    let parser = parser_for_shape(shape);
    let records = parser.parse(sheet, options)?;
    Ok(ParsedSheet {
        shape,
        parser: parser.name(),
        records,
    })
}
