use crate::errors::SheetError;
use crate::formats::is_year_like;
use crate::model::{RawSheet, SheetShape};

pub const DEFAULT_DETECTION_WINDOW: usize = 8;
pub const MIN_YEAR_COLUMNS: usize = 3;
pub const MIN_NON_EMPTY_ROWS: usize = 3;

/// Decides whether a sheet holds years as rows or as columns by looking at its
/// first `window` rows.
pub fn detect_shape(sheet: &RawSheet, window: usize) -> Result<SheetShape, SheetError> {
    let non_empty = sheet.non_empty_rows();
    if non_empty < MIN_NON_EMPTY_ROWS {
        return Err(SheetError::UnparseableSheet {
            sheet: sheet.table_id.clone(),
            reason: format!("only {non_empty} non-empty rows"),
        });
    }

    let leading = &sheet.rows[..window.min(sheet.rows.len())];

    if let Some(data_start) = leading
        .iter()
        .position(|row| row.first().is_some_and(is_year_like))
    {
        let mut header_row = data_start.saturating_sub(1);
        if sheet.is_blank_row(header_row) {
            header_row = data_start.saturating_sub(2);
        }
        return Ok(SheetShape::Long {
            header_row,
            data_start,
        });
    }

    let mut best = 0;
    for (idx, row) in leading.iter().enumerate() {
        let count = row.iter().filter(|cell| is_year_like(cell)).count();
        if count >= MIN_YEAR_COLUMNS {
            return Ok(SheetShape::Wide { year_row: idx });
        }
        best = best.max(count);
    }

    if best > 0 {
        Err(SheetError::NoYearColumns {
            sheet: sheet.table_id.clone(),
            found: best,
            required: MIN_YEAR_COLUMNS,
        })
    } else {
        Err(SheetError::UnparseableSheet {
            sheet: sheet.table_id.clone(),
            reason: format!("no year anchor in the first {window} rows"),
        })
    }
}
