mod common;
mod long_table;
mod wide_table;

pub use common::{
    extract_table_title, is_footnote_label, is_navigation_text, is_year_like, normalize_name,
    normalize_value, parse_year, FOOTNOTE_PREFIXES, MISSING_TOKENS, NAVIGATION_PHRASES,
    UNKNOWN_NAME, YEAR_MAX, YEAR_MIN,
};
pub use long_table::{make_unique, resolve_headers, LongTableParser};
pub use wide_table::{resolve_label, resolve_row_labels, WideTableParser};

pub(crate) use common::RecordBuilder;
