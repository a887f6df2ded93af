pub mod errors;
pub mod formats;
pub mod model;
mod registry;
pub mod shape;

pub use errors::{SheetError, SheetErrorKind};
pub use model::{CanonicalRecord, Cell, RawSheet, SheetShape, Year};
pub use registry::{parse_sheet, parser_for_shape, ParseOptions, ParsedSheet, SheetParser};
pub use shape::{detect_shape, DEFAULT_DETECTION_WINDOW};
