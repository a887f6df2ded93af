pub mod catalog;
pub mod config;
pub mod error;
pub mod ingestion;
pub mod insights;
pub mod integrity;
pub mod pipelines;
pub mod store;
pub mod workbook;

pub use config::{InsightConfig, PipelineConfig, SourceSpec};
pub use error::{PipelineError, Result};
