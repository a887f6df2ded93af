// crates/canstat-core/src/error.rs

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Database query failed: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Polars operation failed: {0}")]
    Polars(#[from] polars::error::PolarsError),

    #[error("Configuration could not be parsed: {0}")]
    Config(#[from] toml::de::Error),

    #[error("Workbook could not be read: {0}")]
    Workbook(#[from] calamine::Error),

    #[error("JSON serialization/deserialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("source {source_id}: file not found at {}", .path.display())]
    MissingSourceFile { source_id: String, path: PathBuf },

    #[error("no records were produced: {sheets_failed} sheets failed across {sources} sources")]
    ZeroOutput { sources: usize, sheets_failed: usize },
}

pub type Result<T> = std::result::Result<T, PipelineError>;
