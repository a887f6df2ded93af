use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use canstat_parser::DEFAULT_DETECTION_WINDOW;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;

use crate::error::Result;
use crate::insights::{CorrelationOptions, MoverOptions, TrendBreakOptions};

/// Table-of-contents sheets ("TK1", "TK 12", ...) are never data.
static RESERVED_SHEET: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^TK\s*\d").expect("reserved sheet pattern"));

pub fn is_reserved_sheet(name: &str) -> bool {
    RESERVED_SHEET.is_match(name)
}

/// Everything a run needs to know: where the workbooks live, how to read them and
/// how strict the insight scanners are.
#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    #[serde(default = "default_publications_dir")]
    pub publications_dir: PathBuf,
    #[serde(default = "default_detection_window")]
    pub detection_window: usize,
    #[serde(default)]
    pub insights: InsightConfig,
    #[serde(default)]
    pub sources: Vec<SourceSpec>,
}

fn default_publications_dir() -> PathBuf {
    PathBuf::from("Publikationer")
}

fn default_detection_window() -> usize {
    DEFAULT_DETECTION_WINDOW
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            publications_dir: default_publications_dir(),
            detection_window: default_detection_window(),
            insights: InsightConfig::default(),
            sources: Vec::new(),
        }
    }
}

impl PipelineConfig {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Reads a TOML config file. A relative `publications_dir` is resolved
    /// against the directory holding the file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let mut config = Self::from_toml_str(&content)?;
        if config.publications_dir.is_relative() {
            if let Some(parent) = path.parent() {
                config.publications_dir = parent.join(&config.publications_dir);
            }
        }
        Ok(config)
    }

    pub fn source(&self, id: &str) -> Option<&SourceSpec> {
        self.sources.iter().find(|source| source.id == id)
    }
}

/// One registry entry: a workbook and how to treat its sheets.
#[derive(Debug, Clone, Deserialize)]
pub struct SourceSpec {
    pub id: String,
    pub file: String,
    pub topic: String,
    #[serde(default)]
    pub skip_sheets: Vec<String>,
    /// Sheet name to substance prefix.
    #[serde(default)]
    pub substance_map: BTreeMap<String, String>,
}

impl SourceSpec {
    pub fn new(id: impl Into<String>, file: impl Into<String>, topic: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            file: file.into(),
            topic: topic.into(),
            skip_sheets: Vec::new(),
            substance_map: BTreeMap::new(),
        }
    }

    pub fn skips_sheet(&self, sheet: &str) -> bool {
        is_reserved_sheet(sheet) || self.skip_sheets.iter().any(|skip| skip == sheet)
    }

    pub fn substance_for(&self, sheet: &str) -> Option<&str> {
        self.substance_map.get(sheet).map(String::as_str)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct InsightConfig {
    pub correlation: CorrelationOptions,
    pub trend_breaks: TrendBreakOptions,
    pub movers: MoverOptions,
}
