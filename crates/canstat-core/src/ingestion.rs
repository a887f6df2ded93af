use std::collections::{BTreeMap, BTreeSet};

use canstat_parser::{parse_sheet, CanonicalRecord, ParseOptions, RawSheet, SheetErrorKind};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::{PipelineConfig, SourceSpec};
use crate::error::{PipelineError, Result};
use crate::integrity::{deduplicate, find_conflicts, ConflictReport};
use crate::workbook::{SheetGrid, WorkbookSource};

const CONFLICT_LOG_SAMPLE: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceStatus {
    Parsed,
    Missing,
    Failed,
}

#[derive(Debug, Clone, Serialize)]
pub struct SourceReport {
    pub source_id: String,
    pub file: String,
    pub status: SourceStatus,
    pub content_hash: Option<String>,
    pub message: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SheetStatus {
    Parsed,
    /// Skipped by the registry or the reserved-sheet rule.
    Excluded,
    Failed,
}

#[derive(Debug, Clone, Serialize)]
pub struct SheetReport {
    pub source_id: String,
    pub sheet: String,
    pub status: SheetStatus,
    pub shape: Option<&'static str>,
    pub records: usize,
    pub error_kind: Option<SheetErrorKind>,
    pub message: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct IngestionSummary {
    pub sources_total: usize,
    pub sources_parsed: usize,
    pub sources_missing: usize,
    pub sources_failed: usize,
    pub sheets_parsed: usize,
    pub sheets_excluded: usize,
    pub sheets_failed: usize,
    pub failures_by_kind: BTreeMap<SheetErrorKind, usize>,
    pub records_emitted: usize,
    pub records_kept: usize,
    pub duplicates_removed: usize,
    pub conflicting_keys: usize,
    pub year_min: Option<i32>,
    pub year_max: Option<i32>,
    pub distinct_variables: usize,
}

#[derive(Debug)]
pub struct IngestionBatch {
    pub records: Vec<CanonicalRecord>,
    pub conflicts: ConflictReport,
    pub sources: Vec<SourceReport>,
    pub sheets: Vec<SheetReport>,
    pub summary: IngestionSummary,
}

/// Reads every registered source, normalizes each sheet and returns the
/// deduplicated record set. Bad sheets and missing files are reported and skipped;
/// only a run that yields no records at all is an error.
pub fn ingest_sources(
    config: &PipelineConfig,
    workbooks: &dyn WorkbookSource,
) -> Result<IngestionBatch> {
    let mut emitted: Vec<CanonicalRecord> = Vec::new();
    let mut source_reports = Vec::with_capacity(config.sources.len());
    let mut sheet_reports = Vec::new();

    for source in &config.sources {
        let workbook = match workbooks.load(source) {
            Ok(workbook) => workbook,
            Err(err) => {
                let status = match err {
                    PipelineError::MissingSourceFile { .. } => SourceStatus::Missing,
                    _ => SourceStatus::Failed,
                };
                warn!(source = %source.id, file = %source.file, error = %err, "source skipped");
                source_reports.push(SourceReport {
                    source_id: source.id.clone(),
                    file: source.file.clone(),
                    status,
                    content_hash: None,
                    message: Some(err.to_string()),
                });
                continue;
            }
        };

        let before = emitted.len();
        for grid in workbook.sheets {
            let report = ingest_sheet(config, source, grid, &mut emitted);
            sheet_reports.push(report);
        }
        info!(
            source = %source.id,
            hash = %workbook.content_hash,
            records = emitted.len() - before,
            "source ingested"
        );

        source_reports.push(SourceReport {
            source_id: source.id.clone(),
            file: source.file.clone(),
            status: SourceStatus::Parsed,
            content_hash: Some(workbook.content_hash),
            message: None,
        });
    }

    let sheets_failed = sheet_reports
        .iter()
        .filter(|report| report.status == SheetStatus::Failed)
        .count();
    if emitted.is_empty() {
        return Err(PipelineError::ZeroOutput {
            sources: config.sources.len(),
            sheets_failed,
        });
    }

    let records_emitted = emitted.len();
    let records = deduplicate(emitted);
    let conflicts = find_conflicts(&records);
    if !conflicts.is_empty() {
        for conflict in conflicts.sample(CONFLICT_LOG_SAMPLE) {
            warn!(
                source = %conflict.key.source_id,
                table = %conflict.key.table_id,
                variable = %conflict.key.variable,
                year = %conflict.key.year_label,
                values = ?conflict.values,
                "conflicting values for one observation"
            );
        }
        warn!(
            keys = conflicts.len(),
            rows = conflicts.conflicting_rows(),
            "integrity check found conflicts; all rows retained"
        );
    }

    let summary = summarize(
        &records,
        records_emitted,
        &conflicts,
        &source_reports,
        &sheet_reports,
    );
    info!(
        records = summary.records_kept,
        duplicates = summary.duplicates_removed,
        sheets_parsed = summary.sheets_parsed,
        sheets_failed = summary.sheets_failed,
        "ingestion finished"
    );

    Ok(IngestionBatch {
        records,
        conflicts,
        sources: source_reports,
        sheets: sheet_reports,
        summary,
    })
}

fn ingest_sheet(
    config: &PipelineConfig,
    source: &SourceSpec,
    grid: SheetGrid,
    emitted: &mut Vec<CanonicalRecord>,
) -> SheetReport {
    let SheetGrid { name, rows } = grid;

    if source.skips_sheet(&name) {
        debug!(source = %source.id, sheet = %name, "sheet excluded");
        return SheetReport {
            source_id: source.id.clone(),
            sheet: name,
            status: SheetStatus::Excluded,
            shape: None,
            records: 0,
            error_kind: None,
            message: None,
        };
    }

    let options = ParseOptions {
        detection_window: config.detection_window,
        substance: source.substance_for(&name).map(str::to_string),
    };
    let sheet = RawSheet::new(&source.id, &name, &source.topic, rows);

    match parse_sheet(&sheet, &options) {
        Ok(parsed) => {
            debug!(
                source = %source.id,
                sheet = %name,
                shape = parsed.shape.as_str(),
                records = parsed.records.len(),
                "sheet parsed"
            );
            let records = parsed.records.len();
            emitted.extend(parsed.records);
            SheetReport {
                source_id: source.id.clone(),
                sheet: name,
                status: SheetStatus::Parsed,
                shape: Some(parsed.shape.as_str()),
                records,
                error_kind: None,
                message: None,
            }
        }
        Err(err) => {
            warn!(source = %source.id, sheet = %name, kind = %err.kind(), error = %err, "sheet skipped");
            SheetReport {
                source_id: source.id.clone(),
                sheet: name,
                status: SheetStatus::Failed,
                shape: None,
                records: 0,
                error_kind: Some(err.kind()),
                message: Some(err.to_string()),
            }
        }
    }
}

fn summarize(
    records: &[CanonicalRecord],
    records_emitted: usize,
    conflicts: &ConflictReport,
    sources: &[SourceReport],
    sheets: &[SheetReport],
) -> IngestionSummary {
    let mut summary = IngestionSummary {
        sources_total: sources.len(),
        records_emitted,
        records_kept: records.len(),
        duplicates_removed: records_emitted - records.len(),
        conflicting_keys: conflicts.len(),
        ..IngestionSummary::default()
    };

    for source in sources {
        match source.status {
            SourceStatus::Parsed => summary.sources_parsed += 1,
            SourceStatus::Missing => summary.sources_missing += 1,
            SourceStatus::Failed => summary.sources_failed += 1,
        }
    }

    for sheet in sheets {
        match sheet.status {
            SheetStatus::Parsed => summary.sheets_parsed += 1,
            SheetStatus::Excluded => summary.sheets_excluded += 1,
            SheetStatus::Failed => summary.sheets_failed += 1,
        }
        if let Some(kind) = sheet.error_kind {
            *summary.failures_by_kind.entry(kind).or_default() += 1;
        }
    }

    summary.year_min = records.iter().map(|record| record.year).min();
    summary.year_max = records.iter().map(|record| record.year).max();
    summary.distinct_variables = records
        .iter()
        .map(|record| (&record.source_id, &record.table_id, &record.variable))
        .collect::<BTreeSet<_>>()
        .len();

    summary
}
