use std::path::Path;

use tracing::info;

use crate::catalog::{build_catalog_tables, write_parquet, CatalogTables};
use crate::config::{InsightConfig, PipelineConfig};
use crate::error::Result;
use crate::ingestion::{ingest_sources, IngestionBatch};
use crate::insights::{self, InsightReport};
use crate::store::{self, DbPool, SnapshotReceipt};
use crate::workbook::WorkbookSource;

#[derive(Debug)]
pub struct IngestOutcome {
    pub batch: IngestionBatch,
    pub tables: CatalogTables,
    pub receipt: SnapshotReceipt,
}

#[derive(Debug)]
pub struct InsightOutcome {
    pub report: InsightReport,
    pub receipt: SnapshotReceipt,
}

/// Normalizes every registered workbook and replaces the canonical snapshot.
/// When `parquet_path` is given the canonical frame is also written there.
pub async fn run_ingest(
    pool: &DbPool,
    config: &PipelineConfig,
    workbooks: &dyn WorkbookSource,
    parquet_path: Option<&Path>,
) -> Result<IngestOutcome> {
    let batch = ingest_sources(config, workbooks)?;
    let tables = build_catalog_tables(&batch.records)?;

    if let Some(path) = parquet_path {
        write_parquet(&tables.frame, path)?;
        info!(path = %path.display(), rows = tables.frame.height(), "canonical frame exported");
    }

    let receipt = store::write_snapshot(pool, &batch.records, &tables).await?;
    info!(
        run_id = %receipt.run_id,
        tables = tables.catalog.len(),
        variables = tables.variables.len(),
        "ingest stage complete"
    );

    Ok(IngestOutcome {
        batch,
        tables,
        receipt,
    })
}

/// Reads the canonical snapshot back and replaces the insight tables.
pub async fn run_insights(pool: &DbPool, config: &InsightConfig) -> Result<InsightOutcome> {
    let records = store::load_timeseries(pool).await?;
    let report = insights::run_all(&records, config);
    let receipt = store::write_insights(pool, &report).await?;
    info!(
        run_id = %receipt.run_id,
        correlations = report.correlations.len(),
        trend_breaks = report.trend_breaks.len(),
        movers = report.movers.len(),
        "insight stage complete"
    );
    Ok(InsightOutcome { report, receipt })
}
