use std::fs::File;
use std::path::Path;

use canstat_parser::CanonicalRecord;
use polars::io::parquet::write::{ParquetCompression, ParquetWriter, StatisticsOptions};
use polars::prelude::*;
use serde::Serialize;

use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CatalogEntry {
    pub source_id: String,
    pub table_id: String,
    pub table_title: Option<String>,
    pub topic: String,
    pub variables: i64,
    pub year_min: i64,
    pub year_max: i64,
    pub records: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VariableIndexEntry {
    pub source_id: String,
    pub table_id: String,
    pub variable: String,
    pub year_min: i64,
    pub year_max: i64,
    pub value_min: f64,
    pub value_max: f64,
    pub records: i64,
}

/// The canonical frame and the two summary tables derived from it.
#[derive(Debug, Clone)]
pub struct CatalogTables {
    pub frame: DataFrame,
    pub catalog: Vec<CatalogEntry>,
    pub variables: Vec<VariableIndexEntry>,
}

pub fn build_catalog_tables(records: &[CanonicalRecord]) -> Result<CatalogTables> {
    let frame = records_to_frame(records)?;
    let catalog = catalog_entries(&catalog_frame(&frame)?)?;
    let variables = variable_entries(&variable_frame(&frame)?)?;
    Ok(CatalogTables {
        frame,
        catalog,
        variables,
    })
}

/// One row per canonical record, in record order.
pub fn records_to_frame(records: &[CanonicalRecord]) -> PolarsResult<DataFrame> {
    let source: Vec<&str> = records.iter().map(|r| r.source_id.as_str()).collect();
    let table: Vec<&str> = records.iter().map(|r| r.table_id.as_str()).collect();
    let title: Vec<Option<&str>> = records.iter().map(|r| r.table_title.as_deref()).collect();
    let topic: Vec<&str> = records.iter().map(|r| r.topic.as_str()).collect();
    let variable: Vec<&str> = records.iter().map(|r| r.variable.as_str()).collect();
    let year: Vec<i64> = records.iter().map(|r| i64::from(r.year)).collect();
    let year_label: Vec<&str> = records.iter().map(|r| r.year_label.as_str()).collect();
    let value: Vec<f64> = records.iter().map(|r| r.value).collect();

    DataFrame::new(vec![
        Series::new("source_id".into(), source).into(),
        Series::new("table_id".into(), table).into(),
        Series::new("table_title".into(), title).into(),
        Series::new("topic".into(), topic).into(),
        Series::new("variable".into(), variable).into(),
        Series::new("year".into(), year).into(),
        Series::new("year_label".into(), year_label).into(),
        Series::new("value".into(), value).into(),
    ])
}

pub fn catalog_frame(frame: &DataFrame) -> PolarsResult<DataFrame> {
    frame
        .clone()
        .lazy()
        .group_by([col("source_id"), col("table_id")])
        .agg([
            col("table_title").first(),
            col("topic").first(),
            col("variable")
                .n_unique()
                .cast(DataType::Int64)
                .alias("variables"),
            col("year").min().alias("year_min"),
            col("year").max().alias("year_max"),
            col("value").count().cast(DataType::Int64).alias("records"),
        ])
        .sort(["source_id", "table_id"], SortMultipleOptions::default())
        .collect()
}

pub fn variable_frame(frame: &DataFrame) -> PolarsResult<DataFrame> {
    frame
        .clone()
        .lazy()
        .group_by([col("source_id"), col("table_id"), col("variable")])
        .agg([
            col("year").min().alias("year_min"),
            col("year").max().alias("year_max"),
            col("value").min().alias("value_min"),
            col("value").max().alias("value_max"),
            col("value").count().cast(DataType::Int64).alias("records"),
        ])
        .sort(
            ["source_id", "table_id", "variable"],
            SortMultipleOptions::default(),
        )
        .collect()
}

fn catalog_entries(df: &DataFrame) -> PolarsResult<Vec<CatalogEntry>> {
    let source = df.column("source_id")?.str()?;
    let table = df.column("table_id")?.str()?;
    let title = df.column("table_title")?.str()?;
    let topic = df.column("topic")?.str()?;
    let variables = df.column("variables")?.i64()?;
    let year_min = df.column("year_min")?.i64()?;
    let year_max = df.column("year_max")?.i64()?;
    let records = df.column("records")?.i64()?;

    let mut entries = Vec::with_capacity(df.height());
    for idx in 0..df.height() {
        entries.push(CatalogEntry {
            source_id: source.get(idx).unwrap_or_default().to_string(),
            table_id: table.get(idx).unwrap_or_default().to_string(),
            table_title: title.get(idx).map(str::to_string),
            topic: topic.get(idx).unwrap_or_default().to_string(),
            variables: variables.get(idx).unwrap_or_default(),
            year_min: year_min.get(idx).unwrap_or_default(),
            year_max: year_max.get(idx).unwrap_or_default(),
            records: records.get(idx).unwrap_or_default(),
        });
    }
    Ok(entries)
}

fn variable_entries(df: &DataFrame) -> PolarsResult<Vec<VariableIndexEntry>> {
    let source = df.column("source_id")?.str()?;
    let table = df.column("table_id")?.str()?;
    let variable = df.column("variable")?.str()?;
    let year_min = df.column("year_min")?.i64()?;
    let year_max = df.column("year_max")?.i64()?;
    let value_min = df.column("value_min")?.f64()?;
    let value_max = df.column("value_max")?.f64()?;
    let records = df.column("records")?.i64()?;

    let mut entries = Vec::with_capacity(df.height());
    for idx in 0..df.height() {
        entries.push(VariableIndexEntry {
            source_id: source.get(idx).unwrap_or_default().to_string(),
            table_id: table.get(idx).unwrap_or_default().to_string(),
            variable: variable.get(idx).unwrap_or_default().to_string(),
            year_min: year_min.get(idx).unwrap_or_default(),
            year_max: year_max.get(idx).unwrap_or_default(),
            value_min: value_min.get(idx).unwrap_or(f64::NAN),
            value_max: value_max.get(idx).unwrap_or(f64::NAN),
            records: records.get(idx).unwrap_or_default(),
        });
    }
    Ok(entries)
}

pub fn write_parquet(frame: &DataFrame, path: &Path) -> Result<()> {
    let file = File::create(path)?;
    let mut clone = frame.clone();
    ParquetWriter::new(file)
        .with_compression(ParquetCompression::Zstd(None))
        .with_statistics(StatisticsOptions::default())
        .finish(&mut clone)?;
    Ok(())
}
