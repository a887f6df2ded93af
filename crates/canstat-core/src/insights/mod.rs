//! Statistical scanners over the canonical store. Each scanner looks at one
//! year-indexed series (or pair of series) at a time and skips anything too short
//! or too flat to say something about.

pub mod correlation;
pub mod movers;
pub mod stats;
pub mod trend_breaks;

use std::collections::BTreeMap;

use canstat_parser::CanonicalRecord;
use serde::Serialize;
use tracing::info;

use crate::config::InsightConfig;

pub use correlation::{scan_correlations, CorrelationEdge, CorrelationOptions, CorrelationSign};
pub use movers::{detect_movers, MoverDirection, MoverOptions, MoverRecord};
pub use trend_breaks::{detect_trend_breaks, BreakDirection, TrendBreak, TrendBreakOptions};

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SeriesKey {
    pub source_id: String,
    pub table_id: String,
    pub variable: String,
}

impl SeriesKey {
    pub fn id(&self) -> String {
        format!("{}|{}|{}", self.source_id, self.table_id, self.variable)
    }
}

/// One variable of one table, with at most one value per year.
#[derive(Debug, Clone)]
pub struct Series {
    pub key: SeriesKey,
    pub table_title: Option<String>,
    pub points: BTreeMap<i32, f64>,
}

impl Series {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn years(&self) -> Vec<i32> {
        self.points.keys().copied().collect()
    }

    pub fn values(&self) -> Vec<f64> {
        self.points.values().copied().collect()
    }

    pub fn reference(&self) -> SeriesRef {
        SeriesRef {
            series_id: self.key.id(),
            source_id: self.key.source_id.clone(),
            table_id: self.key.table_id.clone(),
            table_title: self.table_title.clone(),
            variable: self.key.variable.clone(),
        }
    }
}

/// Provenance carried on every insight row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesRef {
    pub series_id: String,
    pub source_id: String,
    pub table_id: String,
    pub table_title: Option<String>,
    pub variable: String,
}

/// All series of a record set, ordered by key.
#[derive(Debug, Clone, Default)]
pub struct SeriesTable {
    series: Vec<Series>,
}

impl SeriesTable {
    /// Groups records into series. When a series has several values for one year
    /// (suffixed year labels), the first one in record order wins.
    pub fn from_records(records: &[CanonicalRecord]) -> Self {
        let mut grouped: BTreeMap<SeriesKey, Series> = BTreeMap::new();
        for record in records {
            let key = SeriesKey {
                source_id: record.source_id.clone(),
                table_id: record.table_id.clone(),
                variable: record.variable.clone(),
            };
            let series = grouped.entry(key.clone()).or_insert_with(|| Series {
                key,
                table_title: record.table_title.clone(),
                points: BTreeMap::new(),
            });
            series.points.entry(record.year).or_insert(record.value);
        }
        Self {
            series: grouped.into_values().collect(),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Series> {
        self.series.iter()
    }

    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct InsightReport {
    pub correlations: Vec<CorrelationEdge>,
    pub trend_breaks: Vec<TrendBreak>,
    pub movers: Vec<MoverRecord>,
}

pub fn run_all(records: &[CanonicalRecord], config: &InsightConfig) -> InsightReport {
    let table = SeriesTable::from_records(records);
    info!(series = table.len(), records = records.len(), "scanning series");

    let correlations = scan_correlations(&table, &config.correlation);
    info!(found = correlations.len(), "correlation scan finished");

    let trend_breaks = detect_trend_breaks(&table, &config.trend_breaks);
    info!(found = trend_breaks.len(), "trend break scan finished");

    let movers = detect_movers(&table, &config.movers);
    info!(found = movers.len(), "mover scan finished");

    InsightReport {
        correlations,
        trend_breaks,
        movers,
    }
}
