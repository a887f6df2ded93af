use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::stats::{is_constant, pearson};
use super::{Series, SeriesRef, SeriesTable};

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CorrelationOptions {
    /// Minimum number of shared years for a pair (and of years for a series).
    pub min_overlap: usize,
    /// Edges must have `|r|` strictly above this.
    pub min_abs_r: f64,
    /// Edges must have a p-value strictly below this.
    pub max_p: f64,
    pub top_n: usize,
}

impl Default for CorrelationOptions {
    fn default() -> Self {
        Self {
            min_overlap: 10,
            min_abs_r: 0.7,
            max_p: 0.05,
            top_n: 50,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CorrelationSign {
    Positive,
    Negative,
}

impl CorrelationSign {
    pub fn as_str(&self) -> &'static str {
        match self {
            CorrelationSign::Positive => "positive",
            CorrelationSign::Negative => "negative",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CorrelationEdge {
    pub left: SeriesRef,
    pub right: SeriesRef,
    pub correlation: f64,
    pub p_value: f64,
    pub overlap_years: usize,
    pub year_min: i32,
    pub year_max: i32,
    pub direction: CorrelationSign,
}

/// Correlates every pair of series that come from different sources and keeps
/// the strongest significant ones.
pub fn scan_correlations(table: &SeriesTable, options: &CorrelationOptions) -> Vec<CorrelationEdge> {
    let mut by_source: BTreeMap<&str, Vec<&Series>> = BTreeMap::new();
    for series in table.iter().filter(|s| s.len() >= options.min_overlap) {
        by_source
            .entry(series.key.source_id.as_str())
            .or_default()
            .push(series);
    }

    let groups: Vec<&Vec<&Series>> = by_source.values().collect();
    let mut edges = Vec::new();
    for (idx, left_group) in groups.iter().enumerate() {
        for right_group in &groups[idx + 1..] {
            for left in left_group.iter() {
                for right in right_group.iter() {
                    if let Some(edge) = correlate(left, right, options) {
                        edges.push(edge);
                    }
                }
            }
        }
    }

    edges.sort_by(|a, b| b.correlation.abs().total_cmp(&a.correlation.abs()));
    edges.truncate(options.top_n);
    edges
}

fn correlate(left: &Series, right: &Series, options: &CorrelationOptions) -> Option<CorrelationEdge> {
    let mut years = Vec::new();
    let mut xs = Vec::new();
    let mut ys = Vec::new();
    for (year, x) in &left.points {
        if let Some(y) = right.points.get(year) {
            years.push(*year);
            xs.push(*x);
            ys.push(*y);
        }
    }

    if years.len() < options.min_overlap || is_constant(&xs) || is_constant(&ys) {
        return None;
    }

    let (r, p) = pearson(&xs, &ys)?;
    if r.abs() <= options.min_abs_r || p >= options.max_p {
        return None;
    }

    Some(CorrelationEdge {
        left: left.reference(),
        right: right.reference(),
        correlation: r,
        p_value: p,
        overlap_years: years.len(),
        year_min: years[0],
        year_max: years[years.len() - 1],
        direction: if r > 0.0 {
            CorrelationSign::Positive
        } else {
            CorrelationSign::Negative
        },
    })
}
