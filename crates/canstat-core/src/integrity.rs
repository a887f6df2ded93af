use std::collections::{BTreeMap, HashSet};

use canstat_parser::CanonicalRecord;
use serde::Serialize;

/// The identity of an observation: one value per variable, year label and table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct RecordKey {
    pub source_id: String,
    pub table_id: String,
    pub variable: String,
    pub year: i32,
    pub year_label: String,
}

impl RecordKey {
    pub fn of(record: &CanonicalRecord) -> Self {
        Self {
            source_id: record.source_id.clone(),
            table_id: record.table_id.clone(),
            variable: record.variable.clone(),
            year: record.year,
            year_label: record.year_label.clone(),
        }
    }
}

#[derive(Debug, PartialEq, Eq, Hash)]
struct ExactKey {
    key: RecordKey,
    table_title: Option<String>,
    topic: String,
    value: u64,
}

// -0.0 and 0.0 compare equal as values and must collapse together.
fn value_bits(value: f64) -> u64 {
    if value == 0.0 {
        0
    } else {
        value.to_bits()
    }
}

/// Drops records that are equal in every field, keeping the first occurrence.
pub fn deduplicate(records: Vec<CanonicalRecord>) -> Vec<CanonicalRecord> {
    let mut seen = HashSet::with_capacity(records.len());
    records
        .into_iter()
        .filter(|record| {
            seen.insert(ExactKey {
                key: RecordKey::of(record),
                table_title: record.table_title.clone(),
                topic: record.topic.clone(),
                value: value_bits(record.value),
            })
        })
        .collect()
}

#[derive(Debug, Clone, Serialize)]
pub struct ConflictingKey {
    #[serde(flatten)]
    pub key: RecordKey,
    pub rows: usize,
    pub values: Vec<f64>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ConflictReport {
    pub conflicts: Vec<ConflictingKey>,
}

impl ConflictReport {
    pub fn is_empty(&self) -> bool {
        self.conflicts.is_empty()
    }

    /// Number of keys carrying more than one distinct value.
    pub fn len(&self) -> usize {
        self.conflicts.len()
    }

    pub fn conflicting_rows(&self) -> usize {
        self.conflicts.iter().map(|conflict| conflict.rows).sum()
    }

    pub fn sample(&self, limit: usize) -> &[ConflictingKey] {
        &self.conflicts[..self.conflicts.len().min(limit)]
    }
}

/// Finds keys that map to more than one distinct value. Records are not altered;
/// the caller decides what to do with the report.
pub fn find_conflicts(records: &[CanonicalRecord]) -> ConflictReport {
    let mut groups: BTreeMap<RecordKey, Vec<f64>> = BTreeMap::new();
    for record in records {
        groups
            .entry(RecordKey::of(record))
            .or_default()
            .push(record.value);
    }

    let conflicts = groups
        .into_iter()
        .filter_map(|(key, values)| {
            let mut distinct: Vec<u64> = values.iter().copied().map(value_bits).collect();
            distinct.sort_unstable();
            distinct.dedup();
            (distinct.len() > 1).then(|| ConflictingKey {
                key,
                rows: values.len(),
                values,
            })
        })
        .collect();

    ConflictReport { conflicts }
}
