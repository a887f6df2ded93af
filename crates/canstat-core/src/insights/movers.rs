use serde::{Deserialize, Serialize};

use super::stats::{mean, population_std, spread_floor, CONSTANT_EPSILON};
use super::{Series, SeriesRef, SeriesTable};

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MoverOptions {
    /// Trailing points compared against the rest of the series.
    pub window: usize,
    /// Historical points required before the window.
    pub min_history: usize,
    pub z_threshold: f64,
    /// Smallest `|recent - historical| / max(1, |historical|)` that still counts
    /// as a move when the history is flat.
    pub min_relative_change: f64,
}

impl Default for MoverOptions {
    fn default() -> Self {
        Self {
            window: 5,
            min_history: 5,
            z_threshold: 2.0,
            min_relative_change: 0.01,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MoverDirection {
    Rising,
    Falling,
}

impl MoverDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            MoverDirection::Rising => "rising",
            MoverDirection::Falling => "falling",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MoverRecord {
    pub series: SeriesRef,
    pub recent_mean: f64,
    pub historical_mean: f64,
    pub z_score: f64,
    pub direction: MoverDirection,
    pub latest_year: i32,
}

pub fn detect_movers(table: &SeriesTable, options: &MoverOptions) -> Vec<MoverRecord> {
    let mut movers: Vec<MoverRecord> = table
        .iter()
        .filter_map(|series| score_series(series, options))
        .collect();
    movers.sort_by(|a, b| b.z_score.abs().total_cmp(&a.z_score.abs()));
    movers
}

fn score_series(series: &Series, options: &MoverOptions) -> Option<MoverRecord> {
    let window = options.window.max(1);
    let values = series.values();
    if values.len() < window + options.min_history.max(1) {
        return None;
    }

    let (historical, recent) = values.split_at(values.len() - window);
    let historical_mean = mean(historical);
    let recent_mean = mean(recent);
    let delta = recent_mean - historical_mean;

    let mut spread = population_std(historical);
    if spread < CONSTANT_EPSILON {
        let relative = delta.abs() / historical_mean.abs().max(1.0);
        if delta.abs() < CONSTANT_EPSILON || relative < options.min_relative_change {
            return None;
        }
        spread = spread_floor(historical_mean);
    }

    let z_score = delta / spread;
    if !(z_score.abs() > options.z_threshold) {
        return None;
    }

    Some(MoverRecord {
        series: series.reference(),
        recent_mean,
        historical_mean,
        z_score,
        direction: if z_score > 0.0 {
            MoverDirection::Rising
        } else {
            MoverDirection::Falling
        },
        latest_year: series.points.keys().next_back().copied()?,
    })
}
