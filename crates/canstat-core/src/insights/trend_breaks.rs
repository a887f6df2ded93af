use serde::{Deserialize, Serialize};

use super::stats::{is_constant, mean, spread_floor, two_sided_p, welch_t_test, CONSTANT_EPSILON};
use super::{Series, SeriesRef, SeriesTable};

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TrendBreakOptions {
    pub min_years: usize,
    /// Points required on each side of a split.
    pub min_side: usize,
    /// Series whose best split has `|t|` below this are dropped.
    pub t_floor: f64,
}

impl Default for TrendBreakOptions {
    fn default() -> Self {
        Self {
            min_years: 10,
            min_side: 4,
            t_floor: 3.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BreakDirection {
    Increase,
    Decrease,
}

impl BreakDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            BreakDirection::Increase => "increase",
            BreakDirection::Decrease => "decrease",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TrendBreak {
    pub series: SeriesRef,
    /// First year of the later segment.
    pub break_year: i32,
    pub mean_before: f64,
    pub mean_after: f64,
    pub change_pct: f64,
    /// Welch t of before against after; negative for an increase.
    pub t_statistic: f64,
    pub p_value: f64,
    pub direction: BreakDirection,
    pub year_range: String,
}

#[derive(Debug, Clone, Copy)]
struct Split {
    index: usize,
    t: f64,
    p: f64,
    mean_before: f64,
    mean_after: f64,
}

pub fn detect_trend_breaks(table: &SeriesTable, options: &TrendBreakOptions) -> Vec<TrendBreak> {
    let mut breaks: Vec<TrendBreak> = table
        .iter()
        .filter_map(|series| best_break(series, options))
        .collect();
    breaks.sort_by(|a, b| b.t_statistic.abs().total_cmp(&a.t_statistic.abs()));
    breaks
}

fn best_break(series: &Series, options: &TrendBreakOptions) -> Option<TrendBreak> {
    let years = series.years();
    let values = series.values();
    let min_side = options.min_side.max(2);
    if values.len() < options.min_years || values.len() < 2 * min_side || is_constant(&values) {
        return None;
    }

    let mut best: Option<Split> = None;
    for index in min_side..=values.len() - min_side {
        let Some(split) = score_split(&values, index) else {
            continue;
        };
        if best.map_or(true, |current| split.t.abs() > current.t.abs()) {
            best = Some(split);
        }
    }

    let best = best?;
    if best.t.abs() < options.t_floor {
        return None;
    }

    let change_pct = if best.mean_before == 0.0 {
        0.0
    } else {
        (best.mean_after - best.mean_before) / best.mean_before.abs() * 100.0
    };

    Some(TrendBreak {
        series: series.reference(),
        break_year: years[best.index],
        mean_before: best.mean_before,
        mean_after: best.mean_after,
        change_pct,
        t_statistic: best.t,
        p_value: best.p,
        direction: if best.mean_after > best.mean_before {
            BreakDirection::Increase
        } else {
            BreakDirection::Decrease
        },
        year_range: format!("{}-{}", years[0], years[years.len() - 1]),
    })
}

fn score_split(values: &[f64], index: usize) -> Option<Split> {
    let (before, after) = values.split_at(index);
    let mean_before = mean(before);
    let mean_after = mean(after);

    let (t, p) = if is_constant(before) && is_constant(after) {
        // A clean step has no within-segment noise; score it against a floor so
        // it ranks above any noisy split.
        let delta = mean_before - mean_after;
        if delta.abs() < CONSTANT_EPSILON {
            return None;
        }
        let t = delta / spread_floor(mean_before);
        (t, two_sided_p(t, (values.len() - 2) as f64))
    } else {
        let test = welch_t_test(before, after)?;
        (test.t, test.p)
    };

    Some(Split {
        index,
        t,
        p,
        mean_before,
        mean_after,
    })
}
