use statrs::distribution::{ContinuousCDF, StudentsT};

/// Standard deviations below this count as a constant series.
pub const CONSTANT_EPSILON: f64 = 1e-10;

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation (divides by n).
pub fn population_std(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    let m = mean(values);
    let ss: f64 = values.iter().map(|v| (v - m).powi(2)).sum();
    (ss / values.len() as f64).sqrt()
}

/// Sample variance (divides by n − 1).
pub fn sample_variance(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return f64::NAN;
    }
    let m = mean(values);
    let ss: f64 = values.iter().map(|v| (v - m).powi(2)).sum();
    ss / (values.len() - 1) as f64
}

pub fn is_constant(values: &[f64]) -> bool {
    population_std(values) < CONSTANT_EPSILON
}

/// Smallest spread used when a flat baseline still has to be scored.
pub fn spread_floor(level: f64) -> f64 {
    1e-6 * level.abs().max(1.0)
}

/// Two-sided p-value of a Student t statistic.
pub fn two_sided_p(t: f64, df: f64) -> f64 {
    if t.is_nan() || !(df > 0.0) {
        return 1.0;
    }
    if t.is_infinite() {
        return 0.0;
    }
    StudentsT::new(0.0, 1.0, df)
        .map(|dist| (2.0 * dist.sf(t.abs())).clamp(0.0, 1.0))
        .unwrap_or(1.0)
}

/// Pearson correlation and its two-sided p-value (n − 2 degrees of freedom).
/// `None` when fewer than three points or either side has no variance.
pub fn pearson(x: &[f64], y: &[f64]) -> Option<(f64, f64)> {
    let n = x.len();
    if n < 3 || n != y.len() {
        return None;
    }

    let (mx, my) = (mean(x), mean(y));
    let (mut sxy, mut sxx, mut syy) = (0.0, 0.0, 0.0);
    for (a, b) in x.iter().zip(y) {
        let (dx, dy) = (a - mx, b - my);
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }
    if sxx <= 0.0 || syy <= 0.0 {
        return None;
    }

    let r = (sxy / (sxx * syy).sqrt()).clamp(-1.0, 1.0);
    let df = (n - 2) as f64;
    let residual = 1.0 - r * r;
    let p = if residual <= 0.0 {
        0.0
    } else {
        two_sided_p(r * (df / residual).sqrt(), df)
    };
    Some((r, p))
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WelchTest {
    /// Positive when the first sample has the larger mean.
    pub t: f64,
    pub p: f64,
    pub df: f64,
}

/// Welch's unequal-variance t-test of `before` against `after`. `None` when a
/// side has fewer than two points or the pooled standard error is zero.
pub fn welch_t_test(before: &[f64], after: &[f64]) -> Option<WelchTest> {
    if before.len() < 2 || after.len() < 2 {
        return None;
    }
    let (n1, n2) = (before.len() as f64, after.len() as f64);
    let v1 = sample_variance(before) / n1;
    let v2 = sample_variance(after) / n2;
    let se = (v1 + v2).sqrt();
    if !(se > 0.0) {
        return None;
    }

    let t = (mean(before) - mean(after)) / se;
    let df = (v1 + v2).powi(2) / (v1.powi(2) / (n1 - 1.0) + v2.powi(2) / (n2 - 1.0));
    Some(WelchTest {
        t,
        p: two_sided_p(t, df),
        df,
    })
}
