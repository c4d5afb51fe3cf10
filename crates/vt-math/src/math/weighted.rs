//! Weighted statistics for abundance-weighted trait spectra.
//!
//! Quantiles use the inverse-CDF (nearest weighted rank) definition: sort by
//! value, accumulate weights, and return the first value whose cumulative
//! weight reaches `q * W`. No interpolation between neighbours.
//!
//! Missing results are `f64::NAN`. An empty or zero-weight input is a normal
//! outcome here, not an error.

use serde::Serialize;

/// Default lower quantile reported as `w_min`.
pub const DEFAULT_Q_LOW: f64 = 0.05;

/// Default upper quantile reported as `w_max`.
pub const DEFAULT_Q_HIGH: f64 = 0.95;

/// Names of the per-unit statistics, in record order.
pub const STAT_FIELDS: [&str; 7] = [
    "n_rows_used",
    "sum_w",
    "cwm",
    "sigma",
    "w_median",
    "w_min",
    "w_max",
];

/// Weighted summary of one survey unit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StatsRecord {
    /// Pairs that survived dropping missing values and non-positive weights.
    pub n_rows_used: usize,
    pub sum_w: f64,
    /// Community-weighted mean.
    pub cwm: f64,
    /// Weighted population standard deviation (no Bessel correction).
    pub sigma: f64,
    pub w_median: f64,
    pub w_min: f64,
    pub w_max: f64,
}

impl StatsRecord {
    /// Record for a unit with nothing usable.
    pub fn empty() -> Self {
        Self {
            n_rows_used: 0,
            sum_w: 0.0,
            cwm: f64::NAN,
            sigma: f64::NAN,
            w_median: f64::NAN,
            w_min: f64::NAN,
            w_max: f64::NAN,
        }
    }

    /// Look up a statistic by its field name.
    pub fn get(&self, field: &str) -> Option<f64> {
        match field {
            "n_rows_used" => Some(self.n_rows_used as f64),
            "sum_w" => Some(self.sum_w),
            "cwm" => Some(self.cwm),
            "sigma" => Some(self.sigma),
            "w_median" => Some(self.w_median),
            "w_min" => Some(self.w_min),
            "w_max" => Some(self.w_max),
            _ => None,
        }
    }
}

/// Weighted quantile `q` of `values` with `weights`.
///
/// Returns NaN for empty input, mismatched lengths, a NaN `q`, or a total
/// weight that is not positive.
pub fn weighted_quantile(values: &[f64], weights: &[f64], q: f64) -> f64 {
    if values.len() != weights.len() {
        return f64::NAN;
    }
    let mut pairs: Vec<(f64, f64)> = values.iter().copied().zip(weights.iter().copied()).collect();
    sort_by_value(&mut pairs);
    let cumulative = cumulative_weights(&pairs);
    quantile_sorted(&pairs, &cumulative, q)
}

/// Weighted spectrum statistics for one unit.
///
/// Pairs with a NaN value, a NaN weight or a weight `<= 0` are dropped
/// first. Mismatched lengths yield [`StatsRecord::empty`].
pub fn compute_stats(values: &[f64], weights: &[f64], q_low: f64, q_high: f64) -> StatsRecord {
    if values.len() != weights.len() {
        return StatsRecord::empty();
    }

    let mut pairs: Vec<(f64, f64)> = values
        .iter()
        .copied()
        .zip(weights.iter().copied())
        .filter(|&(x, w)| !x.is_nan() && w > 0.0)
        .collect();

    if pairs.is_empty() {
        return StatsRecord::empty();
    }

    let sum_w: f64 = pairs.iter().map(|&(_, w)| w).sum();
    if !(sum_w > 0.0) {
        return StatsRecord::empty();
    }

    let cwm = pairs.iter().map(|&(x, w)| w * x).sum::<f64>() / sum_w;
    let var = pairs
        .iter()
        .map(|&(x, w)| {
            let d = x - cwm;
            w * d * d
        })
        .sum::<f64>()
        / sum_w;

    sort_by_value(&mut pairs);
    let cumulative = cumulative_weights(&pairs);

    StatsRecord {
        n_rows_used: pairs.len(),
        sum_w,
        cwm,
        sigma: var.sqrt(),
        w_median: quantile_sorted(&pairs, &cumulative, 0.5),
        w_min: quantile_sorted(&pairs, &cumulative, q_low),
        w_max: quantile_sorted(&pairs, &cumulative, q_high),
    }
}

fn sort_by_value(pairs: &mut [(f64, f64)]) {
    pairs.sort_by(|a, b| a.0.total_cmp(&b.0));
}

fn cumulative_weights(pairs: &[(f64, f64)]) -> Vec<f64> {
    pairs
        .iter()
        .scan(0.0, |acc, &(_, w)| {
            *acc += w;
            Some(*acc)
        })
        .collect()
}

fn quantile_sorted(pairs: &[(f64, f64)], cumulative: &[f64], q: f64) -> f64 {
    let Some(&total) = cumulative.last() else {
        return f64::NAN;
    };
    if !(total > 0.0) || q.is_nan() {
        return f64::NAN;
    }
    let cutoff = q * total;
    // Left-inclusive search: first position whose cumulative weight >= cutoff.
    let idx = cumulative.partition_point(|&c| c < cutoff);
    pairs[idx.min(pairs.len() - 1)].0
}
