// src/aggregate/stats.rs
//
// Cross-run statistics. Quantiles use linear interpolation between order
// statistics (the "type 7" estimator), so 25/50/75 of [10, 20, 30] are
// 15, 20 and 25.

/// Statistics reported for every metric, in column order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Statistic {
    Mean,
    Median,
    Q25,
    Q75,
}

impl Statistic {
    pub const ALL: [Statistic; 4] = [
        Statistic::Mean,
        Statistic::Median,
        Statistic::Q25,
        Statistic::Q75,
    ];

    pub fn suffix(&self) -> &'static str {
        match self {
            Statistic::Mean => "_mean",
            Statistic::Median => "_median",
            Statistic::Q25 => "_q25",
            Statistic::Q75 => "_q75",
        }
    }
}

/// The four statistics of one metric over one distribution of run sums.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Summary {
    pub mean: f64,
    pub median: f64,
    pub q25: f64,
    pub q75: f64,
}

impl Summary {
    /// Compute all four statistics from the same values. Empty input gives NaN.
    pub fn of(values: &[f64]) -> Self {
        let mut sorted = values.to_vec();
        sorted.sort_by(f64::total_cmp);
        Self {
            mean: mean(&sorted),
            median: quantile_sorted(&sorted, 0.5),
            q25: quantile_sorted(&sorted, 0.25),
            q75: quantile_sorted(&sorted, 0.75),
        }
    }

    pub fn get(&self, stat: Statistic) -> f64 {
        match stat {
            Statistic::Mean => self.mean,
            Statistic::Median => self.median,
            Statistic::Q25 => self.q25,
            Statistic::Q75 => self.q75,
        }
    }
}

/// Mean of an ascending slice, held inside `[first, last]` so rounding in
/// the sum cannot push it past the extremes.
fn mean(sorted: &[f64]) -> f64 {
    let (Some(&lo), Some(&hi)) = (sorted.first(), sorted.last()) else {
        return f64::NAN;
    };
    let mean = sorted.iter().sum::<f64>() / sorted.len() as f64;
    // NaN sorts last, and clamp would panic on it
    if lo <= hi {
        mean.clamp(lo, hi)
    } else {
        mean
    }
}

/// Quantile `p` in [0, 1] of an ascending slice, interpolating linearly
/// between the two nearest order statistics.
pub fn quantile_sorted(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return f64::NAN;
    }
    let n = sorted.len();
    if n == 1 {
        return sorted[0];
    }
    let idx = p.clamp(0.0, 1.0) * (n - 1) as f64;
    let lo = idx.floor() as usize;
    let hi = idx.ceil() as usize;
    if lo == hi {
        return sorted[lo];
    }
    let w = idx - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * w
}
