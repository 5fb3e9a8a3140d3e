//! Descriptive statistics of one metric within one region.

use polars::prelude::*;

use crate::stats::{Statistic, derived_column};

/// Number of integer percentiles in the ladder (0 through 99 inclusive).
pub const QUANTILE_COUNT: usize = 100;

/// Derived statistics of one metric within one region.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricStats {
    pub mean: f64,
    /// Sample standard deviation (ddof = 1); undefined for single-element groups.
    pub std: Option<f64>,
    /// Percentiles 0..=99, linearly interpolated between order statistics.
    pub quantiles: [f64; QUANTILE_COUNT],
}

impl MetricStats {
    #[inline] pub fn median(&self) -> f64 { self.quantiles[50] }

    /// Percentile `i` of the ladder, if in range.
    #[inline] pub fn quantile(&self, i: usize) -> Option<f64> { self.quantiles.get(i).copied() }
}

/// Group-by aggregations producing the derived columns of `metric`, in
/// [`Statistic::all`] order. NaNs count as missing.
pub(crate) fn metric_aggregations(metric: &str) -> Vec<Expr> {
    let values = || col(metric).fill_nan(lit(NULL).cast(DataType::Float64));
    Statistic::all()
        .map(|stat| {
            let expr = match stat {
                Statistic::Mean => values().mean(),
                Statistic::Std => values().std(1),
                Statistic::Quantile(i) => values().quantile(lit(i as f64 / 100.0), QuantileMethod::Linear),
            };
            expr.alias(derived_column(metric, stat))
        })
        .collect()
}
