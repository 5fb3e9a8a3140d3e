mod aggregate;
mod export;
mod quantile;

pub use aggregate::{AggregateRecord, AggregateTable, Aggregator, RegionKey, Statistic, derived_column, split_derived_column};
pub use export::{LONG_STATISTIC, LONG_VALUE, LONG_VARIABLE, long_to_wide, wide_to_long};
pub use quantile::{MetricStats, QUANTILE_COUNT};
pub(crate) use quantile::metric_aggregations;
