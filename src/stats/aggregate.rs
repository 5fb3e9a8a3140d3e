use std::{collections::HashSet, fmt, sync::Arc};

use anyhow::{Context, Result, ensure};
use log::{debug, info, warn};
use polars::prelude::*;

use crate::error::PipelineError;
use crate::stats::{MetricStats, QUANTILE_COUNT, metric_aggregations};

/// A derived statistic of a metric column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Statistic {
    Mean,
    Std,
    Quantile(u8),
}

impl Statistic {
    /// Number of derived columns produced per metric.
    pub const PER_METRIC: usize = 2 + QUANTILE_COUNT;

    /// All derived statistics, in column order: mean, std, q0..q99.
    pub fn all() -> impl Iterator<Item = Statistic> {
        [Statistic::Mean, Statistic::Std].into_iter()
            .chain((0..QUANTILE_COUNT as u8).map(Statistic::Quantile))
    }

    pub fn tag(&self) -> String {
        match self {
            Statistic::Mean => "mean".into(),
            Statistic::Std => "std".into(),
            Statistic::Quantile(i) => format!("q{i}"),
        }
    }

    /// Parse a statistic tag; `median` is accepted as an alias of `q50`.
    pub fn parse(tag: &str) -> Option<Self> {
        match tag {
            "mean" => Some(Statistic::Mean),
            "std" => Some(Statistic::Std),
            "median" => Some(Statistic::Quantile(50)),
            _ => tag.strip_prefix('q')
                .and_then(|n| n.parse::<u8>().ok())
                .filter(|&i| (i as usize) < QUANTILE_COUNT)
                .map(Statistic::Quantile),
        }
    }

    #[inline] pub fn median() -> Self { Statistic::Quantile(50) }
}

/// Name of the derived column `<metric>_<tag>`.
pub fn derived_column(metric: &str, stat: Statistic) -> String {
    format!("{metric}_{}", stat.tag())
}

/// Split a derived column name on its rightmost underscore into (metric, tag).
pub fn split_derived_column(name: &str) -> Option<(&str, &str)> {
    name.rfind('_').map(|i| (&name[..i], &name[i + 1..]))
}

/// Composite region identifier: one value per key column, in key-column order.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RegionKey(Vec<Arc<str>>);

impl RegionKey {
    pub fn new<S: AsRef<str>>(parts: &[S]) -> Self {
        Self(parts.iter().map(|s| Arc::from(s.as_ref())).collect())
    }

    #[inline] pub fn parts(&self) -> &[Arc<str>] { &self.0 }
}

impl fmt::Display for RegionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<&str> = self.0.iter().map(|s| s.as_ref()).collect();
        write!(f, "{}", parts.join(" / "))
    }
}

/// One aggregated row: the region key and, per metric, its derived statistics
/// (None when the metric had no numeric data in this region).
#[derive(Debug, Clone)]
pub struct AggregateRecord {
    pub key: RegionKey,
    pub stats: Vec<Option<MetricStats>>,
}

/// Aggregated statistics, one record per distinct region key. Read-only once built.
#[derive(Debug, Clone)]
pub struct AggregateTable {
    pub(crate) key_columns: Vec<String>,
    pub(crate) metrics: Vec<String>,
    pub(crate) records: Vec<AggregateRecord>,
}

impl AggregateTable {
    pub(crate) fn new(key_columns: Vec<String>, metrics: Vec<String>, records: Vec<AggregateRecord>) -> Self {
        Self { key_columns, metrics, records }
    }

    #[inline] pub fn len(&self) -> usize { self.records.len() }

    #[inline] pub fn is_empty(&self) -> bool { self.records.is_empty() }

    #[inline] pub fn key_columns(&self) -> &[String] { &self.key_columns }

    #[inline] pub fn metrics(&self) -> &[String] { &self.metrics }

    #[inline] pub fn records(&self) -> &[AggregateRecord] { &self.records }

    /// Index of a metric column, if aggregated.
    pub fn metric_index(&self, metric: &str) -> Option<usize> {
        self.metrics.iter().position(|m| m == metric)
    }

    /// Value of a key column for a record.
    pub fn key_value<'a>(&self, record: &'a AggregateRecord, column: &str) -> Option<&'a str> {
        self.key_columns.iter().position(|c| c == column)
            .and_then(|i| record.key.parts().get(i))
            .map(|s| s.as_ref())
    }

    /// A derived statistic of `metric` for a record.
    pub fn get(&self, record: &AggregateRecord, metric: &str, stat: Statistic) -> Option<f64> {
        let stats = record.stats.get(self.metric_index(metric)?)?.as_ref()?;
        match stat {
            Statistic::Mean => Some(stats.mean),
            Statistic::Std => stats.std,
            Statistic::Quantile(i) => stats.quantile(i as usize),
        }
    }

    /// A derived statistic looked up by its combined column name, e.g. `prob_volt_q50`.
    pub fn get_column(&self, record: &AggregateRecord, column: &str) -> Option<f64> {
        let (metric, tag) = split_derived_column(column)?;
        self.get(record, metric, Statistic::parse(tag)?)
    }

    /// Build the table from a frame holding the key columns and the derived
    /// columns of every metric. A metric whose mean is null for a row is
    /// empty for that region.
    pub(crate) fn from_frame(df: &DataFrame, key_columns: Vec<String>, metrics: Vec<String>) -> Result<Self> {
        let keys = key_columns.iter()
            .map(|name| Ok(df.column(name)
                .map_err(|_| PipelineError::data(name, "missing region key column"))?
                .cast(&DataType::String)?))
            .collect::<Result<Vec<Column>>>()?;
        let keys = keys.iter()
            .map(|c| Ok(c.str()?.into_iter().map(|v| v.unwrap_or_default()).collect::<Vec<&str>>()))
            .collect::<Result<Vec<_>>>()?;

        let read = |metric: &str, stat: Statistic| -> Result<Vec<Option<f64>>> {
            let name = derived_column(metric, stat);
            let col = df.column(&name)
                .with_context(|| format!("[AggregateTable::from_frame] Missing derived column {name:?}"))?
                .cast(&DataType::Float64)?;
            Ok(col.f64()?.into_iter().collect())
        };
        let per_metric = metrics.iter()
            .map(|metric| Statistic::all().map(|stat| read(metric, stat)).collect::<Result<Vec<_>>>())
            .collect::<Result<Vec<_>>>()?;

        let records = (0..df.height())
            .map(|row| {
                let key = RegionKey::new(&keys.iter().map(|k| k[row]).collect::<Vec<_>>());
                let stats = metrics.iter().zip(&per_metric)
                    .map(|(metric, cols)| {
                        let stats = metric_stats(cols, row);
                        if stats.is_none() {
                            debug!("{} for region {key}", PipelineError::data(metric, "no numeric data"));
                        }
                        stats
                    })
                    .collect();
                AggregateRecord { key, stats }
            })
            .collect();

        Ok(Self::new(key_columns, metrics, records))
    }
}

/// Statistics of one metric at `row`, from its derived columns in [`Statistic::all`] order.
fn metric_stats(cols: &[Vec<Option<f64>>], row: usize) -> Option<MetricStats> {
    let mean = cols[0][row]?;
    let mut quantiles = [0.0; QUANTILE_COUNT];
    for (i, q) in quantiles.iter_mut().enumerate() {
        *q = cols[2 + i][row]?;
    }
    Some(MetricStats { mean, std: cols[1][row], quantiles })
}

/// Groups observation rows by region key and derives per-metric statistics.
#[derive(Debug, Clone)]
pub struct Aggregator {
    key_columns: Vec<String>,
    excluded: HashSet<String>,
    sort_by: Option<String>,
}

impl Aggregator {
    pub fn new<S: AsRef<str>>(key_columns: &[S]) -> Self {
        Self {
            key_columns: key_columns.iter().map(|s| s.as_ref().to_string()).collect(),
            excluded: HashSet::new(),
            sort_by: None,
        }
    }

    /// Identifier columns that must not be aggregated.
    pub fn exclude<S: AsRef<str>>(mut self, columns: &[S]) -> Self {
        self.excluded.extend(columns.iter().map(|s| s.as_ref().to_string()));
        self
    }

    /// Sort the resulting records ascending by this derived column (e.g. `prob_volt_q50`).
    pub fn sort_by(mut self, column: impl Into<String>) -> Self {
        self.sort_by = Some(column.into());
        self
    }

    /// Aggregate `df`, producing exactly one record per distinct region key,
    /// in first-seen order unless sorted. Rows with a null key value are
    /// ignored. Non-numeric metric columns are skipped entirely; a metric with
    /// no numeric data in a region is left empty for that region only.
    pub fn aggregate(&self, df: &DataFrame) -> Result<AggregateTable> {
        let mut columns = Vec::with_capacity(df.width());
        for name in &self.key_columns {
            let col = df.column(name)
                .map_err(|_| PipelineError::data(name, "missing region key column"))?;
            columns.push(col.cast(&DataType::String)?);
        }

        let mut metrics = Vec::new();
        for col in df.get_columns() {
            let name = col.name().as_str();
            if self.key_columns.iter().any(|k| k == name) || self.excluded.contains(name) { continue }
            match col.strict_cast(&DataType::Float64) {
                Ok(cast) => {
                    metrics.push(name.to_string());
                    columns.push(cast);
                }
                Err(e) => warn!("{}; column skipped", PipelineError::data(name, format!("not numeric ({e})"))),
            }
        }

        let keyed = self.key_columns.iter()
            .map(|k| col(k.as_str()).is_not_null())
            .reduce(|a, b| a.and(b))
            .unwrap_or(lit(true));
        let observations = DataFrame::new(columns)?.lazy().filter(keyed).collect()?;
        let skipped = df.height() - observations.height();
        if skipped > 0 { debug!("[aggregate] ignored {skipped} rows with a null region key") }

        let mut grouped = observations.lazy()
            .group_by_stable(self.key_columns.iter().map(|k| col(k.as_str())).collect::<Vec<_>>())
            .agg(metrics.iter().flat_map(|m| metric_aggregations(m)).collect::<Vec<_>>());

        if let Some(column) = &self.sort_by {
            let (metric, tag) = split_derived_column(column)
                .with_context(|| format!("[Aggregator::aggregate] Not a derived column: {column:?}"))?;
            let stat = Statistic::parse(tag)
                .with_context(|| format!("[Aggregator::aggregate] Unknown statistic {tag:?} in {column:?}"))?;
            ensure!(metrics.iter().any(|m| m == metric), PipelineError::data(metric, "sort column was not aggregated"));
            grouped = grouped.sort([derived_column(metric, stat)], SortMultipleOptions::default().with_nulls_last(true).with_maintain_order(true));
        }

        let table = AggregateTable::from_frame(&grouped.collect()?, self.key_columns.clone(), metrics)?;

        info!("[aggregate] {} regions x {} metrics ({} derived columns)",
            table.len(), table.metrics().len(), table.metrics().len() * Statistic::PER_METRIC);

        Ok(table)
    }
}
