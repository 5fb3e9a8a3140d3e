//! Wide and long (melted) tabular forms of an [`AggregateTable`].

use std::path::Path;

use anyhow::{Context, Result, bail};
use log::info;
use polars::lazy::frame::pivot::pivot_stable;
use polars::prelude::*;

use crate::common::{read_parquet_bytes, write_atomic, write_parquet_bytes};
use crate::stats::{AggregateTable, Statistic, derived_column, split_derived_column};

/// Column holding the cell value in the long table.
pub const LONG_VALUE: &str = "datum";
/// Column holding the metric name in the long table.
pub const LONG_VARIABLE: &str = "variable";
/// Column holding the statistic tag in the long table.
pub const LONG_STATISTIC: &str = "statistic";

/// Recombined `<variable>_<statistic>` name while pivoting back to wide.
const DERIVED: &str = "derived";

impl AggregateTable {
    /// One row per region, one column per metric x statistic.
    pub fn to_wide(&self) -> Result<DataFrame> {
        let mut columns = Vec::with_capacity(self.key_columns.len() + self.metrics.len() * Statistic::PER_METRIC);

        for (i, name) in self.key_columns.iter().enumerate() {
            let values: Vec<&str> = self.records.iter().map(|r| r.key.parts()[i].as_ref()).collect();
            columns.push(Column::new(name.as_str().into(), values));
        }

        for metric in &self.metrics {
            for stat in Statistic::all() {
                let values: Vec<Option<f64>> = self.records.iter().map(|r| self.get(r, metric, stat)).collect();
                columns.push(Column::new(derived_column(metric, stat).into(), values));
            }
        }

        Ok(DataFrame::new(columns)?)
    }

    /// Rebuild a table from its wide form. Metrics are discovered from `<metric>_mean` columns.
    pub fn from_wide<S: AsRef<str>>(df: &DataFrame, key_columns: &[S]) -> Result<Self> {
        let key_columns: Vec<String> = key_columns.iter().map(|s| s.as_ref().to_string()).collect();
        let metrics: Vec<String> = df.get_columns().iter()
            .filter_map(|c| c.name().as_str().strip_suffix("_mean").map(str::to_string))
            .collect();
        Self::from_frame(df, key_columns, metrics)
    }

    /// Write `<stem>.wide.parquet` and `<stem>.long.parquet` into `dir`.
    pub fn save_tables(&self, dir: &Path, stem: &str) -> Result<()> {
        let wide = self.to_wide()?;
        let long = wide_to_long(&wide, &self.key_columns)?;

        let wide_path = dir.join(format!("{stem}.wide.parquet"));
        let long_path = dir.join(format!("{stem}.long.parquet"));
        write_atomic(&wide_path, &write_parquet_bytes(&wide)?)?;
        write_atomic(&long_path, &write_parquet_bytes(&long)?)?;

        info!("[export] {} / {}", wide_path.display(), long_path.display());
        Ok(())
    }

    /// Read a table previously written by [`AggregateTable::save_tables`] (wide form).
    pub fn load_wide<S: AsRef<str>>(path: &Path, key_columns: &[S]) -> Result<Self> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("[AggregateTable::load_wide] Failed to read {}", path.display()))?;
        Self::from_wide(&read_parquet_bytes(&bytes)?, key_columns)
    }
}

/// Melt a wide table: one row per id x derived column, with the column name
/// split on its rightmost underscore into `variable` and `statistic`.
pub fn wide_to_long<S: AsRef<str>>(wide: &DataFrame, id_vars: &[S]) -> Result<DataFrame> {
    let id_vars: Vec<&str> = id_vars.iter().map(|s| s.as_ref()).collect();

    let mut on = Vec::new();
    for name in wide.get_column_names() {
        if id_vars.contains(&name.as_str()) { continue }
        if split_derived_column(name).is_none() {
            bail!("[wide_to_long] Column {name:?} has no statistic suffix");
        }
        on.push(name.clone());
    }

    let melted = wide.unpivot(on, id_vars.iter().copied())?;

    let mut columns: Vec<Expr> = id_vars.iter().map(|name| col(*name)).collect();
    columns.push(col("value").cast(DataType::Float64).alias(LONG_VALUE));
    columns.push(col("variable").str().extract(lit(r"^(.*)_[^_]*$"), 1).alias(LONG_VARIABLE));
    columns.push(col("variable").str().extract(lit(r"_([^_]*)$"), 1).alias(LONG_STATISTIC));

    Ok(melted.lazy().select(columns).collect()?)
}

/// Inverse of [`wide_to_long`]. Rows and columns keep first-seen order.
pub fn long_to_wide<S: AsRef<str>>(long: &DataFrame, id_vars: &[S]) -> Result<DataFrame> {
    let id_vars: Vec<&str> = id_vars.iter().map(|s| s.as_ref()).collect();

    let (variable, statistic) = (long.column(LONG_VARIABLE)?, long.column(LONG_STATISTIC)?);
    if variable.null_count() > 0 || statistic.null_count() > 0 {
        bail!("[long_to_wide] Null variable or statistic");
    }

    let mut columns: Vec<Expr> = id_vars.iter().map(|name| col(*name)).collect();
    columns.push(concat_str([col(LONG_VARIABLE), col(LONG_STATISTIC)], "_", false).alias(DERIVED));
    columns.push(col(LONG_VALUE).cast(DataType::Float64));
    let keyed = long.clone().lazy().select(columns).collect()?;

    Ok(pivot_stable(&keyed, [DERIVED], Some(id_vars), Some([LONG_VALUE]), false, None, None)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::Aggregator;

    fn table() -> AggregateTable {
        let df = DataFrame::new(vec![
            Column::new("num_dept".into(), ["75", "13", "75", "13", "69"]),
            Column::new("name_dept".into(), ["Paris", "Bouches-du-Rhône", "Paris", "Bouches-du-Rhône", "Rhône"]),
            Column::new("prob_volt".into(), [4.0, 1.0, 6.0, 2.5, 3.0]),
            Column::new("age_mean".into(), [41.0, 39.5, 44.0, 37.0, 40.0]),
        ]).unwrap();
        Aggregator::new(&["num_dept", "name_dept"]).aggregate(&df).unwrap()
    }

    fn same_cells(a: &DataFrame, b: &DataFrame) {
        assert_eq!(a.height(), b.height());
        assert_eq!(a.width(), b.width());
        for col in a.get_columns() {
            let other = b.column(col.name().as_str()).unwrap();
            assert!(col.as_materialized_series().equals_missing(other.as_materialized_series()), "column {}", col.name());
        }
    }

    #[test]
    fn wide_has_102_columns_per_metric() {
        let t = table();
        let wide = t.to_wide().unwrap();
        assert_eq!(wide.width(), 2 + 2 * 102);
        assert_eq!(wide.height(), 3);
        assert!(wide.column("prob_volt_q99").is_ok());
        assert!(wide.column("age_mean_mean").is_ok());
    }

    #[test]
    fn long_splits_on_rightmost_underscore() {
        let t = table();
        let long = wide_to_long(&t.to_wide().unwrap(), t.key_columns()).unwrap();
        assert_eq!(long.height(), 3 * 2 * 102);
        let vars: Vec<_> = long.column(LONG_VARIABLE).unwrap().str().unwrap().into_iter().flatten().collect();
        assert!(vars.contains(&"age_mean"));
        assert!(!vars.contains(&"age"));
    }

    #[test]
    fn wide_long_wide_roundtrip() {
        let t = table();
        let wide = t.to_wide().unwrap();
        let back = long_to_wide(&wide_to_long(&wide, t.key_columns()).unwrap(), t.key_columns()).unwrap();
        same_cells(&wide, &back);
    }

    #[test]
    fn table_rebuilds_from_wide() {
        let t = table();
        let rebuilt = AggregateTable::from_wide(&t.to_wide().unwrap(), t.key_columns()).unwrap();
        assert_eq!(rebuilt.metrics(), t.metrics());
        same_cells(&t.to_wide().unwrap(), &rebuilt.to_wide().unwrap());
    }

    #[test]
    fn parquet_export_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let t = table();
        t.save_tables(dir.path(), "departement.lvl.aggregate.metadata").unwrap();
        let loaded = AggregateTable::load_wide(
            &dir.path().join("departement.lvl.aggregate.metadata.wide.parquet"),
            t.key_columns(),
        ).unwrap();
        same_cells(&t.to_wide().unwrap(), &loaded.to_wide().unwrap());
        assert!(dir.path().join("departement.lvl.aggregate.metadata.long.parquet").exists());
    }
}
