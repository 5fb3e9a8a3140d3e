use std::collections::HashMap;

use anyhow::{Context, Result};
use log::info;
use polars::prelude::*;

use crate::config::{Config, DissolveConfig, KindConfig};
use crate::error::PipelineError;
use crate::geom::Dissolver;
use crate::pipeline::{PipelineOutput, aggregate, annotate, prepare_observations};
use crate::region::RegionKind;
use crate::source::{Source, load_geometry, load_metadata};

/// Commune map: per-station polygons dissolved into one boundary per commune,
/// with observations aggregated under the dissolved region id.
pub fn run(config: &Config, kind_config: &KindConfig, source: &dyn Source) -> Result<PipelineOutput> {
    let dissolve = kind_config.dissolve.as_ref()
        .context("[pipeline::communes] No dissolve settings configured")?;

    let stations = load_geometry(source, &kind_config.geometry)?;
    let mut dissolver = Dissolver::new(&dissolve.name).tolerance(dissolve.tolerance);
    if let Some(parent) = &dissolve.parent { dissolver = dissolver.parent(parent) }
    let dissolved = dissolver.dissolve(&stations)?;

    let df = match &kind_config.metadata {
        Some(location) => load_metadata(source, location)?,
        None => stations.properties_frame()?,
    };
    let df = with_region_ids(df, dissolve, &dissolved.ids)?;
    let df = prepare_observations(df, kind_config)?;
    let table = aggregate(&df, kind_config)?;

    let (joined, map) = annotate(RegionKind::Commune, config, kind_config, source, &table, &dissolved.collection)?;

    info!("[pipeline::communes] {} stations -> {} communes, {} tooltip features",
        stations.len(), table.len(), joined.len());
    Ok(PipelineOutput { kind: RegionKind::Commune, table, joined, map })
}

/// Replace the id column with each row's dissolved region id.
fn with_region_ids(mut df: DataFrame, dissolve: &DissolveConfig, ids: &HashMap<String, u32>) -> Result<DataFrame> {
    let names = df.column(&dissolve.name)
        .map_err(|_| PipelineError::data(&dissolve.name, "missing region name column"))?
        .cast(&DataType::String)?;
    let region_ids: Vec<Option<u32>> = names.str()?
        .into_iter()
        .map(|name| name.and_then(|n| ids.get(n).copied()))
        .collect();

    if df.column(&dissolve.id_column).is_ok() {
        df = df.drop(&dissolve.id_column)?;
    }
    df.with_column(Column::new(dissolve.id_column.as_str().into(), region_ids))?;
    Ok(df)
}
