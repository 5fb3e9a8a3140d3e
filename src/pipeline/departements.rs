use anyhow::{Context, Result};
use log::info;

use crate::config::{Config, KindConfig};
use crate::pipeline::{PipelineOutput, aggregate, annotate, prepare_observations};
use crate::region::RegionKind;
use crate::source::{Source, load_geometry, load_metadata};

/// Département map: station metadata aggregated per département, shaded over
/// externally supplied département boundaries.
pub fn run(config: &Config, kind_config: &KindConfig, source: &dyn Source) -> Result<PipelineOutput> {
    let location = kind_config.metadata.as_deref()
        .context("[pipeline::departements] No metadata source configured")?;
    let df = prepare_observations(load_metadata(source, location)?, kind_config)?;
    let table = aggregate(&df, kind_config)?;

    let geometry = load_geometry(source, &kind_config.geometry)?;
    let (joined, map) = annotate(RegionKind::Departement, config, kind_config, source, &table, &geometry)?;

    info!("[pipeline::departements] {} départements, {} tooltip features", table.len(), joined.len());
    Ok(PipelineOutput { kind: RegionKind::Departement, table, joined, map })
}
