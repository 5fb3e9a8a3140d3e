//! End-to-end runs, one per map kind: load, aggregate, join, compose.

mod communes;
mod departements;

use anyhow::{Context, Result};
use log::info;
use polars::prelude::*;

use crate::config::{Config, KindConfig};
use crate::geom::FeatureCollection;
use crate::join::{JoinReport, RegionJoiner};
use crate::label::LabelTranslator;
use crate::region::RegionKind;
use crate::render::{LayerComposer, MapArtifact, PopupRoute};
use crate::source::{Source, load_labels};
use crate::stats::{AggregateTable, Aggregator};
use crate::tooltip::TooltipFormatter;

pub use communes::run as run_communes;
pub use departements::run as run_departements;

/// Everything one pipeline run produces.
#[derive(Debug)]
pub struct PipelineOutput {
    pub kind: RegionKind,
    pub table: AggregateTable,
    pub joined: JoinReport,
    pub map: MapArtifact,
}

/// Build the map of `kind` as described by `config`.
pub fn run(kind: RegionKind, config: &Config, source: &dyn Source) -> Result<PipelineOutput> {
    let kind_config = config.kind(kind)?;
    info!("[pipeline] building {kind} map");
    match kind {
        RegionKind::Departement => departements::run(config, kind_config, source),
        RegionKind::Commune => communes::run(config, kind_config, source),
    }
}

/// Apply configured renames, then scale probability columns to percent.
pub(crate) fn prepare_observations(mut df: DataFrame, kind_config: &KindConfig) -> Result<DataFrame> {
    for (old, new) in &kind_config.rename {
        if df.column(old).is_err() { continue }
        df.rename(old, new.as_str().into())
            .with_context(|| format!("[pipeline::prepare_observations] Failed to rename {old:?} to {new:?}"))?;
    }

    for name in &kind_config.percent {
        let Ok(column) = df.column(name) else { continue };
        let values: Vec<Option<f64>> = column.cast(&DataType::Float64)?
            .f64()?
            .into_iter()
            .map(|v| v.map(|x| x * 100.0))
            .collect();
        df.with_column(Column::new(name.as_str().into(), values))?;
    }
    Ok(df)
}

/// Aggregate observations by the configured key, ordered by the metric's median.
pub(crate) fn aggregate(df: &DataFrame, kind_config: &KindConfig) -> Result<AggregateTable> {
    Aggregator::new(&kind_config.key_columns)
        .exclude(&kind_config.exclude)
        .sort_by(kind_config.median_column())
        .aggregate(df)
}

/// Translate, join and compose: everything downstream of the aggregate table.
pub(crate) fn annotate(
    kind: RegionKind,
    config: &Config,
    kind_config: &KindConfig,
    source: &dyn Source,
    table: &AggregateTable,
    geometry: &FeatureCollection,
) -> Result<(JoinReport, MapArtifact)> {
    let dictionary = load_labels(source, &kind_config.labels, kind_config.dictionary)?;
    let structural: Vec<(&str, &str)> = kind_config.structural.iter()
        .map(|(field, label)| (field.as_str(), label.as_str()))
        .collect();
    let translator = LabelTranslator::new(dictionary, &structural);
    let formatter = TooltipFormatter::new(&translator)
        .reserved(&kind_config.reserved)
        .policy(kind_config.zero_ratio);

    let joined = RegionJoiner::new(&kind_config.data_on, &kind_config.geo_on, kind_config.matcher.matcher())
        .join(table, geometry, &formatter)?;

    let popup = kind_config.popup.as_ref().map(|p| PopupRoute {
        site_root: config.site_root.clone(),
        route: p.route.clone(),
        name_property: p.name_property.clone(),
    });
    let legend = match kind_config.legend.as_str() {
        "" => translator.label_or_raw(&kind_config.median_column()).to_string(),
        legend => legend.to_string(),
    };
    let map = LayerComposer::new(kind_config.key_on.clone(), &kind_config.choropleth_key, kind_config.median_column())
        .legend(legend)
        .header(translator.label_or_raw(&kind_config.data_on), &kind_config.geo_on)
        .line_opacity(kind_config.line_opacity)
        .popup(popup)
        .title(format!("{} score map", kind.display_name()))
        .compose(table, geometry, &joined)?;

    Ok((joined, map))
}
