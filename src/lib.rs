#![doc = "frgeostat public API"]
mod common;
mod error;
mod geom;
mod join;
mod label;
mod region;
mod render;
mod source;
mod stats;
mod tooltip;

pub mod cli;
pub mod commands;
pub mod config;
pub mod pipeline;

#[doc(inline)]
pub use error::{PipelineError, PipelineResult};

#[doc(inline)]
pub use region::RegionKind;

#[doc(inline)]
pub use stats::{
    AggregateRecord, AggregateTable, Aggregator, MetricStats, QUANTILE_COUNT, RegionKey, Statistic,
    LONG_STATISTIC, LONG_VALUE, LONG_VARIABLE, derived_column, long_to_wide, split_derived_column, wide_to_long,
};

#[doc(inline)]
pub use geom::{DEFAULT_TOLERANCE, Dissolved, Dissolver, Feature, FeatureCollection};

#[doc(inline)]
pub use label::{DictOrientation, LabelDictionary, LabelTranslator};

#[doc(inline)]
pub use join::{ContainmentMatch, ExactMatch, JoinReport, JoinedFeature, MatchStrategy, Matcher, NormalizedMatch, RegionJoiner, process_name};

#[doc(inline)]
pub use tooltip::{Summary, TooltipEntry, TooltipFormatter, ZeroRatioPolicy};

#[doc(inline)]
pub use render::{
    ChoroplethLayer, ColorScale, KeyOn, LayerComposer, MISSING, MapArtifact, MapFrame, PopupRoute, Rgb, TooltipFeature,
    YL_GN, framed_bounds, write_map_html,
};

#[doc(inline)]
pub use source::{DiskSource, MemSource, RoutedSource, Source, load_geometry, load_labels, load_metadata};

#[cfg(feature = "download")]
#[doc(inline)]
pub use source::HttpSource;
