use anyhow::{Result, ensure};
use geo::{Coord, Rect};
use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::error::PipelineError;
use crate::geom::{Feature, FeatureCollection, value_as_string};
use crate::join::{JoinReport, process_name};
use crate::render::{ColorScale, Rgb, YL_GN};
use crate::stats::AggregateTable;

/// Where the choropleth finds a feature's join key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyOn {
    /// The feature's top-level `id`.
    Id,
    /// A property, e.g. `code`.
    Property(String),
}

impl KeyOn {
    pub fn key(&self, feature: &Feature) -> Option<String> {
        match self {
            KeyOn::Id => feature.id.as_ref().and_then(value_as_string),
            KeyOn::Property(name) => feature.property_str(name),
        }
    }

    /// Javascript expression reading the key off a GeoJSON feature `f`.
    pub fn js_accessor(&self) -> String {
        match self {
            KeyOn::Id => "f.id".to_string(),
            KeyOn::Property(name) => format!("f.properties[{}]", serde_json::Value::String(name.clone())),
        }
    }
}

/// Viewport and base tiles of the rendered map.
#[derive(Debug, Clone, PartialEq)]
pub struct MapFrame {
    /// [lat, lon]
    pub center: [f64; 2],
    pub zoom: u8,
    pub min_zoom: u8,
    pub tiles: String,
    pub max_bounds: Option<Rect<f64>>,
}

impl Default for MapFrame {
    fn default() -> Self {
        Self { center: [47.0, 2.5], zoom: 6, min_zoom: 6, tiles: "CartoDB positron".to_string(), max_bounds: None }
    }
}

/// Pad geometry bounds for panning: low corner scaled by 0.8, high corner by 1.1.
pub fn framed_bounds(bounds: Rect<f64>) -> Rect<f64> {
    Rect::new(
        Coord { x: bounds.min().x * 0.8, y: bounds.min().y * 0.8 },
        Coord { x: bounds.max().x * 1.1, y: bounds.max().y * 1.1 },
    )
}

/// Region fill shaded by one aggregate column.
#[derive(Debug, Clone)]
pub struct ChoroplethLayer {
    pub name: String,
    pub key_on: KeyOn,
    pub column: String,
    pub legend: String,
    pub fill_opacity: f64,
    pub line_opacity: f64,
    pub scale: Option<ColorScale>,
    /// (join key, value) per aggregate record holding a value.
    pub values: Vec<(String, f64)>,
    pub geometry: FeatureCollection,
}

impl ChoroplethLayer {
    /// Fill color per join key.
    pub fn fills(&self) -> Vec<(String, Rgb)> {
        let Some(scale) = &self.scale else { return Vec::new() };
        self.values.iter().map(|(key, v)| (key.clone(), scale.color(*v))).collect()
    }
}

/// A transparent feature carrying a tooltip and an optional popup link.
#[derive(Debug, Clone, PartialEq)]
pub struct TooltipFeature {
    pub feature: Feature,
    /// (display label, text) rows, one per unique field code.
    pub rows: Vec<(String, String)>,
    pub popup: Option<String>,
}

/// Composed map: choropleth below, tooltip overlay in front.
#[derive(Debug, Clone)]
pub struct MapArtifact {
    pub title: String,
    pub frame: MapFrame,
    pub choropleth: ChoroplethLayer,
    pub tooltips: Vec<TooltipFeature>,
}

/// Link from a region to its page on the companion site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PopupRoute {
    pub site_root: String,
    /// Path prefix appended to the site root, e.g. `/#/map/z/dept/`.
    pub route: String,
    /// Feature property holding the region name.
    pub name_property: String,
}

impl PopupRoute {
    pub fn url(&self, name: &str) -> String {
        format!("{}{}{}", self.site_root.trim_end_matches('/'), self.route, process_name(name))
    }
}

/// Combines aggregate values, base geometry and joined tooltip features.
#[derive(Debug, Clone)]
pub struct LayerComposer {
    key_on: KeyOn,
    key_column: String,
    value_column: String,
    legend: String,
    fill_opacity: f64,
    line_opacity: f64,
    popup: Option<PopupRoute>,
    header: Option<(String, String)>,
    title: String,
}

impl LayerComposer {
    /// Shade features whose `key_on` equals the table's `key_column` by `value_column`.
    pub fn new(key_on: KeyOn, key_column: impl Into<String>, value_column: impl Into<String>) -> Self {
        Self {
            key_on,
            key_column: key_column.into(),
            value_column: value_column.into(),
            legend: String::new(),
            fill_opacity: 0.7,
            line_opacity: 0.2,
            popup: None,
            header: None,
            title: "frgeostat".to_string(),
        }
    }

    pub fn legend(mut self, legend: impl Into<String>) -> Self {
        self.legend = legend.into();
        self
    }

    pub fn line_opacity(mut self, opacity: f64) -> Self {
        self.line_opacity = opacity;
        self
    }

    pub fn popup(mut self, popup: Option<PopupRoute>) -> Self {
        self.popup = popup;
        self
    }

    /// Lead every tooltip with the region name read from `property`.
    pub fn header(mut self, label: impl Into<String>, property: impl Into<String>) -> Self {
        self.header = Some((label.into(), property.into()));
        self
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn compose(&self, table: &AggregateTable, geometry: &FeatureCollection, joined: &JoinReport) -> Result<MapArtifact> {
        ensure!(
            table.key_columns().iter().any(|c| *c == self.key_column),
            PipelineError::data(&self.key_column, "choropleth key is not a key column of the aggregate table")
        );

        let mut values = Vec::with_capacity(table.len());
        for record in table.records() {
            let Some(key) = table.key_value(record, &self.key_column) else { continue };
            match table.get_column(record, &self.value_column) {
                Some(v) => values.push((key.to_string(), v)),
                None => debug!("[compose] {key}: no {} value", self.value_column),
            }
        }
        let scale = ColorScale::from_values(values.iter().map(|(_, v)| *v), &YL_GN);

        let tooltips = joined.joined.iter()
            .map(|j| {
                let header = self.header.as_ref()
                    .and_then(|(label, property)| Some((label.clone(), j.feature.property_str(property)?)));
                let rows = header.into_iter()
                    .chain(j.fields.iter().filter_map(|(code, label)| Some((label.clone(), j.feature.property_str(code)?))))
                    .collect();
                let popup = self.popup.as_ref()
                    .and_then(|p| j.feature.property_str(&p.name_property).map(|name| p.url(&name)));
                TooltipFeature { feature: j.feature.clone(), rows, popup }
            })
            .collect::<Vec<_>>();

        let frame = MapFrame { max_bounds: geometry.bounds().map(framed_bounds), ..MapFrame::default() };

        info!("[compose] choropleth over {} features ({} valued), {} tooltip features",
            geometry.len(), values.len(), tooltips.len());

        Ok(MapArtifact {
            title: self.title.clone(),
            frame,
            choropleth: ChoroplethLayer {
                name: "choropleth".to_string(),
                key_on: self.key_on.clone(),
                column: self.value_column.clone(),
                legend: self.legend.clone(),
                fill_opacity: self.fill_opacity,
                line_opacity: self.line_opacity,
                scale,
                values,
                geometry: geometry.clone(),
            },
            tooltips,
        })
    }
}
