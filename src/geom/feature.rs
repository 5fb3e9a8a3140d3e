use anyhow::{Context, Result, bail};
use geo::{BoundingRect, Coord, MultiPolygon, Rect};
use log::warn;
use polars::prelude::{Column, DataFrame};
use serde_json::{Map, Value, json};

use crate::common::{geometry_from_geojson, geometry_to_geojson};

/// A named (multi)polygon with a GeoJSON-style properties map.
#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    pub id: Option<Value>,
    pub properties: Map<String, Value>,
    pub geometry: MultiPolygon<f64>,
}

impl Feature {
    pub fn new(geometry: MultiPolygon<f64>, properties: Map<String, Value>) -> Self {
        Self { id: None, properties, geometry }
    }

    pub fn with_id(mut self, id: impl Into<Value>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// A property rendered as text; numbers are formatted, null/absent is None.
    pub fn property_str(&self, name: &str) -> Option<String> {
        value_as_string(self.properties.get(name)?)
    }

    /// Parse a GeoJSON Feature object.
    pub fn from_geojson(value: &Value) -> Result<Self> {
        if value["type"].as_str() != Some("Feature") {
            bail!("[Feature::from_geojson] Expected a GeoJSON Feature, found {:?}", value["type"]);
        }
        let properties = match &value["properties"] {
            Value::Object(map) => map.clone(),
            Value::Null => Map::new(),
            other => bail!("[Feature::from_geojson] Invalid properties: {other}"),
        };
        let geometry = geometry_from_geojson(&value["geometry"])
            .with_context(|| format!("[Feature::from_geojson] Invalid geometry for feature {:?}", value.get("id")))?;

        Ok(Self { id: value.get("id").filter(|v| !v.is_null()).cloned(), properties, geometry })
    }

    pub fn to_geojson(&self) -> Value {
        let mut feature = json!({
            "type": "Feature",
            "properties": self.properties,
            "geometry": geometry_to_geojson(&self.geometry),
        });
        if let Some(id) = &self.id {
            feature["id"] = id.clone();
        }
        feature
    }
}

/// Text form of a scalar JSON value.
pub(crate) fn value_as_string(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// An ordered collection of features.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureCollection {
    pub features: Vec<Feature>,
}

impl FeatureCollection {
    pub fn new(features: Vec<Feature>) -> Self { Self { features } }

    #[inline] pub fn len(&self) -> usize { self.features.len() }

    #[inline] pub fn is_empty(&self) -> bool { self.features.is_empty() }

    #[inline] pub fn iter(&self) -> impl Iterator<Item = &Feature> { self.features.iter() }

    /// Parse a GeoJSON FeatureCollection; a lone Feature is wrapped into a
    /// one-element collection. Features without a polygonal geometry are skipped.
    pub fn from_geojson(value: &Value) -> Result<Self> {
        let raw: Vec<&Value> = match value["type"].as_str() {
            Some("FeatureCollection") => value["features"].as_array()
                .context("[FeatureCollection::from_geojson] FeatureCollection has no features array")?
                .iter().collect(),
            Some("Feature") => vec![value],
            other => bail!("[FeatureCollection::from_geojson] Expected Feature or FeatureCollection, found {other:?}"),
        };

        let mut features = Vec::with_capacity(raw.len());
        let mut skipped = 0usize;
        for value in raw {
            match Feature::from_geojson(value) {
                Ok(feature) => features.push(feature),
                Err(e) => {
                    skipped += 1;
                    log::debug!("{e:#}");
                }
            }
        }
        if skipped > 0 { warn!("[geojson] skipped {skipped} features without a usable polygon geometry") }

        Ok(Self { features })
    }

    pub fn from_geojson_bytes(bytes: &[u8]) -> Result<Self> {
        let value: Value = serde_json::from_slice(bytes)
            .context("[FeatureCollection::from_geojson_bytes] Failed to parse GeoJSON bytes")?;
        Self::from_geojson(&value)
    }

    pub fn to_geojson(&self) -> Value {
        json!({
            "type": "FeatureCollection",
            "features": self.features.iter().map(Feature::to_geojson).collect::<Vec<_>>(),
        })
    }

    /// Bounding rectangle of all geometries.
    pub fn bounds(&self) -> Option<Rect<f64>> {
        self.features.iter()
            .filter_map(|f| f.geometry.bounding_rect())
            .reduce(|a, b| Rect::new(
                Coord { x: a.min().x.min(b.min().x), y: a.min().y.min(b.min().y) },
                Coord { x: a.max().x.max(b.max().x), y: a.max().y.max(b.max().y) },
            ))
    }

    /// Tabulate feature properties: one row per feature, one column per
    /// property key (first-seen order). All-numeric keys become Float64
    /// columns, anything else a String column.
    pub fn properties_frame(&self) -> Result<DataFrame> {
        let mut keys: Vec<&str> = Vec::new();
        for feature in &self.features {
            for key in feature.properties.keys() {
                if !keys.contains(&key.as_str()) { keys.push(key) }
            }
        }

        let columns = keys.into_iter()
            .map(|key| {
                let values: Vec<Option<&Value>> = self.features.iter()
                    .map(|f| f.properties.get(key).filter(|v| !v.is_null()))
                    .collect();
                if values.iter().flatten().all(|v| v.is_number()) {
                    let numbers: Vec<Option<f64>> = values.iter().map(|v| v.and_then(Value::as_f64)).collect();
                    Column::new(key.into(), numbers)
                } else {
                    let text: Vec<Option<String>> = values.iter().map(|v| v.and_then(value_as_string)).collect();
                    Column::new(key.into(), text)
                }
            })
            .collect::<Vec<_>>();

        Ok(DataFrame::new(columns)?)
    }
}
