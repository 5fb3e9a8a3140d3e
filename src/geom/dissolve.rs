use std::collections::HashMap;

use anyhow::Result;
use geo::{BooleanOps, MultiPolygon, Polygon, Simplify};
use log::{debug, info, warn};
use serde_json::{Map, Value};

use crate::geom::{Feature, FeatureCollection};

/// Default simplification tolerance, in source coordinate units (degrees).
pub const DEFAULT_TOLERANCE: f64 = 1e-3;

/// Merges all features sharing a region name into one simplified boundary.
#[derive(Debug, Clone)]
pub struct Dissolver {
    name_property: String,
    parent_property: Option<String>,
    tolerance: f64,
}

/// Dissolve output: one feature per distinct name, with ids assigned in
/// first-seen order, plus the name -> id index.
#[derive(Debug, Clone)]
pub struct Dissolved {
    pub collection: FeatureCollection,
    pub ids: HashMap<String, u32>,
    /// Features skipped for lacking the name property.
    pub unnamed: usize,
}

impl Dissolver {
    pub fn new(name_property: impl Into<String>) -> Self {
        Self { name_property: name_property.into(), parent_property: None, tolerance: DEFAULT_TOLERANCE }
    }

    /// Property naming the parent region, copied onto each dissolved feature.
    pub fn parent(mut self, property: impl Into<String>) -> Self {
        self.parent_property = Some(property.into());
        self
    }

    pub fn tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Union, then simplify, the geometries of every feature sharing a name.
    /// Features without the name property are skipped and counted.
    pub fn dissolve(&self, features: &FeatureCollection) -> Result<Dissolved> {
        let mut ids: HashMap<String, u32> = HashMap::new();
        let mut groups: Vec<(String, Option<String>, Vec<&MultiPolygon<f64>>)> = Vec::new();
        let mut unnamed = 0;

        for feature in features.iter() {
            let Some(name) = feature.property_str(&self.name_property) else {
                unnamed += 1;
                continue;
            };
            let id = *ids.entry(name.clone()).or_insert_with(|| {
                let parent = self.parent_property.as_deref().and_then(|p| feature.property_str(p));
                groups.push((name, parent, Vec::new()));
                (groups.len() - 1) as u32
            });
            groups[id as usize].2.push(&feature.geometry);
        }

        let dissolved = groups.into_iter().enumerate()
            .map(|(id, (name, parent, shapes))| {
                debug!("[dissolve] {name}: {} shapes", shapes.len());
                let geometry = self.simplify(&union_all(&shapes));

                let mut properties = Map::new();
                properties.insert(self.name_property.clone(), Value::String(name));
                if let Some(property) = &self.parent_property {
                    properties.insert(property.clone(), parent.map(Value::String).unwrap_or(Value::Null));
                }
                Feature::new(geometry, properties).with_id(id as u32)
            })
            .collect();

        if unnamed > 0 {
            warn!("[dissolve] {unnamed} features have no {:?} property", self.name_property);
        }

        let collection = FeatureCollection::new(dissolved);
        info!("[dissolve] {} features -> {} regions", features.len(), collection.len());

        Ok(Dissolved { collection, ids, unnamed })
    }

    /// Douglas-Peucker simplification; rings that collapse are dropped.
    fn simplify(&self, mp: &MultiPolygon<f64>) -> MultiPolygon<f64> {
        let polygons = mp.0.iter()
            .filter_map(|poly| {
                let exterior = poly.exterior().simplify(&self.tolerance);
                if exterior.0.len() < 4 { return None }
                let interiors = poly.interiors().iter()
                    .map(|ring| ring.simplify(&self.tolerance))
                    .filter(|ring| ring.0.len() >= 4)
                    .collect();
                Some(Polygon::new(exterior, interiors))
            })
            .collect();
        MultiPolygon(polygons)
    }
}

/// Union of all shapes, reduced pairwise so operands stay balanced.
fn union_all(shapes: &[&MultiPolygon<f64>]) -> MultiPolygon<f64> {
    let mut layer: Vec<MultiPolygon<f64>> = shapes.iter().map(|&s| s.clone()).collect();
    while layer.len() > 1 {
        layer = layer.chunks(2)
            .filter_map(|pair| pair.iter().cloned().reduce(|a, b| a.union(&b)))
            .collect();
    }
    layer.pop().unwrap_or_else(|| MultiPolygon(Vec::new()))
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use geo::{Area, polygon};
    use serde_json::json;

    use super::*;

    fn station(nom: &str, dept: &str, poly: Polygon<f64>) -> Feature {
        let mut props = Map::new();
        props.insert("nom".into(), json!(nom));
        props.insert("name_dept".into(), json!(dept));
        Feature::new(MultiPolygon(vec![poly]), props)
    }

    fn unit_square(x: f64, y: f64) -> Polygon<f64> {
        polygon![(x: x, y: y), (x: x + 1.0, y: y), (x: x + 1.0, y: y + 1.0), (x: x, y: y + 1.0)]
    }

    #[test]
    fn identical_names_yield_one_feature() {
        let fc = FeatureCollection::new(vec![
            station("Brest", "Finistère", unit_square(0.0, 0.0)),
            station("Brest", "Finistère", unit_square(1.0, 0.0)),
            station("Brest", "Finistère", unit_square(0.5, 0.5)),
        ]);
        let truth = union_all(&fc.iter().map(|f| &f.geometry).collect::<Vec<_>>()).unsigned_area();

        let out = Dissolver::new("nom").parent("name_dept").dissolve(&fc).unwrap();
        assert_eq!(out.collection.len(), 1);

        let feature = &out.collection.features[0];
        assert_eq!(feature.id, Some(json!(0)));
        assert_eq!(feature.property_str("nom").as_deref(), Some("Brest"));
        assert_eq!(feature.property_str("name_dept").as_deref(), Some("Finistère"));
        assert_abs_diff_eq!(feature.geometry.unsigned_area(), truth, epsilon = DEFAULT_TOLERANCE * 10.0);
        assert_abs_diff_eq!(truth, 2.5, epsilon = 1e-9);
    }

    #[test]
    fn ids_follow_first_seen_order() {
        let fc = FeatureCollection::new(vec![
            station("Quimper", "Finistère", unit_square(0.0, 0.0)),
            station("Brest", "Finistère", unit_square(5.0, 0.0)),
            station("Quimper", "Finistère", unit_square(1.0, 0.0)),
        ]);
        let out = Dissolver::new("nom").dissolve(&fc).unwrap();
        assert_eq!(out.ids["Quimper"], 0);
        assert_eq!(out.ids["Brest"], 1);
        assert_eq!(out.collection.len(), 2);
        assert_abs_diff_eq!(out.collection.features[0].geometry.unsigned_area(), 2.0, epsilon = 1e-9);
        assert!(out.collection.features[1].properties.get("name_dept").is_none());
    }

    #[test]
    fn tiny_rings_collapse_under_tolerance() {
        let speck = polygon![(x: 0.0, y: 0.0), (x: 1e-5, y: 0.0), (x: 0.0, y: 1e-5)];
        let fc = FeatureCollection::new(vec![station("Île", "Morbihan", speck)]);
        let out = Dissolver::new("nom").dissolve(&fc).unwrap();
        assert!(out.collection.features[0].geometry.0.is_empty());
    }

    #[test]
    fn unnamed_features_are_skipped() {
        let fc = FeatureCollection::new(vec![
            station("Brest", "Finistère", unit_square(0.0, 0.0)),
            Feature::new(MultiPolygon(vec![unit_square(3.0, 0.0)]), Map::new()),
            station("Brest", "Finistère", unit_square(1.0, 0.0)),
        ]);
        let out = Dissolver::new("nom").dissolve(&fc).unwrap();
        assert_eq!(out.unnamed, 1);
        assert_eq!(out.collection.len(), 1);
        assert_eq!(out.collection.features[0].property_str("nom").as_deref(), Some("Brest"));
        assert_abs_diff_eq!(out.collection.features[0].geometry.unsigned_area(), 2.0, epsilon = 1e-9);
    }
}
