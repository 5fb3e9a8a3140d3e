use anyhow::{Result, ensure};
use log::{debug, info, warn};
use serde_json::Value;

use crate::error::PipelineError;
use crate::geom::{Feature, FeatureCollection};
use crate::join::Matcher;
use crate::stats::AggregateTable;
use crate::tooltip::TooltipFormatter;

/// A geometry feature enriched with one aggregate row's tooltip entries.
#[derive(Debug, Clone, PartialEq)]
pub struct JoinedFeature {
    pub feature: Feature,
    /// Index of the matched record in the aggregate table.
    pub record: usize,
    /// (code, label) of every tooltip field, first-seen order, unique by code.
    pub fields: Vec<(String, String)>,
}

/// Join output plus the sides that found no counterpart.
#[derive(Debug, Clone, Default)]
pub struct JoinReport {
    pub joined: Vec<JoinedFeature>,
    pub unmatched_features: Vec<String>,
    pub unmatched_rows: Vec<String>,
    /// Features without the match property.
    pub invalid_features: usize,
}

impl JoinReport {
    #[inline] pub fn len(&self) -> usize { self.joined.len() }

    #[inline] pub fn is_empty(&self) -> bool { self.joined.is_empty() }

    /// Joined features as a collection, in join order.
    pub fn collection(&self) -> FeatureCollection {
        FeatureCollection::new(self.joined.iter().map(|j| j.feature.clone()).collect())
    }
}

/// Matches aggregate rows to geometry features by region name.
pub struct RegionJoiner {
    data_on: String,
    geo_on: String,
    matcher: Box<dyn Matcher>,
}

impl RegionJoiner {
    /// `data_on` is a key column of the aggregate table; `geo_on` a feature property.
    pub fn new(data_on: impl Into<String>, geo_on: impl Into<String>, matcher: Box<dyn Matcher>) -> Self {
        Self { data_on: data_on.into(), geo_on: geo_on.into(), matcher }
    }

    /// Emit one joined feature per (feature, matching row) pair, in feature
    /// order then table order. The source collection is left untouched.
    pub fn join(&self, table: &AggregateTable, features: &FeatureCollection, formatter: &TooltipFormatter) -> Result<JoinReport> {
        ensure!(
            table.key_columns().iter().any(|c| *c == self.data_on),
            PipelineError::data(&self.data_on, "join field is not a key column of the aggregate table")
        );

        let names: Vec<Option<&str>> = table.records().iter()
            .map(|r| table.key_value(r, &self.data_on))
            .collect();
        let mut row_matched = vec![false; names.len()];
        let mut report = JoinReport::default();

        for feature in features.iter() {
            let Some(geo_value) = feature.property_str(&self.geo_on) else {
                debug!("{}", PipelineError::data(&self.geo_on, format!("feature {:?} has no match property", feature.id)));
                report.invalid_features += 1;
                continue;
            };

            let mut matched = false;
            for (i, name) in names.iter().enumerate() {
                let Some(name) = name else { continue };
                if !self.matcher.matches(name, &geo_value) { continue }
                matched = true;
                row_matched[i] = true;
                report.joined.push(enrich(feature, i, table, formatter));
            }
            if !matched {
                debug!("{}", PipelineError::JoinMiss { side: "feature", value: geo_value.clone() });
                report.unmatched_features.push(geo_value);
            }
        }

        report.unmatched_rows = names.iter().zip(&row_matched)
            .filter(|(_, matched)| !**matched)
            .map(|(name, _)| name.unwrap_or_default().to_string())
            .collect();

        if report.invalid_features > 0 {
            warn!("[join] {} features have no {:?} property", report.invalid_features, self.geo_on);
        }
        if !report.unmatched_features.is_empty() {
            warn!("[join] {} features matched no aggregate row: {:?}", report.unmatched_features.len(), report.unmatched_features);
        }
        if !report.unmatched_rows.is_empty() {
            warn!("[join] {} aggregate rows matched no feature: {:?}", report.unmatched_rows.len(), report.unmatched_rows);
        }
        info!("[join] {} features x {} rows -> {} joined features", features.len(), table.len(), report.len());

        Ok(report)
    }
}

/// Deep copy of `feature` carrying the tooltip text of record `index`, one
/// property per field code.
fn enrich(feature: &Feature, index: usize, table: &AggregateTable, formatter: &TooltipFormatter) -> JoinedFeature {
    let mut joined = feature.clone();
    let mut fields: Vec<(String, String)> = Vec::new();

    for entry in formatter.describe(table, &table.records()[index]) {
        match joined.properties.get_mut(&entry.code) {
            Some(Value::String(text)) if fields.iter().any(|(c, _)| *c == entry.code) => {
                text.push('\n');
                text.push_str(&entry.text);
            }
            _ => {
                joined.properties.insert(entry.code.clone(), Value::String(entry.text));
                fields.push((entry.code, entry.label));
            }
        }
    }

    JoinedFeature { feature: joined, record: index, fields }
}
