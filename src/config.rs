use std::{collections::BTreeMap, path::Path};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::common::read_json_bytes;
use crate::geom::DEFAULT_TOLERANCE;
use crate::join::MatchStrategy;
use crate::label::DictOrientation;
use crate::region::RegionKind;
use crate::render::KeyOn;
use crate::stats::{Statistic, derived_column};
use crate::tooltip::{RESERVED_CODES, ZeroRatioPolicy};

const DEFAULT_CONFIG: &str = include_str!("../config/default.json");

/// Catalog of buildable map kinds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub zones: Vec<String>,
    pub aliases: BTreeMap<String, Vec<String>>,
    pub site_root: String,
    pub kinds: BTreeMap<String, KindConfig>,
}

/// Sources and pipeline settings of one map kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KindConfig {
    /// Observation table. Without one, the geometry's feature properties are
    /// the observations.
    #[serde(default)]
    pub metadata: Option<String>,
    pub geometry: String,
    pub labels: String,
    #[serde(default)]
    pub dictionary: DictOrientation,

    pub key_columns: Vec<String>,
    #[serde(default)]
    pub exclude: Vec<String>,
    /// Columns renamed before aggregation, old -> new.
    #[serde(default)]
    pub rename: BTreeMap<String, String>,
    /// Probability columns scaled to percent before aggregation.
    #[serde(default)]
    pub percent: Vec<String>,
    /// Metric shading the choropleth (by its median) and ordering records.
    pub metric: String,
    /// Labels of non-metric fields, e.g. `name_dept`.
    #[serde(default)]
    pub structural: BTreeMap<String, String>,

    #[serde(default)]
    pub dissolve: Option<DissolveConfig>,

    pub data_on: String,
    pub geo_on: String,
    #[serde(default)]
    pub matcher: MatchStrategy,
    #[serde(default = "default_reserved")]
    pub reserved: Vec<String>,
    #[serde(default)]
    pub zero_ratio: ZeroRatioPolicy,

    pub key_on: KeyOn,
    pub choropleth_key: String,
    #[serde(default)]
    pub legend: String,
    #[serde(default = "default_line_opacity")]
    pub line_opacity: f64,
    #[serde(default)]
    pub popup: Option<PopupConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DissolveConfig {
    pub name: String,
    #[serde(default)]
    pub parent: Option<String>,
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,
    /// Observation column receiving the dissolved region id.
    #[serde(default = "default_id_column")]
    pub id_column: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PopupConfig {
    pub route: String,
    pub name_property: String,
}

fn default_reserved() -> Vec<String> { RESERVED_CODES.iter().map(|s| s.to_string()).collect() }
fn default_line_opacity() -> f64 { 0.2 }
fn default_tolerance() -> f64 { DEFAULT_TOLERANCE }
fn default_id_column() -> String { "id".to_string() }

impl KindConfig {
    /// Median column of the choropleth metric, e.g. `prob_volt_q50`.
    pub fn median_column(&self) -> String {
        derived_column(&self.metric, Statistic::median())
    }
}

impl Config {
    /// The catalog compiled into the binary.
    pub fn bundled() -> Result<Self> {
        read_json_bytes(DEFAULT_CONFIG.as_bytes(), "bundled config")
    }

    /// Load a catalog from disk, or the bundled one.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else { return Self::bundled() };
        let bytes = std::fs::read(path)
            .with_context(|| format!("[Config::load] Failed to read {}", path.display()))?;
        read_json_bytes(&bytes, "config")
    }

    /// Resolve a user-typed name to a map kind: an alias matches when it
    /// contains the lowercased name or the lowercased name contains it.
    pub fn from_alias(&self, name: &str) -> Option<RegionKind> {
        let name = name.to_lowercase();
        if name.is_empty() { return None }
        self.aliases.iter()
            .find(|(_, aliases)| aliases.iter().any(|a| a.contains(&name) || name.contains(a.as_str())))
            .and_then(|(kind, _)| kind.parse().ok())
    }

    pub fn kind(&self, kind: RegionKind) -> Result<&KindConfig> {
        self.kinds.get(kind.to_str())
            .with_context(|| format!("[Config::kind] No configuration for map kind {kind}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bundled_config_parses() {
        let config = Config::bundled().unwrap();
        assert_eq!(config.zones, ["commune", "departement"]);

        let dept = config.kind(RegionKind::Departement).unwrap();
        assert_eq!(dept.key_columns, ["num_dept", "name_dept"]);
        assert_eq!(dept.key_on, KeyOn::Property("code".into()));
        assert_eq!(dept.matcher, MatchStrategy::Containment);
        assert_eq!(dept.reserved, ["code", "label"]);
        assert_eq!(dept.median_column(), "prob_volt_q50");
        assert!(dept.popup.is_some());

        let commune = config.kind(RegionKind::Commune).unwrap();
        assert_eq!(commune.key_on, KeyOn::Id);
        assert_eq!(commune.dissolve.as_ref().unwrap().id_column, "id");
        assert!(commune.metadata.is_none());
    }

    #[test]
    fn alias_resolution_is_permissive() {
        let config = Config::bundled().unwrap();
        assert_eq!(config.from_alias("dept"), Some(RegionKind::Departement));
        assert_eq!(config.from_alias("Départements"), Some(RegionKind::Departement));
        assert_eq!(config.from_alias("COMMUNES"), Some(RegionKind::Commune));
        assert_eq!(config.from_alias("co"), Some(RegionKind::Commune));
        assert_eq!(config.from_alias("region"), None);
        assert_eq!(config.from_alias(""), None);
    }

    #[test]
    fn load_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, DEFAULT_CONFIG).unwrap();
        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.site_root, "https://bureaux-vote.v.olt.sh");
        assert!(Config::load(Some(&dir.path().join("missing.json"))).is_err());
    }
}
