use std::{fmt, str::FromStr};

use anyhow::bail;
use serde::{Deserialize, Serialize};

/// Administrative granularity of a map, finest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegionKind {
    Commune,     // Commune -> Departement
    Departement, // Highest-level entity
}

impl RegionKind {
    pub const ALL: [RegionKind; 2] = [RegionKind::Commune, RegionKind::Departement];

    pub fn to_str(&self) -> &'static str {
        match self {
            RegionKind::Commune => "commune",
            RegionKind::Departement => "departement",
        }
    }

    /// Display name, e.g. for map titles.
    pub fn display_name(&self) -> &'static str {
        match self {
            RegionKind::Commune => "Commune",
            RegionKind::Departement => "Département",
        }
    }

    /// Name of the output file when `build --out` points at a directory.
    pub fn default_map_file(&self) -> String {
        format!("{}s.score.map.html", self.to_str())
    }

    /// File stem of the persisted aggregate tables.
    pub fn table_stem(&self) -> String {
        format!("{}.lvl.aggregate.metadata", self.to_str())
    }
}

impl fmt::Display for RegionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_str())
    }
}

impl FromStr for RegionKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s {
            "commune" => Ok(RegionKind::Commune),
            "departement" => Ok(RegionKind::Departement),
            other => bail!("Unknown map kind: {other:?}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_and_files() {
        assert_eq!(RegionKind::Departement.display_name(), "Département");
        assert_eq!(RegionKind::Commune.default_map_file(), "communes.score.map.html");
        assert_eq!(RegionKind::Departement.table_stem(), "departement.lvl.aggregate.metadata");
        for kind in RegionKind::ALL { assert_eq!(kind.to_str().parse::<RegionKind>().unwrap(), kind) }
        assert!("region".parse::<RegionKind>().is_err());
    }
}
