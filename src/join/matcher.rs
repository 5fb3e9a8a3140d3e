use deunicode::deunicode;
use serde::{Deserialize, Serialize};

/// Decides whether an aggregate row's region name refers to a geometry
/// feature's region name. Implementations must be symmetric.
pub trait Matcher: Send + Sync {
    fn matches(&self, data_value: &str, geo_value: &str) -> bool;
}

/// Case-insensitive equality.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExactMatch;

impl Matcher for ExactMatch {
    fn matches(&self, data_value: &str, geo_value: &str) -> bool {
        !data_value.is_empty() && data_value.to_lowercase() == geo_value.to_lowercase()
    }
}

/// Case-insensitive substring match, in either direction.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContainmentMatch;

impl Matcher for ContainmentMatch {
    fn matches(&self, data_value: &str, geo_value: &str) -> bool {
        contains_either(&data_value.to_lowercase(), &geo_value.to_lowercase())
    }
}

/// Substring match after folding accents, case, apostrophes and separators,
/// so "Côte-d'Or" and "cote dor" refer to the same region.
#[derive(Debug, Clone, Copy, Default)]
pub struct NormalizedMatch;

impl Matcher for NormalizedMatch {
    fn matches(&self, data_value: &str, geo_value: &str) -> bool {
        contains_either(&normalize_name(data_value), &normalize_name(geo_value))
    }
}

fn contains_either(a: &str, b: &str) -> bool {
    !a.is_empty() && !b.is_empty() && (a.contains(b) || b.contains(a))
}

/// ASCII-folded, lowercased, apostrophe-free form of a region name, as used
/// in navigation routes ("Côtes-d'Armor" -> "cotes-darmor").
pub fn process_name(name: &str) -> String {
    deunicode(name).to_lowercase().replace('\'', "")
}

/// [`process_name`] with hyphens and runs of whitespace collapsed to one space.
pub fn normalize_name(name: &str) -> String {
    process_name(name)
        .split(|c: char| c.is_whitespace() || c == '-')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Matching strategy, as named in configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStrategy {
    Exact,
    #[default]
    Containment,
    Normalized,
}

impl MatchStrategy {
    pub fn matcher(&self) -> Box<dyn Matcher> {
        match self {
            MatchStrategy::Exact => Box::new(ExactMatch),
            MatchStrategy::Containment => Box::new(ContainmentMatch),
            MatchStrategy::Normalized => Box::new(NormalizedMatch),
        }
    }
}
