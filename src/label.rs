use std::collections::HashMap;

use anyhow::{Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{PipelineError, PipelineResult};
use crate::stats::QUANTILE_COUNT;

/// Which side of a published `{k: v}` dictionary holds the field code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DictOrientation {
    #[default]
    CodeToLabel,
    LabelToCode,
}

/// Ordered field code -> display label mapping.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LabelDictionary {
    entries: Vec<(String, String)>,
}

impl LabelDictionary {
    pub fn from_pairs<C: Into<String>, L: Into<String>>(pairs: impl IntoIterator<Item = (C, L)>) -> Self {
        Self { entries: pairs.into_iter().map(|(c, l)| (c.into(), l.into())).collect() }
    }

    /// Parse a flat JSON object of strings, in document order.
    pub fn from_json_bytes(bytes: &[u8], orientation: DictOrientation) -> Result<Self> {
        let map: Map<String, Value> = serde_json::from_slice(bytes)
            .context("[LabelDictionary::from_json_bytes] Expected a flat JSON object")?;

        let pairs = map.into_iter()
            .map(|(k, v)| {
                let v = v.as_str()
                    .with_context(|| format!("[LabelDictionary::from_json_bytes] Value of {k:?} is not a string"))?
                    .to_string();
                Ok(match orientation {
                    DictOrientation::CodeToLabel => (k, v),
                    DictOrientation::LabelToCode => (v, k),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { entries: pairs })
    }

    #[inline] pub fn len(&self) -> usize { self.entries.len() }

    #[inline] pub fn is_empty(&self) -> bool { self.entries.is_empty() }

    /// (code, label) pairs in dictionary order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(c, l)| (c.as_str(), l.as_str()))
    }

    pub fn label(&self, code: &str) -> Option<&str> {
        self.entries.iter().find(|(c, _)| c == code).map(|(_, l)| l.as_str())
    }
}

/// Statistic suffixes and their display phrases.
pub fn suffix_table() -> Vec<(String, String)> {
    let mut suffixes = vec![
        ("_median".to_string(), " (Median)".to_string()),
        ("_mean".to_string(), " (Mean)".to_string()),
        ("_std".to_string(), " (Standard Dev.)".to_string()),
    ];
    suffixes.extend((0..QUANTILE_COUNT).map(|i| {
        let phrase = if i == 50 { " (Median)".to_string() } else { format!(" ({i}th percentile)") };
        (format!("_q{i}"), phrase)
    }));
    suffixes
}

/// Immutable translation table from combined column names (`<code><suffix>`)
/// to display labels (`<label><suffix phrase>`), plus structural fields.
#[derive(Debug, Clone)]
pub struct LabelTranslator {
    dictionary: LabelDictionary,
    table: HashMap<String, String>,
}

impl LabelTranslator {
    /// Build the table once; `structural` registers extra fields verbatim
    /// (e.g. `name_dept` -> "Name of Département").
    pub fn new<S: AsRef<str>, T: AsRef<str>>(dictionary: LabelDictionary, structural: &[(S, T)]) -> Self {
        let suffixes = suffix_table();
        let mut table = HashMap::with_capacity(dictionary.len() * suffixes.len() + structural.len());
        for (code, label) in dictionary.iter() {
            for (suffix, phrase) in &suffixes {
                table.insert(format!("{code}{suffix}"), format!("{label}{phrase}"));
            }
        }
        for (field, label) in structural {
            table.insert(field.as_ref().to_string(), label.as_ref().to_string());
        }
        Self { dictionary, table }
    }

    #[inline] pub fn dictionary(&self) -> &LabelDictionary { &self.dictionary }

    /// Label of a combined column name.
    pub fn translate(&self, combined: &str) -> PipelineResult<&str> {
        self.table.get(combined)
            .map(String::as_str)
            .ok_or_else(|| PipelineError::LabelMiss { name: combined.to_string() })
    }

    /// Label of a combined column name, falling back to the raw name.
    pub fn label_or_raw<'a>(&'a self, combined: &'a str) -> &'a str {
        match self.translate(combined) {
            Ok(label) => label,
            Err(e) => {
                warn!("{e}; using the raw column name");
                combined
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn translator() -> LabelTranslator {
        let dict = LabelDictionary::from_pairs([("prob_volt", "Probability to vote"), ("age", "Age")]);
        LabelTranslator::new(dict, &[("name_dept", "Name of Département")])
    }

    #[test]
    fn median_quantile_label() {
        assert_eq!(translator().translate("prob_volt_q50").unwrap(), "Probability to vote (Median)");
    }

    #[test]
    fn suffixes_are_translated() {
        let t = translator();
        assert_eq!(t.translate("prob_volt_mean").unwrap(), "Probability to vote (Mean)");
        assert_eq!(t.translate("age_std").unwrap(), "Age (Standard Dev.)");
        assert_eq!(t.translate("age_median").unwrap(), "Age (Median)");
        assert_eq!(t.translate("age_q1").unwrap(), "Age (1th percentile)");
        assert_eq!(t.translate("age_q12").unwrap(), "Age (12th percentile)");
        assert_eq!(t.translate("age_q90").unwrap(), "Age (90th percentile)");
        assert_eq!(t.translate("name_dept").unwrap(), "Name of Département");
    }

    #[test]
    fn misses_are_reported_or_fall_back() {
        let t = translator();
        assert!(matches!(t.translate("age_q100"), Err(PipelineError::LabelMiss { .. })));
        assert_eq!(t.label_or_raw("income_mean"), "income_mean");
    }

    #[test]
    fn dictionary_orientation() {
        let bytes = br#"{"Probability to vote": "prob_volt", "Age": "age"}"#;
        let dict = LabelDictionary::from_json_bytes(bytes, DictOrientation::LabelToCode).unwrap();
        assert_eq!(dict.label("prob_volt"), Some("Probability to vote"));
        assert_eq!(dict.iter().map(|(c, _)| c).collect::<Vec<_>>(), ["prob_volt", "age"]);

        let bytes = br#"{"prob_volt": "Probability to vote"}"#;
        let dict = LabelDictionary::from_json_bytes(bytes, DictOrientation::CodeToLabel).unwrap();
        assert_eq!(dict.label("prob_volt"), Some("Probability to vote"));

        assert!(LabelDictionary::from_json_bytes(br#"{"a": 1}"#, DictOrientation::CodeToLabel).is_err());
    }

    #[test]
    fn percentile_phrases_use_a_plain_th() {
        let suffixes = suffix_table();
        assert_eq!(suffixes.len(), 3 + QUANTILE_COUNT);
        let phrase = |suffix: &str| suffixes.iter().find(|(s, _)| s == suffix).map(|(_, p)| p.as_str());
        assert_eq!(phrase("_q0"), Some(" (0th percentile)"));
        assert_eq!(phrase("_q2"), Some(" (2th percentile)"));
        assert_eq!(phrase("_q23"), Some(" (23th percentile)"));
        assert_eq!(phrase("_q50"), Some(" (Median)"));
    }
}
