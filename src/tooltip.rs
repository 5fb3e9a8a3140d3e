//! Human-readable summaries of a region's statistics, one set per field code.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, PipelineResult};
use crate::label::LabelTranslator;
use crate::stats::{AggregateRecord, AggregateTable, Statistic};

/// Field codes used for joining metadata rather than display.
pub const RESERVED_CODES: [&str; 2] = ["code", "label"];

/// What to do when the D90/D10 ratio has a zero denominator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZeroRatioPolicy {
    /// Render the ratio as `n/a`.
    #[default]
    Placeholder,
    /// Fail the field with [`PipelineError::DivisionByZero`].
    Fail,
}

/// The three summary templates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Summary {
    Iqr,
    MeanStd,
    Extreme,
}

impl Summary {
    pub const ALL: [Summary; 3] = [Summary::Iqr, Summary::MeanStd, Summary::Extreme];

    /// Render this summary for `code` from an aggregated record.
    pub fn render(&self, table: &AggregateTable, record: &AggregateRecord, code: &str, policy: ZeroRatioPolicy) -> PipelineResult<String> {
        let get = |stat: Statistic| table.get(record, code, stat)
            .ok_or_else(|| PipelineError::data(code, format!("missing {} statistic", stat.tag())));

        match self {
            Summary::Iqr => Ok(render_iqr(get(Statistic::Quantile(25))?, get(Statistic::median())?, get(Statistic::Quantile(75))?)),
            Summary::MeanStd => Ok(render_mean_std(get(Statistic::Mean)?, table.get(record, code, Statistic::Std))),
            Summary::Extreme => render_extreme(code, get(Statistic::Quantile(10))?, get(Statistic::Quantile(90))?, policy),
        }
    }
}

/// Round to two decimals for display, ties to even. Magnitudes past 2^52
/// are already integral and returned as is.
pub fn round2(x: f64) -> f64 {
    if !x.is_finite() || x.abs() >= 4_503_599_627_370_496.0 { return x }
    (x * 100.0).round_ties_even() / 100.0
}

/// Display a rounded value, always with a fractional part (`2.0`, `10.33`).
pub fn display2(x: f64) -> String {
    let s = round2(x).to_string();
    if !round2(x).is_finite() || s.contains(['.', 'e']) { s } else { format!("{s}.0") }
}

pub fn render_iqr(q25: f64, q50: f64, q75: f64) -> String {
    format!("Median = {} - IQ Interval ({}, {}) - IQR {}", display2(q50), display2(q25), display2(q75), display2(q75 - q25))
}

pub fn render_mean_std(mean: f64, std: Option<f64>) -> String {
    let std = std.filter(|s| !s.is_nan()).unwrap_or(0.0);
    format!("{} ± {} (μ ± σ)", display2(mean), display2(std))
}

pub fn render_extreme(code: &str, q10: f64, q90: f64, policy: ZeroRatioPolicy) -> PipelineResult<String> {
    let ratio = if q10 == 0.0 {
        match policy {
            ZeroRatioPolicy::Placeholder => "n/a".to_string(),
            ZeroRatioPolicy::Fail => return Err(PipelineError::DivisionByZero { code: code.to_string() }),
        }
    } else {
        display2(q90 / q10)
    };
    Ok(format!("Extreme Values: {ratio} (D90/D10) - D10 = {} - D90 = {}", display2(q10), display2(q90)))
}

/// One rendered summary for one field of one region.
#[derive(Debug, Clone, PartialEq)]
pub struct TooltipEntry {
    pub code: String,
    pub label: String,
    pub summary: Summary,
    pub text: String,
}

/// Renders tooltip entries for every displayable field of the label dictionary.
#[derive(Debug, Clone)]
pub struct TooltipFormatter<'a> {
    translator: &'a LabelTranslator,
    reserved: Vec<String>,
    policy: ZeroRatioPolicy,
}

impl<'a> TooltipFormatter<'a> {
    pub fn new(translator: &'a LabelTranslator) -> Self {
        Self {
            translator,
            reserved: RESERVED_CODES.iter().map(|s| s.to_string()).collect(),
            policy: ZeroRatioPolicy::default(),
        }
    }

    pub fn reserved<S: AsRef<str>>(mut self, codes: &[S]) -> Self {
        self.reserved = codes.iter().map(|s| s.as_ref().to_string()).collect();
        self
    }

    pub fn policy(mut self, policy: ZeroRatioPolicy) -> Self {
        self.policy = policy;
        self
    }

    #[inline] pub fn translator(&self) -> &LabelTranslator { self.translator }

    /// All three summaries for every non-reserved dictionary code, in
    /// dictionary order. Fields that cannot be rendered are skipped.
    pub fn describe(&self, table: &AggregateTable, record: &AggregateRecord) -> Vec<TooltipEntry> {
        let mut entries = Vec::new();
        for (code, label) in self.translator.dictionary().iter() {
            if self.reserved.iter().any(|r| r == code) { continue }
            for summary in Summary::ALL {
                match summary.render(table, record, code, self.policy) {
                    Ok(text) => entries.push(TooltipEntry {
                        code: code.to_string(),
                        label: label.to_string(),
                        summary,
                        text,
                    }),
                    Err(e) => debug!("[tooltip] {}: {e}", record.key),
                }
            }
        }
        entries
    }
}
