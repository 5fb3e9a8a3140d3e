//! Color ramp for choropleth fills.

use std::fmt;

/// Simple RGB color.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl fmt::Display for Rgb {
    /// Format as CSS hex: #rrggbb
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// Fill for regions without a value.
pub const MISSING: Rgb = Rgb { r: 189, g: 189, b: 189 };

/// ColorBrewer YlGn, six classes.
pub const YL_GN: [Rgb; 6] = [
    Rgb { r: 255, g: 255, b: 204 },
    Rgb { r: 217, g: 240, b: 163 },
    Rgb { r: 173, g: 221, b: 142 },
    Rgb { r: 120, g: 198, b: 121 },
    Rgb { r:  49, g: 163, b:  84 },
    Rgb { r:   0, g: 104, b:  55 },
];

/// Equal-width binning of a value range onto a color ramp.
#[derive(Clone, Debug, PartialEq)]
pub struct ColorScale {
    min: f64,
    max: f64,
    colors: &'static [Rgb],
}

impl ColorScale {
    /// Scale spanning the finite values; None if there are none.
    pub fn from_values(values: impl IntoIterator<Item = f64>, colors: &'static [Rgb]) -> Option<Self> {
        let (min, max) = values.into_iter()
            .filter(|v| v.is_finite())
            .fold(None, |acc: Option<(f64, f64)>, v| match acc {
                None => Some((v, v)),
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            })?;
        if colors.is_empty() { return None }
        Some(Self { min, max, colors })
    }

    #[inline] pub fn min(&self) -> f64 { self.min }

    #[inline] pub fn max(&self) -> f64 { self.max }

    #[inline] pub fn colors(&self) -> &[Rgb] { self.colors }

    /// Bin edges, `colors.len() + 1` of them.
    pub fn breaks(&self) -> Vec<f64> {
        let n = self.colors.len();
        (0..=n).map(|i| self.min + (self.max - self.min) * i as f64 / n as f64).collect()
    }

    /// Color of the bin holding `value`; bins are [lo, hi) except the last.
    pub fn color(&self, value: f64) -> Rgb {
        if !value.is_finite() { return MISSING }
        let n = self.colors.len();
        let span = self.max - self.min;
        if span <= 0.0 { return self.colors[n - 1] }

        let bin = ((value - self.min) / span * n as f64).floor();
        self.colors[(bin.max(0.0) as usize).min(n - 1)]
    }
}
