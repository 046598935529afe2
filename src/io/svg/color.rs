//! Color mapping for turnout choropleths.

use std::fmt;

/// Simple RGB color.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Rgb {
    pub(crate) r: u8,
    pub(crate) g: u8,
    pub(crate) b: u8,
}

impl fmt::Display for Rgb {
    /// Format as CSS: rgb(r,g,b)
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rgb({},{},{})", self.r, self.g, self.b)
    }
}

/// Fill for counties without a prediction.
pub(crate) const MISSING: Rgb = Rgb { r: 200, g: 200, b: 200 };

/// Sequential ramp over turnout, as (lower bound, color). Buckets are
/// [lower, next lower); the last bucket is closed at 1.0.
pub(crate) const TURNOUT_BREAKS: &[(f64, Rgb)] = &[
    (0.00, Rgb { r: 255, g: 255, b: 217 }),
    (0.40, Rgb { r: 237, g: 248, b: 177 }),
    (0.45, Rgb { r: 199, g: 233, b: 180 }),
    (0.50, Rgb { r: 127, g: 205, b: 187 }),
    (0.55, Rgb { r:  65, g: 182, b: 196 }),
    (0.60, Rgb { r:  29, g: 145, b: 192 }),
    (0.65, Rgb { r:  34, g:  94, b: 168 }),
    (0.70, Rgb { r:  37, g:  52, b: 148 }),
    (0.75, Rgb { r:   8, g:  29, b:  88 }),
];

/// Color for a turnout share in [0, 1]. Values outside are clamped;
/// NaN and infinities get the missing-data grey.
pub(crate) fn turnout_color(turnout: f64) -> Rgb {
    if !turnout.is_finite() { return MISSING }
    let x = turnout.clamp(0.0, 1.0);
    TURNOUT_BREAKS.iter()
        .rev()
        .find(|&&(lo, _)| x >= lo)
        .map(|&(_, color)| color)
        .unwrap_or(TURNOUT_BREAKS[0].1)
}

/// Legend labels, one per bucket: "40%–45%" style ranges.
pub(crate) fn legend_entries() -> Vec<(String, Rgb)> {
    TURNOUT_BREAKS.iter().enumerate()
        .map(|(i, &(lo, color))| {
            let hi = TURNOUT_BREAKS.get(i + 1).map_or(1.0, |b| b.0);
            (format!("{:.0}% to {:.0}%", lo * 100.0, hi * 100.0), color)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buckets_are_half_open() {
        assert_eq!(turnout_color(0.449), TURNOUT_BREAKS[1].1);
        assert_eq!(turnout_color(0.45), TURNOUT_BREAKS[2].1);
        assert_eq!(turnout_color(1.0), TURNOUT_BREAKS[8].1);
        assert_eq!(turnout_color(0.1), TURNOUT_BREAKS[0].1);
    }

    #[test]
    fn non_finite_is_missing() {
        assert_eq!(turnout_color(f64::NAN), MISSING);
        assert_eq!(MISSING.to_string(), "rgb(200,200,200)");
    }

    #[test]
    fn legend_covers_every_bucket() {
        let legend = legend_entries();
        assert_eq!(legend.len(), TURNOUT_BREAKS.len());
        assert_eq!(legend[0].0, "0% to 40%");
        assert_eq!(legend.last().unwrap().0, "75% to 100%");
    }
}
