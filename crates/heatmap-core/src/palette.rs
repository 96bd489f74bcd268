//! Heat value to colour mapping.

use serde::{Deserialize, Serialize};

use likelines_common::config::PaletteName;
use likelines_common::error::{LikelinesError, LikelinesResult};

use crate::composer::Heatmap;
use crate::resample::linspace;

/// An RGB colour.
pub type Rgb = [u8; 3];

/// A colour pinned at a heat value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ColorStop {
    pub at: f64,
    pub color: Rgb,
}

impl ColorStop {
    pub const fn new(at: f64, color: Rgb) -> Self {
        Self { at, color }
    }
}

/// Piecewise-linear colour ramp.
#[derive(Debug, Clone, PartialEq)]
pub struct Palette {
    stops: Vec<ColorStop>,
}

impl Palette {
    /// Build a palette from ascending stops.
    pub fn new(stops: Vec<ColorStop>) -> LikelinesResult<Self> {
        if stops.is_empty() {
            return Err(LikelinesError::config("palette needs at least one stop"));
        }
        if stops.iter().any(|s| !s.at.is_finite()) {
            return Err(LikelinesError::config("palette stops must be finite"));
        }
        if stops.windows(2).any(|w| w[0].at >= w[1].at) {
            return Err(LikelinesError::config(
                "palette stops must be strictly ascending",
            ));
        }
        Ok(Self { stops })
    }

    /// White through yellow to red.
    pub fn heat() -> Self {
        Self {
            stops: vec![
                ColorStop::new(0.0, [255, 255, 255]),
                ColorStop::new(0.2, [255, 255, 0]),
                ColorStop::new(1.0, [255, 0, 0]),
            ],
        }
    }

    pub fn from_name(name: PaletteName) -> Self {
        match name {
            PaletteName::Heat => Self::heat(),
        }
    }

    pub fn stops(&self) -> &[ColorStop] {
        &self.stops
    }

    /// Colour for heat value `x`.
    ///
    /// Values outside the stop range clamp to the nearest end colour.
    pub fn color_at(&self, x: f64) -> Rgb {
        let first = self.stops[0];
        let last = self.stops[self.stops.len() - 1];
        if x.is_nan() || x <= first.at {
            return first.color;
        }
        if x >= last.at {
            return last.color;
        }

        // first stop strictly above x; exists because x < last.at
        let upper = self.stops.partition_point(|s| s.at <= x);
        let hi = self.stops[upper];
        let lo = self.stops[upper - 1];
        if lo.at == x {
            return lo.color;
        }

        let t = (x - lo.at) / (hi.at - lo.at);
        let mut out = [0u8; 3];
        for (c, (a, b)) in out.iter_mut().zip(lo.color.iter().zip(hi.color.iter())) {
            let v = *a as f64 + t * (*b as f64 - *a as f64);
            *c = v.round().clamp(0.0, 255.0) as u8;
        }
        out
    }

    /// Colour of every heatmap bin.
    pub fn paint(&self, heatmap: &Heatmap) -> Vec<Rgb> {
        heatmap.values().iter().map(|v| self.color_at(*v)).collect()
    }

    /// `width` colours sweeping the `[0, 1]` range, for previews.
    pub fn gradient(&self, width: usize) -> Vec<Rgb> {
        linspace(0.0, 1.0, width)
            .into_iter()
            .map(|v| self.color_at(v))
            .collect()
    }
}

impl Default for Palette {
    fn default() -> Self {
        Self::heat()
    }
}

/// `#rrggbb` form of a colour.
pub fn to_hex(color: Rgb) -> String {
    format!("#{:02x}{:02x}{:02x}", color[0], color[1], color[2])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_heat_stops_are_exact() {
        let palette = Palette::heat();
        assert_eq!(palette.color_at(0.0), [255, 255, 255]);
        assert_eq!(palette.color_at(0.2), [255, 255, 0]);
        assert_eq!(palette.color_at(1.0), [255, 0, 0]);
    }

    #[test]
    fn test_heat_interpolates_between_stops() {
        let palette = Palette::heat();
        assert_eq!(palette.color_at(0.1), [255, 255, 128]);
        assert_eq!(palette.color_at(0.6), [255, 128, 0]);
    }

    #[test]
    fn test_out_of_range_clamps() {
        let palette = Palette::heat();
        assert_eq!(palette.color_at(-0.5), [255, 255, 255]);
        assert_eq!(palette.color_at(3.0), [255, 0, 0]);
        assert_eq!(palette.color_at(f64::NAN), [255, 255, 255]);
    }

    #[test]
    fn test_invalid_stops_rejected() {
        assert!(Palette::new(vec![]).is_err());
        assert!(Palette::new(vec![
            ColorStop::new(0.5, [0, 0, 0]),
            ColorStop::new(0.1, [1, 1, 1]),
        ])
        .is_err());
        assert!(Palette::new(vec![ColorStop::new(0.3, [9, 9, 9])]).is_ok());
    }

    #[test]
    fn test_single_stop_palette_is_constant() {
        let palette = Palette::new(vec![ColorStop::new(0.3, [9, 9, 9])]).unwrap();
        assert_eq!(palette.color_at(0.0), [9, 9, 9]);
        assert_eq!(palette.color_at(0.9), [9, 9, 9]);
    }

    #[test]
    fn test_gradient_endpoints() {
        let gradient = Palette::heat().gradient(11);
        assert_eq!(gradient.len(), 11);
        assert_eq!(gradient[0], [255, 255, 255]);
        assert_eq!(gradient[10], [255, 0, 0]);
        assert!(Palette::heat().gradient(0).is_empty());
    }

    #[test]
    fn test_paint_maps_each_bin() {
        let heatmap = Heatmap::zeros(3);
        let colors = Palette::heat().paint(&heatmap);
        assert_eq!(colors, vec![[255, 255, 255]; 3]);
    }

    #[test]
    fn test_hex() {
        assert_eq!(to_hex([255, 128, 0]), "#ff8000");
    }
}
