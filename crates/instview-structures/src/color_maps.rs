//! Color ramps for detector data and highlight overlays.
//!
//! Overlay options name the map used for data coloring and the one used for
//! the highlight; [`ColorMap::by_name`] resolves those names. Unknown names
//! resolve to nothing and the caller decides how to draw.

use glam::Vec3;

type Stops = &'static [[f32; 3]];

// 5-stop approximations, dark to light unless noted
const VIRIDIS: Stops = &[
    [0.267, 0.005, 0.329],
    [0.229, 0.322, 0.546],
    [0.128, 0.567, 0.551],
    [0.369, 0.789, 0.383],
    [0.993, 0.906, 0.144],
];
const REDS: Stops = &[
    [1.000, 0.961, 0.941],
    [0.988, 0.733, 0.631],
    [0.984, 0.416, 0.290],
    [0.796, 0.094, 0.114],
    [0.404, 0.000, 0.051],
];
const BLUES: Stops = &[
    [0.969, 0.984, 1.000],
    [0.776, 0.859, 0.937],
    [0.419, 0.682, 0.839],
    [0.129, 0.443, 0.710],
    [0.031, 0.188, 0.420],
];
// diverging, blue through grey to red
const COOLWARM: Stops = &[
    [0.230, 0.299, 0.754],
    [0.552, 0.690, 0.996],
    [0.866, 0.866, 0.866],
    [0.956, 0.604, 0.486],
    [0.706, 0.016, 0.150],
];
// masked detectors, light to dark
const GREYS: Stops = &[[1.0, 1.0, 1.0], [0.15, 0.15, 0.15]];

/// Names accepted by [`ColorMap::by_name`].
pub const COLOR_MAP_NAMES: [&str; 5] = ["viridis", "reds", "blues", "coolwarm", "greys"];

/// A piecewise-linear ramp over evenly spaced RGB stops on `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorMap {
    stops: Stops,
}

impl ColorMap {
    /// A ramp over caller-supplied stops.
    pub const fn from_stops(stops: &'static [[f32; 3]]) -> Self {
        Self { stops }
    }

    /// Resolves one of [`COLOR_MAP_NAMES`].
    pub fn by_name(name: &str) -> Option<Self> {
        let stops = match name {
            "viridis" => VIRIDIS,
            "reds" => REDS,
            "blues" => BLUES,
            "coolwarm" => COOLWARM,
            "greys" => GREYS,
            _ => return None,
        };
        Some(Self::from_stops(stops))
    }

    /// Color at `t`, clamped to `[0, 1]`. NaN maps to the first stop.
    pub fn sample(&self, t: f32) -> Vec3 {
        let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
        match self.stops {
            [] => Vec3::ZERO,
            [only] => Vec3::from(*only),
            stops => {
                let segments = stops.len() - 1;
                let position = t * segments as f32;
                let lower = (position as usize).min(segments - 1);
                let low = Vec3::from(stops[lower]);
                low.lerp(Vec3::from(stops[lower + 1]), position - lower as f32)
            }
        }
    }
}
