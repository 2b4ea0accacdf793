//! Configuration options for instview.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Top-level configuration for an instrument view.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Options {
    /// Mesh assembly and projection scaling settings.
    pub assembly: AssemblyOptions,

    /// Picking and highlight overlay settings.
    pub overlay: OverlayOptions,
}

impl Options {
    /// Parses options from a JSON string. Missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads options from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Serializes the options to pretty-printed JSON.
    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Settings used by precompute, the assembler and the projection scale estimator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssemblyOptions {
    /// Maximum number of detectors sampled when estimating a projection scale.
    pub scale_sample_cap: usize,

    /// Seed for the sampling RNG. Fixed so repeated assembly is reproducible.
    pub sample_seed: u64,

    /// Median nearest-neighbour distances at or below this are treated as zero.
    pub zero_distance_epsilon: f32,

    /// Edge length of the cuboid substituted for detectors without a valid shape.
    pub fallback_cuboid_size: f32,
}

impl Default for AssemblyOptions {
    fn default() -> Self {
        Self {
            scale_sample_cap: 2000,
            sample_seed: 0x5eed_1e55,
            zero_distance_epsilon: 1e-12,
            fallback_cuboid_size: 0.01,
        }
    }
}

/// Settings for the pickable point cloud and the highlight surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayOptions {
    /// Radius of the points in the pickable overlay.
    pub pick_point_radius: f32,

    /// Opacity mapped to the lowest and highest highlight scalar.
    pub highlight_opacity_range: (f32, f32),

    /// Color map used for the highlight overlay.
    pub highlight_color_map: String,

    /// Color map used for data scalars on the drawable surface.
    pub data_color_map: String,
}

impl Default for OverlayOptions {
    fn default() -> Self {
        Self {
            pick_point_radius: 0.005,
            highlight_opacity_range: (0.0, 0.5),
            highlight_color_map: "reds".to_string(),
            data_color_map: "viridis".to_string(),
        }
    }
}
