//! Surface mesh quantity implementations.

use glam::Vec3;
use instview_core::quantity::Quantity;

use crate::color_maps::ColorMap;

/// A per-cell (triangle) scalar quantity on a surface mesh.
#[derive(Debug)]
pub struct MeshFaceScalarQuantity {
    name: String,
    structure_name: String,
    values: Vec<f32>,
    enabled: bool,
    colormap_name: String,
    range_min: f32,
    range_max: f32,
}

impl MeshFaceScalarQuantity {
    /// Creates a new face scalar quantity. The range is taken from the data.
    pub fn new(
        name: impl Into<String>,
        structure_name: impl Into<String>,
        values: Vec<f32>,
    ) -> Self {
        let (range_min, range_max) = data_range(&values);
        Self {
            name: name.into(),
            structure_name: structure_name.into(),
            values,
            enabled: false,
            colormap_name: "viridis".to_string(),
            range_min,
            range_max,
        }
    }

    /// Returns the scalar values.
    pub fn values(&self) -> &[f32] {
        &self.values
    }

    /// Replaces the values and resets the range to the new data.
    pub fn update_values(&mut self, values: Vec<f32>) {
        let (range_min, range_max) = data_range(&values);
        self.values = values;
        self.range_min = range_min;
        self.range_max = range_max;
    }

    /// Gets the colormap name.
    pub fn colormap_name(&self) -> &str {
        &self.colormap_name
    }

    /// Sets the colormap name.
    pub fn set_colormap(&mut self, name: impl Into<String>) {
        self.colormap_name = name.into();
    }

    /// Gets the range minimum.
    pub fn range_min(&self) -> f32 {
        self.range_min
    }

    /// Gets the range maximum.
    pub fn range_max(&self) -> f32 {
        self.range_max
    }

    /// Normalizes a value into `[0, 1]` using the current range.
    fn normalized(&self, v: f32) -> f32 {
        let range = self.range_max - self.range_min;
        let range = if range.abs() < 1e-10 { 1.0 } else { range };
        ((v - self.range_min) / range).clamp(0.0, 1.0)
    }

    /// Maps scalar values to per-cell colors using the colormap.
    pub fn compute_colors(&self, colormap: &ColorMap) -> Vec<Vec3> {
        self.values
            .iter()
            .map(|&v| colormap.sample(self.normalized(v)))
            .collect()
    }

    /// Maps scalar values linearly onto `[opacity_min, opacity_max]`.
    pub fn compute_opacities(&self, (opacity_min, opacity_max): (f32, f32)) -> Vec<f32> {
        self.values
            .iter()
            .map(|&v| opacity_min + (opacity_max - opacity_min) * self.normalized(v))
            .collect()
    }
}

fn data_range(values: &[f32]) -> (f32, f32) {
    if values.is_empty() {
        return (0.0, 1.0);
    }
    let min = values.iter().copied().fold(f32::INFINITY, f32::min);
    let max = values.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    (min, max)
}

impl Quantity for MeshFaceScalarQuantity {
    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn structure_name(&self) -> &str {
        &self.structure_name
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    fn data_size(&self) -> usize {
        self.values.len()
    }
}
