//! Point cloud structure.
//!
//! The pickable overlay is a point cloud with exactly one point per detector of
//! the current subset, so a picked point index is the subset index.

use glam::{Mat4, Vec3};
use instview_core::pick::{color_to_index, index_to_color, Pickable};
use instview_core::structure::{transformed_bounds, Structure};

/// A point cloud structure.
pub struct PointCloud {
    name: String,
    points: Vec<Vec3>,
    enabled: bool,
    transform: Mat4,
    point_radius: f32,
}

impl PointCloud {
    /// Creates a new point cloud.
    pub fn new(name: impl Into<String>, points: Vec<Vec3>) -> Self {
        Self {
            name: name.into(),
            points,
            enabled: true,
            transform: Mat4::IDENTITY,
            point_radius: 0.01,
        }
    }

    /// Returns the number of points.
    #[must_use]
    pub fn num_points(&self) -> usize {
        self.points.len()
    }

    /// Returns the points.
    #[must_use]
    pub fn points(&self) -> &[Vec3] {
        &self.points
    }

    /// Sets the point radius.
    pub fn set_point_radius(&mut self, radius: f32) {
        self.point_radius = radius;
    }

    /// Gets the point radius.
    #[must_use]
    pub fn point_radius(&self) -> f32 {
        self.point_radius
    }
}

impl Pickable for PointCloud {
    fn encode_pick_color(&self, element_index: usize) -> [u8; 4] {
        index_to_color(element_index as u32)
    }

    fn decode_pick_color(&self, color: [u8; 4]) -> Option<usize> {
        let index = color_to_index(color)? as usize;
        (index < self.points.len()).then_some(index)
    }

    fn num_pickable_elements(&self) -> usize {
        self.points.len()
    }
}

impl Structure for PointCloud {
    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn type_name(&self) -> &'static str {
        "PointCloud"
    }

    fn bounding_box(&self) -> Option<(Vec3, Vec3)> {
        transformed_bounds(&self.points, self.transform)
    }

    fn transform(&self) -> Mat4 {
        self.transform
    }

    fn set_transform(&mut self, transform: Mat4) {
        self.transform = transform;
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }
}
