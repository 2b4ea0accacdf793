//! Structure trait and related types.
//!
//! A [`Structure`] is a drawable object handed to the scene: the assembled
//! detector surface, its highlight copy, or the pickable point cloud.

use std::any::Any;

use glam::{Mat4, Vec3};

use crate::quantity::Quantity;

/// A geometric object that can be handed to a scene.
///
/// Each structure has:
/// - A name unique within its type
/// - A model transform applied by the scene
/// - Visibility state
pub trait Structure: Any + Send + Sync {
    /// Returns a reference to self as `Any` for downcasting.
    fn as_any(&self) -> &dyn Any;

    /// Returns a mutable reference to self as `Any` for downcasting.
    fn as_any_mut(&mut self) -> &mut dyn Any;

    /// Returns the name of this structure.
    fn name(&self) -> &str;

    /// Returns the type name of this structure (e.g., "`PointCloud`", "`SurfaceMesh`").
    fn type_name(&self) -> &'static str;

    /// Returns the axis-aligned bounding box in world coordinates.
    ///
    /// Returns `None` if the structure has no spatial extent.
    fn bounding_box(&self) -> Option<(Vec3, Vec3)>;

    /// Returns a characteristic length scale for this structure.
    fn length_scale(&self) -> f32 {
        self.bounding_box()
            .map_or(1.0, |(min, max)| (max - min).length())
    }

    /// Returns the current model transform matrix.
    fn transform(&self) -> Mat4;

    /// Sets the model transform matrix.
    fn set_transform(&mut self, transform: Mat4);

    /// Returns whether this structure is currently visible.
    fn is_enabled(&self) -> bool;

    /// Sets the visibility of this structure.
    fn set_enabled(&mut self, enabled: bool);
}

/// A structure that can have quantities attached to it.
pub trait HasQuantities: Structure {
    /// Adds a quantity to this structure.
    fn add_quantity(&mut self, quantity: Box<dyn Quantity>);

    /// Gets a quantity by name.
    fn get_quantity(&self, name: &str) -> Option<&dyn Quantity>;

    /// Gets a mutable quantity by name.
    fn get_quantity_mut(&mut self, name: &str) -> Option<&mut Box<dyn Quantity>>;

    /// Returns all quantities attached to this structure.
    fn quantities(&self) -> &[Box<dyn Quantity>];

    /// Returns the number of quantities attached.
    fn num_quantities(&self) -> usize {
        self.quantities().len()
    }
}

/// Computes the world-space bounding box of `points` under `transform`.
pub fn transformed_bounds(points: &[Vec3], transform: Mat4) -> Option<(Vec3, Vec3)> {
    if points.is_empty() {
        return None;
    }

    let mut min = Vec3::splat(f32::MAX);
    let mut max = Vec3::splat(f32::MIN);
    for &p in points {
        min = min.min(p);
        max = max.max(p);
    }

    let corners = [
        Vec3::new(min.x, min.y, min.z),
        Vec3::new(max.x, min.y, min.z),
        Vec3::new(min.x, max.y, min.z),
        Vec3::new(max.x, max.y, min.z),
        Vec3::new(min.x, min.y, max.z),
        Vec3::new(max.x, min.y, max.z),
        Vec3::new(min.x, max.y, max.z),
        Vec3::new(max.x, max.y, max.z),
    ];

    let mut world_min = Vec3::splat(f32::MAX);
    let mut world_max = Vec3::splat(f32::MIN);
    for corner in corners {
        let corner = transform.transform_point3(corner);
        world_min = world_min.min(corner);
        world_max = world_max.max(corner);
    }

    Some((world_min, world_max))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transformed_bounds() {
        assert!(transformed_bounds(&[], Mat4::IDENTITY).is_none());

        let points = [Vec3::ZERO, Vec3::new(1.0, 2.0, 0.0)];
        let (min, max) = transformed_bounds(&points, Mat4::from_scale(Vec3::splat(2.0))).unwrap();
        assert_eq!(min, Vec3::ZERO);
        assert_eq!(max, Vec3::new(2.0, 4.0, 0.0));
    }
}
