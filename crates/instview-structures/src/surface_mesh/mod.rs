//! Surface mesh structure.
//!
//! Used both for the assembled detector surface and for its highlight copy.
//! Cells are triangles; per-cell data is attached as face scalar quantities.

mod quantities;
pub use quantities::*;

use glam::{Mat4, Vec3};
use instview_core::error::{ensure_len, InstviewError, Result};
use instview_core::quantity::Quantity;
use instview_core::structure::{transformed_bounds, HasQuantities, Structure};

/// A triangle surface mesh.
pub struct SurfaceMesh {
    // Core data
    name: String,
    vertices: Vec<Vec3>,
    triangles: Vec<[u32; 3]>,
    enabled: bool,
    transform: Mat4,
    quantities: Vec<Box<dyn Quantity>>,

    // Render options
    surface_color: Vec3,
    transparency: f32,
    pickable: bool,
}

impl SurfaceMesh {
    /// Creates a new surface mesh from vertices and triangles.
    pub fn new(name: impl Into<String>, vertices: Vec<Vec3>, triangles: Vec<[u32; 3]>) -> Self {
        debug_assert!(triangles
            .iter()
            .flatten()
            .all(|&i| (i as usize) < vertices.len()));
        Self {
            name: name.into(),
            vertices,
            triangles,
            enabled: true,
            transform: Mat4::IDENTITY,
            quantities: Vec::new(),
            surface_color: Vec3::new(0.5, 0.5, 0.8),
            transparency: 0.0, // 0.0 = fully opaque, 1.0 = fully transparent
            pickable: true,
        }
    }

    /// Deep-copies geometry, transform and appearance into a new mesh without quantities.
    #[must_use]
    pub fn duplicate(&self, name: impl Into<String>) -> Self {
        let mut copy = Self::new(name, self.vertices.clone(), self.triangles.clone());
        copy.transform = self.transform;
        copy.surface_color = self.surface_color;
        copy.transparency = self.transparency;
        copy.pickable = self.pickable;
        copy
    }

    /// Returns the number of vertices.
    pub fn num_vertices(&self) -> usize {
        self.vertices.len()
    }

    /// Returns the number of faces (cells).
    pub fn num_faces(&self) -> usize {
        self.triangles.len()
    }

    /// Returns the vertices.
    pub fn vertices(&self) -> &[Vec3] {
        &self.vertices
    }

    /// Returns the triangles.
    pub fn triangles(&self) -> &[[u32; 3]] {
        &self.triangles
    }

    /// Sets or replaces a per-face scalar quantity and enables it.
    ///
    /// `values` must hold one value per face.
    pub fn set_face_scalars(
        &mut self,
        name: &str,
        values: Vec<f32>,
    ) -> Result<&mut MeshFaceScalarQuantity> {
        ensure_len(self.num_faces(), values.len())?;

        if self.face_scalar_quantity(name).is_none() {
            let quantity = MeshFaceScalarQuantity::new(name, self.name.clone(), values);
            self.add_quantity(Box::new(quantity));
        } else if let Some(existing) = self.face_scalar_quantity_mut(name) {
            existing.update_values(values);
        }

        for q in &mut self.quantities {
            q.set_enabled(q.name() == name);
        }

        let structure_name = self.name.clone();
        self.face_scalar_quantity_mut(name)
            .ok_or_else(|| InstviewError::QuantityNotFound(name.to_string(), structure_name))
    }

    /// Gets a face scalar quantity by name.
    pub fn face_scalar_quantity(&self, name: &str) -> Option<&MeshFaceScalarQuantity> {
        self.get_quantity(name)?
            .as_any()
            .downcast_ref::<MeshFaceScalarQuantity>()
    }

    /// Gets a mutable face scalar quantity by name.
    pub fn face_scalar_quantity_mut(&mut self, name: &str) -> Option<&mut MeshFaceScalarQuantity> {
        self.get_quantity_mut(name)?
            .as_any_mut()
            .downcast_mut::<MeshFaceScalarQuantity>()
    }

    /// Returns the currently active scalar quantity, if any.
    pub fn active_scalar_quantity(&self) -> Option<&MeshFaceScalarQuantity> {
        self.quantities
            .iter()
            .filter(|q| q.is_enabled())
            .find_map(|q| q.as_any().downcast_ref::<MeshFaceScalarQuantity>())
    }

    /// Gets the surface color.
    pub fn surface_color(&self) -> Vec3 {
        self.surface_color
    }

    /// Gets the transparency (0.0 = opaque, 1.0 = fully transparent).
    pub fn transparency(&self) -> f32 {
        self.transparency
    }

    /// Returns whether the scene should run cell picking on this mesh.
    pub fn is_pickable(&self) -> bool {
        self.pickable
    }

    /// Sets whether the scene should run cell picking on this mesh.
    pub fn set_pickable(&mut self, pickable: bool) {
        self.pickable = pickable;
    }
}

impl Structure for SurfaceMesh {
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
        "SurfaceMesh"
    }

    fn bounding_box(&self) -> Option<(Vec3, Vec3)> {
        transformed_bounds(&self.vertices, self.transform)
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

impl HasQuantities for SurfaceMesh {
    fn add_quantity(&mut self, quantity: Box<dyn Quantity>) {
        self.quantities.push(quantity);
    }

    fn get_quantity(&self, name: &str) -> Option<&dyn Quantity> {
        self.quantities
            .iter()
            .find(|q| q.name() == name)
            .map(std::convert::AsRef::as_ref)
    }

    fn get_quantity_mut(&mut self, name: &str) -> Option<&mut Box<dyn Quantity>> {
        self.quantities.iter_mut().find(|q| q.name() == name)
    }

    fn quantities(&self) -> &[Box<dyn Quantity>] {
        &self.quantities
    }
}
