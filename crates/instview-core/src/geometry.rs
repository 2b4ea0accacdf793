//! Geometry model interface and an in-memory provider.
//!
//! The instrument geometry (positions, orientations, scale factors and raw
//! shapes of every detector) lives outside this crate. [`GeometryModel`] is the
//! capability interface everything downstream consumes; [`InstrumentGeometry`]
//! is a plain in-memory adapter for callers that already hold the data.

use std::sync::Arc;

use glam::{Quat, Vec3};

use crate::error::{InstviewError, Result};

/// Logical detector identifier as used by masking and visibility logic.
pub type DetectorId = i64;

/// Raw triangle soup describing a detector shape in its local frame.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ShapeDescriptor {
    /// Triangles as three corner positions each.
    pub triangles: Vec<[Vec3; 3]>,
}

impl ShapeDescriptor {
    /// Creates a descriptor from triangle corners.
    pub fn new(triangles: Vec<[Vec3; 3]>) -> Self {
        Self { triangles }
    }

    /// Creates a descriptor from a flat `[x, y, z]` list, nine floats per triangle.
    ///
    /// Trailing floats that do not make up a whole triangle are an error.
    pub fn from_flat(coords: &[f32]) -> Result<Self> {
        if coords.len() % 9 != 0 {
            return Err(InstviewError::ShapeExtraction(format!(
                "flat triangle list has {} floats, not a multiple of 9",
                coords.len()
            )));
        }
        let triangles = coords
            .chunks_exact(9)
            .map(|c| {
                [
                    Vec3::new(c[0], c[1], c[2]),
                    Vec3::new(c[3], c[4], c[5]),
                    Vec3::new(c[6], c[7], c[8]),
                ]
            })
            .collect();
        Ok(Self { triangles })
    }

    /// Returns the number of triangles.
    pub fn num_triangles(&self) -> usize {
        self.triangles.len()
    }

    /// Returns true if the descriptor holds no triangles.
    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }
}

/// Per-detector accessors provided by an external instrument geometry.
///
/// Indices are dense in `[0, num_detectors())`. Accessors may assume the index
/// is in range.
pub trait GeometryModel {
    /// Returns the number of detectors.
    fn num_detectors(&self) -> usize;

    /// Returns the logical ID of the detector at `index`.
    fn detector_id(&self, index: usize) -> DetectorId;

    /// Returns the world-space centre (metres).
    fn position(&self, index: usize) -> Vec3;

    /// Returns the world-space orientation.
    fn rotation(&self, index: usize) -> Quat;

    /// Returns the per-axis scale applied to the local shape before rotation.
    fn scale(&self, index: usize) -> Vec3;

    /// Returns whether the detector has a shape that can be extracted.
    fn has_valid_shape(&self, index: usize) -> bool;

    /// Returns the raw local-frame triangle soup of the detector shape.
    fn shape_descriptor(&self, index: usize) -> Result<Arc<ShapeDescriptor>>;

    /// Returns a stable shape identifier, if the model has one.
    ///
    /// When `None`, the shape is keyed by a structural hash of its triangles.
    fn shape_id(&self, _index: usize) -> Option<u64> {
        None
    }
}

/// The shape reported for a detector in an [`InstrumentGeometry`].
#[derive(Debug, Clone, PartialEq)]
pub enum DetectorShape {
    /// A triangle soup, usually shared between many detectors.
    Mesh(Arc<ShapeDescriptor>),
    /// The detector has no shape.
    Missing,
    /// The shape exists but cannot be extracted.
    Unreadable(String),
}

/// One detector record of an [`InstrumentGeometry`].
#[derive(Debug, Clone, PartialEq)]
pub struct DetectorSpec {
    /// Logical detector ID.
    pub id: DetectorId,
    /// World-space centre.
    pub position: Vec3,
    /// World-space orientation.
    pub rotation: Quat,
    /// Local shape scale.
    pub scale: Vec3,
    /// Local shape.
    pub shape: DetectorShape,
    /// Optional stable shape identifier.
    pub shape_id: Option<u64>,
}

impl DetectorSpec {
    /// Creates an unrotated, unscaled detector with the given shape.
    pub fn new(id: DetectorId, position: Vec3, shape: Arc<ShapeDescriptor>) -> Self {
        Self {
            id,
            position,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
            shape: DetectorShape::Mesh(shape),
            shape_id: None,
        }
    }

    /// Creates a detector that reports no valid shape.
    pub fn without_shape(id: DetectorId, position: Vec3) -> Self {
        Self {
            id,
            position,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
            shape: DetectorShape::Missing,
            shape_id: None,
        }
    }

    /// Sets the orientation.
    #[must_use]
    pub fn with_rotation(mut self, rotation: Quat) -> Self {
        self.rotation = rotation;
        self
    }

    /// Sets the local shape scale.
    #[must_use]
    pub fn with_scale(mut self, scale: Vec3) -> Self {
        self.scale = scale;
        self
    }

    /// Sets the shape.
    #[must_use]
    pub fn with_shape(mut self, shape: DetectorShape) -> Self {
        self.shape = shape;
        self
    }

    /// Sets a stable shape identifier.
    #[must_use]
    pub fn with_shape_id(mut self, shape_id: u64) -> Self {
        self.shape_id = Some(shape_id);
        self
    }
}

/// An in-memory [`GeometryModel`].
#[derive(Debug, Clone, Default)]
pub struct InstrumentGeometry {
    detectors: Vec<DetectorSpec>,
}

impl InstrumentGeometry {
    /// Creates a geometry from detector records, in index order.
    pub fn new(detectors: Vec<DetectorSpec>) -> Self {
        Self { detectors }
    }

    /// Appends a detector and returns its index.
    pub fn push(&mut self, detector: DetectorSpec) -> usize {
        self.detectors.push(detector);
        self.detectors.len() - 1
    }

    /// Returns the detector records.
    pub fn detectors(&self) -> &[DetectorSpec] {
        &self.detectors
    }
}

impl GeometryModel for InstrumentGeometry {
    fn num_detectors(&self) -> usize {
        self.detectors.len()
    }

    fn detector_id(&self, index: usize) -> DetectorId {
        self.detectors[index].id
    }

    fn position(&self, index: usize) -> Vec3 {
        self.detectors[index].position
    }

    fn rotation(&self, index: usize) -> Quat {
        self.detectors[index].rotation
    }

    fn scale(&self, index: usize) -> Vec3 {
        self.detectors[index].scale
    }

    fn has_valid_shape(&self, index: usize) -> bool {
        !matches!(self.detectors[index].shape, DetectorShape::Missing)
    }

    fn shape_descriptor(&self, index: usize) -> Result<Arc<ShapeDescriptor>> {
        match &self.detectors[index].shape {
            DetectorShape::Mesh(shape) => Ok(Arc::clone(shape)),
            DetectorShape::Missing => Err(InstviewError::ShapeExtraction(format!(
                "detector {} has no shape",
                self.detectors[index].id
            ))),
            DetectorShape::Unreadable(reason) => {
                Err(InstviewError::ShapeExtraction(reason.clone()))
            }
        }
    }

    fn shape_id(&self, index: usize) -> Option<u64> {
        self.detectors[index].shape_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_flat() {
        let coords = [0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0];
        let shape = ShapeDescriptor::from_flat(&coords).unwrap();
        assert_eq!(shape.num_triangles(), 1);
        assert_eq!(shape.triangles[0][1], Vec3::X);
    }

    #[test]
    fn test_from_flat_rejects_partial_triangle() {
        let err = ShapeDescriptor::from_flat(&[0.0; 10]).unwrap_err();
        assert!(matches!(err, InstviewError::ShapeExtraction(_)));
    }

    #[test]
    fn test_instrument_geometry_accessors() {
        let shape = Arc::new(ShapeDescriptor::default());
        let mut geometry = InstrumentGeometry::default();
        geometry.push(DetectorSpec::new(7, Vec3::X, shape).with_scale(Vec3::splat(2.0)));
        geometry.push(DetectorSpec::without_shape(8, Vec3::Y));

        assert_eq!(geometry.num_detectors(), 2);
        assert_eq!(geometry.detector_id(1), 8);
        assert_eq!(geometry.scale(0), Vec3::splat(2.0));
        assert!(geometry.has_valid_shape(0));
        assert!(!geometry.has_valid_shape(1));
        assert!(geometry.shape_descriptor(1).is_err());
    }

    #[test]
    fn test_unreadable_shape_reports_reason() {
        let geometry = InstrumentGeometry::new(vec![DetectorSpec::without_shape(1, Vec3::ZERO)
            .with_shape(DetectorShape::Unreadable("bad xml".to_string()))]);
        assert!(geometry.has_valid_shape(0));
        let err = geometry.shape_descriptor(0).unwrap_err();
        assert_eq!(err.to_string(), "shape extraction failed: bad xml");
    }
}
