//! Dense per-detector transform arrays.
//!
//! [`precompute`] walks the geometry model once and stores every detector's
//! position, rotation matrix, scale and shape key in index-aligned arrays. The
//! table is read-only afterwards; reloading an instrument builds a new one.

use glam::{Mat3, Quat, Vec3};

use crate::error::Result;
use crate::geometry::GeometryModel;
use crate::shape::{
    external_shape_key, structural_shape_key, ShapeKey, ShapeTemplateCache, FALLBACK_SHAPE_KEY,
};

/// Index-aligned detector transforms for one loaded instrument.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DetectorTransformTable {
    shape_keys: Vec<ShapeKey>,
    rotations: Vec<Mat3>,
    scales: Vec<Vec3>,
    positions: Vec<Vec3>,
    // detectors whose unkeyed descriptor could not be read
    unreadable_shapes: Vec<usize>,
}

impl DetectorTransformTable {
    /// Creates an empty table with room for `capacity` detectors.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            shape_keys: Vec::with_capacity(capacity),
            rotations: Vec::with_capacity(capacity),
            scales: Vec::with_capacity(capacity),
            positions: Vec::with_capacity(capacity),
            unreadable_shapes: Vec::new(),
        }
    }

    /// Appends one detector's transform.
    pub fn push(&mut self, shape_key: ShapeKey, rotation: Mat3, scale: Vec3, position: Vec3) {
        self.shape_keys.push(shape_key);
        self.rotations.push(rotation);
        self.scales.push(scale);
        self.positions.push(position);
    }

    /// Returns the number of detectors.
    pub fn len(&self) -> usize {
        self.shape_keys.len()
    }

    /// Returns true if the table holds no detectors.
    pub fn is_empty(&self) -> bool {
        self.shape_keys.is_empty()
    }

    /// Returns the shape keys.
    pub fn shape_keys(&self) -> &[ShapeKey] {
        &self.shape_keys
    }

    /// Returns the rotation matrices.
    pub fn rotations(&self) -> &[Mat3] {
        &self.rotations
    }

    /// Returns the local shape scales.
    pub fn scales(&self) -> &[Vec3] {
        &self.scales
    }

    /// Returns the world-space positions.
    pub fn positions(&self) -> &[Vec3] {
        &self.positions
    }

    /// Detectors without an external shape ID whose descriptor could not be read.
    ///
    /// They all share [`FALLBACK_SHAPE_KEY`], so the cache reports them as one
    /// failed key; this list keeps them apart. Failures under an external shape
    /// ID are tracked per key by the cache instead.
    pub fn unreadable_shapes(&self) -> &[usize] {
        &self.unreadable_shapes
    }

    /// Gathers the world positions of the given detectors.
    pub fn gather_positions(&self, indices: &[usize]) -> Vec<Vec3> {
        indices.iter().map(|&i| self.positions[i]).collect()
    }
}

/// Builds the transform table, filling `cache` with one template per distinct shape.
///
/// Shape failures never abort the pass: the detector is given the fallback
/// template instead.
pub fn precompute<M>(model: &M, cache: &mut ShapeTemplateCache) -> DetectorTransformTable
where
    M: GeometryModel + ?Sized,
{
    let n = model.num_detectors();
    let mut table = DetectorTransformTable::with_capacity(n);

    for index in 0..n {
        let shape_key = match resolve_shape_key(model, index, cache) {
            Ok(key) => key,
            Err(err) => {
                if table.unreadable_shapes.is_empty() {
                    log::warn!("detector {index}: {err}; substituting fallback cuboid");
                }
                table.unreadable_shapes.push(index);
                cache.fallback();
                FALLBACK_SHAPE_KEY
            }
        };
        table.push(
            shape_key,
            rotation_matrix(model.rotation(index)),
            model.scale(index),
            model.position(index),
        );
    }

    if table.unreadable_shapes.len() > 1 {
        log::warn!(
            "{} detectors have unreadable shapes and use the fallback cuboid",
            table.unreadable_shapes.len()
        );
    }
    log::info!(
        "precomputed {n} detectors with {} unique shapes",
        cache.len()
    );
    table
}

/// Converts an orientation to a rotation matrix. Degenerate quaternions become identity.
pub fn rotation_matrix(rotation: Quat) -> Mat3 {
    if rotation.is_finite() && rotation.length_squared() > 0.0 {
        Mat3::from_quat(rotation.normalize())
    } else {
        Mat3::IDENTITY
    }
}

/// Fails only when a detector without an external shape ID has an unreadable
/// descriptor, since there is no key to cache the failure under.
fn resolve_shape_key<M>(model: &M, index: usize, cache: &mut ShapeTemplateCache) -> Result<ShapeKey>
where
    M: GeometryModel + ?Sized,
{
    if !model.has_valid_shape(index) {
        log::debug!("detector {index} has no valid shape");
        cache.fallback();
        return Ok(FALLBACK_SHAPE_KEY);
    }

    if let Some(shape_id) = model.shape_id(index) {
        let key = external_shape_key(shape_id);
        cache.get_or_create(key, || model.shape_descriptor(index));
        return Ok(key);
    }

    let descriptor = model.shape_descriptor(index)?;
    let key = structural_shape_key(&descriptor);
    cache.get_or_create(key, move || Ok(descriptor));
    Ok(key)
}
