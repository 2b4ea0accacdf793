//! Shape templates and the per-instrument template cache.
//!
//! Detectors in a bank almost always share one shape. Each distinct shape is
//! converted once into a [`ShapeTemplate`] (welded vertices plus triangle
//! indices, local frame) and shared by key.

use std::hash::{Hash, Hasher};
use std::sync::Arc;

use glam::Vec3;
use rustc_hash::{FxHashMap, FxHashSet, FxHasher};

use crate::error::{InstviewError, Result};
use crate::geometry::ShapeDescriptor;

/// Content key identifying a shape template.
pub type ShapeKey = i64;

/// Key reserved for the fallback primitive.
pub const FALLBACK_SHAPE_KEY: ShapeKey = 0;

/// An immutable local-frame triangle mesh shared by detectors with identical shape.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ShapeTemplate {
    vertices: Vec<Vec3>,
    triangles: Vec<[u32; 3]>,
}

impl ShapeTemplate {
    /// Creates a template, checking that every triangle index is in range.
    pub fn new(vertices: Vec<Vec3>, triangles: Vec<[u32; 3]>) -> Result<Self> {
        let len = vertices.len();
        if let Some(&bad) = triangles.iter().flatten().find(|&&i| i as usize >= len) {
            return Err(InstviewError::IndexOutOfRange {
                index: bad as usize,
                len,
            });
        }
        Ok(Self {
            vertices,
            triangles,
        })
    }

    /// Converts a raw triangle soup into welded vertices and triangle indices.
    ///
    /// Corners with bit-identical coordinates share one vertex. Empty soups and
    /// soups containing non-finite coordinates are rejected.
    pub fn from_descriptor(descriptor: &ShapeDescriptor) -> Result<Self> {
        if descriptor.is_empty() {
            return Err(InstviewError::ShapeExtraction(
                "shape has no triangles".to_string(),
            ));
        }

        let mut index_of: FxHashMap<[u32; 3], u32> = FxHashMap::default();
        let mut vertices = Vec::new();
        let mut triangles = Vec::with_capacity(descriptor.num_triangles());

        for corners in &descriptor.triangles {
            let mut tri = [0u32; 3];
            for (slot, corner) in tri.iter_mut().zip(corners) {
                if !corner.is_finite() {
                    return Err(InstviewError::ShapeExtraction(format!(
                        "non-finite vertex {corner}"
                    )));
                }
                let bits = corner.to_array().map(f32::to_bits);
                *slot = *index_of.entry(bits).or_insert_with(|| {
                    vertices.push(*corner);
                    (vertices.len() - 1) as u32
                });
            }
            triangles.push(tri);
        }

        Ok(Self {
            vertices,
            triangles,
        })
    }

    /// Creates an axis-aligned cuboid centred on the origin (8 vertices, 12 triangles).
    pub fn cuboid(size: Vec3) -> Self {
        let h = size * 0.5;
        let vertices = vec![
            Vec3::new(-h.x, -h.y, -h.z),
            Vec3::new(h.x, -h.y, -h.z),
            Vec3::new(h.x, h.y, -h.z),
            Vec3::new(-h.x, h.y, -h.z),
            Vec3::new(-h.x, -h.y, h.z),
            Vec3::new(h.x, -h.y, h.z),
            Vec3::new(h.x, h.y, h.z),
            Vec3::new(-h.x, h.y, h.z),
        ];
        let triangles = vec![
            // -z
            [0, 2, 1],
            [0, 3, 2],
            // +z
            [4, 5, 6],
            [4, 6, 7],
            // -y
            [0, 1, 5],
            [0, 5, 4],
            // +y
            [3, 6, 2],
            [3, 7, 6],
            // -x
            [0, 4, 7],
            [0, 7, 3],
            // +x
            [1, 2, 6],
            [1, 6, 5],
        ];
        Self {
            vertices,
            triangles,
        }
    }

    /// Returns the local-frame vertices.
    pub fn vertices(&self) -> &[Vec3] {
        &self.vertices
    }

    /// Returns the triangles as indices into [`Self::vertices`].
    pub fn triangles(&self) -> &[[u32; 3]] {
        &self.triangles
    }

    /// Returns the number of vertices.
    pub fn num_vertices(&self) -> usize {
        self.vertices.len()
    }

    /// Returns the number of triangles.
    pub fn num_triangles(&self) -> usize {
        self.triangles.len()
    }

    /// Returns true if the template contributes no geometry.
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty() || self.triangles.is_empty()
    }
}

/// Derives a shape key from the raw triangle data.
///
/// Never returns [`FALLBACK_SHAPE_KEY`].
pub fn structural_shape_key(descriptor: &ShapeDescriptor) -> ShapeKey {
    let mut hasher = FxHasher::default();
    "mesh".hash(&mut hasher);
    descriptor.triangles.len().hash(&mut hasher);
    for corner in descriptor.triangles.iter().flatten() {
        corner.to_array().map(f32::to_bits).hash(&mut hasher);
    }
    nonzero_key(hasher.finish())
}

/// Derives a shape key from an identifier supplied by the geometry model.
///
/// Never returns [`FALLBACK_SHAPE_KEY`].
pub fn external_shape_key(shape_id: u64) -> ShapeKey {
    let mut hasher = FxHasher::default();
    "id".hash(&mut hasher);
    shape_id.hash(&mut hasher);
    nonzero_key(hasher.finish())
}

fn nonzero_key(hash: u64) -> ShapeKey {
    match ShapeKey::from_ne_bytes(hash.to_ne_bytes()) {
        FALLBACK_SHAPE_KEY => 1,
        key => key,
    }
}

/// Deduplicating store of shape templates for one loaded instrument.
///
/// Entries are never mutated. The whole cache is cleared when the instrument is
/// reloaded.
#[derive(Debug)]
pub struct ShapeTemplateCache {
    templates: FxHashMap<ShapeKey, Arc<ShapeTemplate>>,
    reported_failures: FxHashSet<ShapeKey>,
    fallback_size: f32,
}

impl Default for ShapeTemplateCache {
    fn default() -> Self {
        Self::new(crate::options::AssemblyOptions::default().fallback_cuboid_size)
    }
}

impl ShapeTemplateCache {
    /// Creates an empty cache whose fallback is a cube with the given edge length.
    pub fn new(fallback_cuboid_size: f32) -> Self {
        Self {
            templates: FxHashMap::default(),
            reported_failures: FxHashSet::default(),
            fallback_size: fallback_cuboid_size,
        }
    }

    /// Returns the template for `key`, building it from `mesh_source` on first use.
    ///
    /// If `mesh_source` fails or yields no triangles, the fallback template is
    /// installed under `key` and returned; the failure is logged once per key.
    pub fn get_or_create<F>(&mut self, key: ShapeKey, mesh_source: F) -> Arc<ShapeTemplate>
    where
        F: FnOnce() -> Result<Arc<ShapeDescriptor>>,
    {
        if let Some(template) = self.templates.get(&key) {
            return Arc::clone(template);
        }
        if key == FALLBACK_SHAPE_KEY {
            return self.fallback();
        }

        let template = match mesh_source().and_then(|d| ShapeTemplate::from_descriptor(&d)) {
            Ok(template) => Arc::new(template),
            Err(err) => {
                self.report_failure(key, &err);
                self.fallback()
            }
        };
        self.templates.insert(key, Arc::clone(&template));
        template
    }

    /// Returns the fallback template, installing it under [`FALLBACK_SHAPE_KEY`].
    pub fn fallback(&mut self) -> Arc<ShapeTemplate> {
        let size = self.fallback_size;
        Arc::clone(
            self.templates
                .entry(FALLBACK_SHAPE_KEY)
                .or_insert_with(|| Arc::new(ShapeTemplate::cuboid(Vec3::splat(size)))),
        )
    }

    /// Registers a caller-built template under `key`.
    ///
    /// Lets a host supply shapes the geometry model cannot describe, including
    /// empty templates for detectors that are picked but never drawn. Returns
    /// false, leaving the cache unchanged, if `key` is already cached or is
    /// [`FALLBACK_SHAPE_KEY`].
    pub fn insert(&mut self, key: ShapeKey, template: ShapeTemplate) -> bool {
        if key == FALLBACK_SHAPE_KEY || self.templates.contains_key(&key) {
            return false;
        }
        self.templates.insert(key, Arc::new(template));
        true
    }

    /// Logs a shape-extraction failure unless one was already logged for `key`.
    ///
    /// Returns true if this call logged.
    pub fn report_failure(&mut self, key: ShapeKey, err: &InstviewError) -> bool {
        let first = self.reported_failures.insert(key);
        if first {
            log::warn!("shape {key:#x}: {err}; substituting fallback cuboid");
        }
        first
    }

    /// Number of distinct keys whose shape could not be extracted.
    pub fn num_failed_keys(&self) -> usize {
        self.reported_failures.len()
    }

    /// Gets a template by key.
    pub fn get(&self, key: ShapeKey) -> Option<&Arc<ShapeTemplate>> {
        self.templates.get(&key)
    }

    /// Checks if a template with the given key exists.
    pub fn contains(&self, key: ShapeKey) -> bool {
        self.templates.contains_key(&key)
    }

    /// Returns the number of cached templates.
    pub fn len(&self) -> usize {
        self.templates.len()
    }

    /// Returns true if no template is cached.
    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// Removes every template.
    pub fn clear(&mut self) {
        self.templates.clear();
        self.reported_failures.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triangle_soup() -> ShapeDescriptor {
        ShapeDescriptor::new(vec![
            [Vec3::ZERO, Vec3::X, Vec3::Y],
            [Vec3::X, Vec3::new(1.0, 1.0, 0.0), Vec3::Y],
        ])
    }

    #[test]
    fn test_from_descriptor_welds_vertices() {
        let template = ShapeTemplate::from_descriptor(&triangle_soup()).unwrap();
        assert_eq!(template.num_vertices(), 4);
        assert_eq!(template.num_triangles(), 2);
        assert_eq!(template.triangles()[0], [0, 1, 2]);
        assert_eq!(template.triangles()[1], [1, 3, 2]);
    }

    #[test]
    fn test_from_descriptor_rejects_empty_and_nan() {
        assert!(ShapeTemplate::from_descriptor(&ShapeDescriptor::default()).is_err());
        let nan = ShapeDescriptor::new(vec![[Vec3::ZERO, Vec3::X, Vec3::splat(f32::NAN)]]);
        assert!(ShapeTemplate::from_descriptor(&nan).is_err());
    }

    #[test]
    fn test_new_rejects_out_of_range_index() {
        let err = ShapeTemplate::new(vec![Vec3::ZERO; 3], vec![[0, 1, 3]]).unwrap_err();
        assert!(matches!(
            err,
            InstviewError::IndexOutOfRange { index: 3, len: 3 }
        ));
    }

    #[test]
    fn test_cuboid_counts() {
        let cube = ShapeTemplate::cuboid(Vec3::ONE);
        assert_eq!(cube.num_vertices(), 8);
        assert_eq!(cube.num_triangles(), 12);
        for v in cube.vertices() {
            assert_eq!(v.abs(), Vec3::splat(0.5));
        }
    }

    #[test]
    fn test_structural_key_is_content_based() {
        let a = structural_shape_key(&triangle_soup());
        let b = structural_shape_key(&triangle_soup());
        let other = structural_shape_key(&ShapeDescriptor::new(vec![[
            Vec3::ZERO,
            Vec3::Z,
            Vec3::Y,
        ]]));
        assert_eq!(a, b);
        assert_ne!(a, other);
        assert_ne!(a, FALLBACK_SHAPE_KEY);
        assert_ne!(external_shape_key(0), FALLBACK_SHAPE_KEY);
    }

    #[test]
    fn test_get_or_create_only_builds_once() {
        let mut cache = ShapeTemplateCache::default();
        let mut calls = 0;
        for _ in 0..3 {
            cache.get_or_create(42, || {
                calls += 1;
                Ok(Arc::new(triangle_soup()))
            });
        }
        assert_eq!(calls, 1);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(42).unwrap().num_triangles(), 2);
    }

    #[test]
    fn test_failed_source_installs_fallback() {
        let mut cache = ShapeTemplateCache::new(2.0);
        let template = cache.get_or_create(7, || {
            Err(InstviewError::ShapeExtraction("broken".to_string()))
        });
        assert_eq!(template.num_triangles(), 12);
        assert_eq!(template.vertices()[0], Vec3::splat(-1.0));
        assert!(cache.contains(7));
        assert!(cache.contains(FALLBACK_SHAPE_KEY));

        let empty = cache.get_or_create(8, || Ok(Arc::new(ShapeDescriptor::default())));
        assert_eq!(empty.num_triangles(), 12);
        assert_eq!(cache.num_failed_keys(), 2);
    }

    #[test]
    fn test_failure_reported_once_per_key() {
        let mut cache = ShapeTemplateCache::default();
        let mut calls = 0;
        for _ in 0..3 {
            cache.get_or_create(7, || {
                calls += 1;
                Err(InstviewError::ShapeExtraction("broken".to_string()))
            });
        }
        assert_eq!(calls, 1);
        assert_eq!(cache.num_failed_keys(), 1);

        let err = InstviewError::ShapeExtraction("broken".to_string());
        assert!(!cache.report_failure(7, &err));
        assert!(cache.report_failure(9, &err));
        assert_eq!(cache.num_failed_keys(), 2);

        cache.clear();
        assert_eq!(cache.num_failed_keys(), 0);
    }

    #[test]
    fn test_insert_prebuilt_template() {
        let mut cache = ShapeTemplateCache::default();
        assert!(cache.insert(5, ShapeTemplate::default()));
        assert!(!cache.insert(5, ShapeTemplate::cuboid(Vec3::ONE)));
        assert!(!cache.insert(FALLBACK_SHAPE_KEY, ShapeTemplate::default()));
        assert!(!cache.contains(FALLBACK_SHAPE_KEY));

        // source is not consulted for a registered key
        let template = cache.get_or_create(5, || panic!("source called"));
        assert!(template.is_empty());
    }

    proptest::proptest! {
        #[test]
        fn welding_preserves_triangles(
            coords in proptest::collection::vec(-3i8..3, 9..90)
        ) {
            // small integer grid so corners repeat
            let flat: Vec<f32> = coords
                .iter()
                .take(coords.len() / 9 * 9)
                .map(|&c| f32::from(c))
                .collect();
            let soup = ShapeDescriptor::from_flat(&flat).unwrap();
            let template = ShapeTemplate::from_descriptor(&soup).unwrap();

            proptest::prop_assert_eq!(template.num_triangles(), soup.num_triangles());
            proptest::prop_assert!(template.num_vertices() <= 3 * soup.num_triangles());
            for (tri, corners) in template.triangles().iter().zip(&soup.triangles) {
                let rebuilt = tri.map(|i| template.vertices()[i as usize]);
                proptest::prop_assert_eq!(&rebuilt, corners);
            }
        }
    }

    #[test]
    fn test_clear() {
        let mut cache = ShapeTemplateCache::default();
        cache.fallback();
        assert!(!cache.is_empty());
        cache.clear();
        assert!(cache.is_empty());
    }
}
