//! Batched detector mesh assembly.
//!
//! Requested detectors are grouped by shape key. Each group is transformed in
//! one pass over a contiguous slice of the output buffers, so the cost of a
//! frame scales with the number of groups and vertices rather than with
//! per-detector bookkeeping. Buffers are sized up front from the group
//! layout; groups write to disjoint offset ranges.

use glam::Vec3;
use instview_core::error::{ensure_len, InstviewError, Result};
use instview_core::options::AssemblyOptions;
use instview_core::shape::{ShapeKey, ShapeTemplate, ShapeTemplateCache};
use instview_core::table::DetectorTransformTable;
use instview_structures::SurfaceMesh;

use crate::scale::ProjectionScaleEstimator;

/// One merged mesh for a detector subset.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AssembledMesh {
    vertices: Vec<Vec3>,
    faces: Vec<[u32; 3]>,
    cell_to_detector: Vec<u32>,
    faces_per_detector: Vec<u32>,
}

impl AssembledMesh {
    /// Wraps buffers produced elsewhere, e.g. a cached frame.
    ///
    /// Every face must index into `vertices`, and `cell_to_detector` must hold
    /// one entry per face, indexing into `faces_per_detector`.
    pub fn from_parts(
        vertices: Vec<Vec3>,
        faces: Vec<[u32; 3]>,
        cell_to_detector: Vec<u32>,
        faces_per_detector: Vec<u32>,
    ) -> Result<Self> {
        ensure_len(faces.len(), cell_to_detector.len())?;
        let total: usize = faces_per_detector.iter().map(|&t| t as usize).sum();
        ensure_len(faces.len(), total)?;
        if let Some(&d) = cell_to_detector
            .iter()
            .find(|&&d| d as usize >= faces_per_detector.len())
        {
            return Err(InstviewError::IndexOutOfRange {
                index: d as usize,
                len: faces_per_detector.len(),
            });
        }
        if let Some(&i) = faces
            .iter()
            .flatten()
            .find(|&&i| i as usize >= vertices.len())
        {
            return Err(InstviewError::IndexOutOfRange {
                index: i as usize,
                len: vertices.len(),
            });
        }
        Ok(Self {
            vertices,
            faces,
            cell_to_detector,
            faces_per_detector,
        })
    }

    /// Returns the merged vertex buffer.
    pub fn vertices(&self) -> &[Vec3] {
        &self.vertices
    }

    /// Returns the merged triangle buffer.
    pub fn faces(&self) -> &[[u32; 3]] {
        &self.faces
    }

    /// Returns, for every cell, the subset position of the detector that produced it.
    pub fn cell_to_detector(&self) -> &[u32] {
        &self.cell_to_detector
    }

    /// Returns the number of cells each subset detector contributed.
    pub fn faces_per_detector(&self) -> &[u32] {
        &self.faces_per_detector
    }

    /// Returns the number of detectors in the subset.
    pub fn num_detectors(&self) -> usize {
        self.faces_per_detector.len()
    }

    /// Returns the number of cells (triangles).
    pub fn num_cells(&self) -> usize {
        self.faces.len()
    }

    /// Returns true if the mesh has no cells.
    pub fn is_empty(&self) -> bool {
        self.faces.is_empty()
    }

    /// Raw vertex buffer for GPU upload (three `f32` per vertex).
    pub fn vertex_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }

    /// Raw index buffer for GPU upload (three `u32` per cell).
    pub fn face_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.faces)
    }

    /// Expands per-detector values (subset order) to per-cell values.
    pub fn expand_to_cells(&self, detector_values: &[f32]) -> Result<Vec<f32>> {
        ensure_len(self.num_detectors(), detector_values.len())?;
        Ok(expand_to_cells(&self.cell_to_detector, detector_values))
    }

    /// Builds a drawable surface mesh from a copy of the buffers.
    pub fn to_surface_mesh(&self, name: impl Into<String>) -> SurfaceMesh {
        SurfaceMesh::new(name, self.vertices.clone(), self.faces.clone())
    }
}

/// `cell_values[c] = detector_values[cell_to_detector[c]]`.
///
/// Every entry of `cell_to_detector` must index into `detector_values`.
pub fn expand_to_cells(cell_to_detector: &[u32], detector_values: &[f32]) -> Vec<f32> {
    cell_to_detector
        .iter()
        .map(|&d| detector_values[d as usize])
        .collect()
}

/// Arguments of one assembly call.
#[derive(Debug, Clone, Copy)]
pub struct AssemblyRequest<'a> {
    /// Transform-table indices of the requested detectors.
    pub detector_indices: &'a [usize],
    /// Centre at which each detector's shape is placed.
    pub display_positions: &'a [Vec3],
    /// Collapse shapes onto the view plane.
    pub flatten_2d: bool,
    /// Per-detector projection scale, used instead of the estimated one.
    pub scale_override: Option<&'a [f32]>,
    /// Per-detector flag keeping the 3D rotation in flattened views.
    pub rotate_flags: Option<&'a [bool]>,
}

impl<'a> AssemblyRequest<'a> {
    /// Creates a 3D request.
    pub fn new(detector_indices: &'a [usize], display_positions: &'a [Vec3]) -> Self {
        Self {
            detector_indices,
            display_positions,
            flatten_2d: false,
            scale_override: None,
            rotate_flags: None,
        }
    }

    /// Sets whether shapes are flattened onto the view plane.
    #[must_use]
    pub fn flattened(mut self, flatten_2d: bool) -> Self {
        self.flatten_2d = flatten_2d;
        self
    }

    /// Supplies per-detector projection scales.
    #[must_use]
    pub fn with_scale_override(mut self, scales: &'a [f32]) -> Self {
        self.scale_override = Some(scales);
        self
    }

    /// Supplies per-detector rotate flags for flattened views.
    #[must_use]
    pub fn with_rotate_flags(mut self, flags: &'a [bool]) -> Self {
        self.rotate_flags = Some(flags);
        self
    }

    fn validate(&self) -> Result<()> {
        let n = self.detector_indices.len();
        ensure_len(n, self.display_positions.len())?;
        if let Some(scales) = self.scale_override {
            ensure_len(n, scales.len())?;
        }
        if let Some(flags) = self.rotate_flags {
            ensure_len(n, flags.len())?;
        }
        Ok(())
    }
}

/// Projection scale applied after flattening.
enum ProjectionScale<'a> {
    Uniform(f32),
    PerDetector(&'a [f32]),
}

impl ProjectionScale<'_> {
    fn at(&self, k: usize) -> f32 {
        match self {
            Self::Uniform(s) => *s,
            Self::PerDetector(s) => s[k],
        }
    }
}

/// A run of requested detectors sharing one template, with its output offsets.
struct GroupLayout<'t> {
    template: &'t ShapeTemplate,
    /// Range into the key-sorted order of subset positions.
    members: std::ops::Range<usize>,
    vertex_offset: usize,
    face_offset: usize,
}

/// Builds merged meshes from a precomputed transform table and shape cache.
pub struct BatchedMeshAssembler<'a> {
    table: &'a DetectorTransformTable,
    cache: &'a ShapeTemplateCache,
    options: &'a AssemblyOptions,
}

impl<'a> BatchedMeshAssembler<'a> {
    /// Creates an assembler over a precomputed instrument.
    pub fn new(
        table: &'a DetectorTransformTable,
        cache: &'a ShapeTemplateCache,
        options: &'a AssemblyOptions,
    ) -> Self {
        Self {
            table,
            cache,
            options,
        }
    }

    /// Assembles one merged mesh for the requested detectors.
    ///
    /// Cells are ordered by ascending shape key, then by input order within a
    /// key. Indices must be valid table indices.
    pub fn assemble(&self, request: &AssemblyRequest<'_>) -> Result<AssembledMesh> {
        request.validate()?;

        let indices = request.detector_indices;
        let n = indices.len();
        if n == 0 {
            return Ok(AssembledMesh::default());
        }
        debug_assert!(indices.iter().all(|&i| i < self.table.len()));

        let keys: Vec<ShapeKey> = indices
            .iter()
            .map(|&i| self.table.shape_keys()[i])
            .collect();

        let projection_scale = match (request.flatten_2d, request.scale_override) {
            (false, _) => ProjectionScale::Uniform(1.0),
            (true, Some(scales)) => ProjectionScale::PerDetector(scales),
            (true, None) => {
                let estimator = ProjectionScaleEstimator::new(self.table, self.options);
                ProjectionScale::Uniform(
                    estimator.estimate_scale(indices, request.display_positions)?,
                )
            }
        };

        // Stable sort keeps input order within each key.
        let mut order: Vec<usize> = (0..n).collect();
        order.sort_by_key(|&k| keys[k]);

        let (groups, total_vertices, total_faces) = self.layout_groups(&keys, &order)?;
        if u32::try_from(total_vertices).is_err() {
            return Err(InstviewError::IndexOutOfRange {
                index: total_vertices,
                len: u32::MAX as usize,
            });
        }

        let mut mesh = AssembledMesh {
            vertices: vec![Vec3::ZERO; total_vertices],
            faces: vec![[0; 3]; total_faces],
            cell_to_detector: vec![0; total_faces],
            faces_per_detector: vec![0; n],
        };

        for group in &groups {
            self.fill_group(group, &order, request, &projection_scale, &mut mesh);
        }

        debug_assert_eq!(
            mesh.faces_per_detector.iter().map(|&t| t as usize).sum::<usize>(),
            mesh.cell_to_detector.len()
        );
        log::debug!(
            "assembled {n} detectors in {} shape groups: {} vertices, {} cells",
            groups.len(),
            total_vertices,
            total_faces
        );
        Ok(mesh)
    }

    /// Splits the key-sorted order into groups and assigns output offsets.
    fn layout_groups(
        &self,
        keys: &[ShapeKey],
        order: &[usize],
    ) -> Result<(Vec<GroupLayout<'a>>, usize, usize)> {
        let mut groups = Vec::new();
        let mut vertex_offset = 0;
        let mut face_offset = 0;
        let mut start = 0;

        while start < order.len() {
            let key = keys[order[start]];
            let len = order[start..]
                .iter()
                .take_while(|&&k| keys[k] == key)
                .count();
            let template = self
                .cache
                .get(key)
                .map(|template| &**template)
                .ok_or(InstviewError::NotPrecomputed)?;

            groups.push(GroupLayout {
                template,
                members: start..start + len,
                vertex_offset,
                face_offset,
            });
            if !template.is_empty() {
                vertex_offset += len * template.num_vertices();
                face_offset += len * template.num_triangles();
            }
            start += len;
        }

        Ok((groups, vertex_offset, face_offset))
    }

    /// Transforms one group into its slice of the output buffers.
    fn fill_group(
        &self,
        group: &GroupLayout<'_>,
        order: &[usize],
        request: &AssemblyRequest<'_>,
        projection_scale: &ProjectionScale<'_>,
        mesh: &mut AssembledMesh,
    ) {
        let members = &order[group.members.clone()];
        let template = group.template;
        if template.is_empty() {
            // registered through ShapeTemplateCache::insert; faces_per_detector stays 0
            return;
        }

        let v = template.num_vertices();
        let t = template.num_triangles();
        let g = members.len();
        let rotations = self.table.rotations();
        let scales = self.table.scales();

        let vertices = &mut mesh.vertices[group.vertex_offset..group.vertex_offset + g * v];
        let faces = &mut mesh.faces[group.face_offset..group.face_offset + g * t];
        let cells = &mut mesh.cell_to_detector[group.face_offset..group.face_offset + g * t];

        for (slot, &k) in members.iter().enumerate() {
            let detector = request.detector_indices[k];
            let scale = scales[detector];
            let rotation = rotations[detector];
            let position = request.display_positions[k];
            let rotate = !request.flatten_2d || request.rotate_flags.is_some_and(|f| f[k]);
            let projection = projection_scale.at(k);

            let out = &mut vertices[slot * v..(slot + 1) * v];
            for (dst, &local) in out.iter_mut().zip(template.vertices()) {
                let mut p = local * scale;
                if rotate {
                    p = rotation * p;
                }
                if request.flatten_2d {
                    p.z = 0.0;
                    p = p * projection + position;
                    p.z = 0.0;
                } else {
                    p += position;
                }
                *dst = p;
            }

            let base = (group.vertex_offset + slot * v) as u32;
            let out = &mut faces[slot * t..(slot + 1) * t];
            for (dst, tri) in out.iter_mut().zip(template.triangles()) {
                *dst = tri.map(|i| i + base);
            }

            cells[slot * t..(slot + 1) * t].fill(k as u32);
            mesh.faces_per_detector[k] = t as u32;
        }
    }
}
