//! Per-instrument view state.
//!
//! [`InstrumentView`] owns everything built for one loaded instrument: the
//! shape cache, the transform table, the ID map and the overlay controller.
//! Loading a new instrument replaces all of it; nothing is shared across views.

use glam::{Mat4, Vec3};
use instview_core::error::{InstviewError, Result};
use instview_core::geometry::{DetectorId, GeometryModel};
use instview_core::options::Options;
use instview_core::resolve::DetectorIdMap;
use instview_core::shape::ShapeTemplateCache;
use instview_core::table::{precompute, DetectorTransformTable};

use crate::assembler::{AssembledMesh, AssemblyRequest, BatchedMeshAssembler};
use crate::controller::PickingAndHighlightController;
use crate::projection::Projection;
use crate::scale::ProjectionScaleEstimator;
use crate::scene::{Scene, SceneHandle};

/// A loaded instrument and what is currently shown of it.
pub struct InstrumentView {
    options: Options,
    cache: ShapeTemplateCache,
    table: Option<DetectorTransformTable>,
    ids: DetectorIdMap,
    controller: PickingAndHighlightController,
}

impl Default for InstrumentView {
    fn default() -> Self {
        Self::new(Options::default())
    }
}

impl InstrumentView {
    /// Creates a view with nothing loaded.
    pub fn new(options: Options) -> Self {
        Self {
            cache: ShapeTemplateCache::new(options.assembly.fallback_cuboid_size),
            controller: PickingAndHighlightController::new(options.overlay.clone()),
            table: None,
            ids: DetectorIdMap::default(),
            options,
        }
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    /// Precomputes transforms and shape templates for `model`.
    ///
    /// Overlays built for a previously loaded instrument are forgotten, but
    /// any scene they were added to is left as is; use [`Self::reload`] to
    /// remove them too.
    pub fn load<M>(&mut self, model: &M)
    where
        M: GeometryModel + ?Sized,
    {
        self.controller.reset();
        self.cache.clear();
        self.ids = DetectorIdMap::from_model(model);
        self.table = Some(precompute(model, &mut self.cache));
    }

    /// Clears the scene and loads a new instrument, or the same one after it changed.
    pub fn reload<M>(&mut self, scene: &mut dyn Scene, model: &M)
    where
        M: GeometryModel + ?Sized,
    {
        self.controller.clear(scene);
        self.load(model);
        log::info!("reloaded instrument with {} detectors", self.ids.len());
    }

    /// Returns true once an instrument has been loaded.
    pub fn is_precomputed(&self) -> bool {
        self.table.is_some()
    }

    /// The transform table of the loaded instrument.
    pub fn table(&self) -> Result<&DetectorTransformTable> {
        self.table.as_ref().ok_or(InstviewError::NotPrecomputed)
    }

    pub fn cache(&self) -> &ShapeTemplateCache {
        &self.cache
    }

    pub fn controller(&self) -> &PickingAndHighlightController {
        &self.controller
    }

    pub fn controller_mut(&mut self) -> &mut PickingAndHighlightController {
        &mut self.controller
    }

    /// Maps detector IDs to table indices. Fails on the first unknown ID.
    pub fn resolve_ids(&self, ids: &[DetectorId]) -> Result<Vec<usize>> {
        self.table()?;
        self.ids.resolve(ids)
    }

    /// Assembles a mesh without showing it.
    pub fn assemble(&self, request: &AssemblyRequest<'_>) -> Result<AssembledMesh> {
        let table = self.table()?;
        BatchedMeshAssembler::new(table, &self.cache, &self.options.assembly).assemble(request)
    }

    /// Per-detector projection scales computed separately for each group.
    pub fn group_scales(
        &self,
        detector_indices: &[usize],
        projected_positions: &[Vec3],
        group_of: &[u32],
    ) -> Result<Vec<f32>> {
        ProjectionScaleEstimator::new(self.table()?, &self.options.assembly).estimate_group_scales(
            detector_indices,
            projected_positions,
            group_of,
        )
    }

    /// Assembles `request` and shows it in `scene`, replacing the previous subset.
    pub fn show(
        &mut self,
        scene: &mut dyn Scene,
        request: &AssemblyRequest<'_>,
    ) -> Result<AssembledMesh> {
        let mesh = self.assemble(request)?;
        self.controller
            .load_mesh(scene, &mesh, request.display_positions)?;
        Ok(mesh)
    }

    /// Resolves `ids`, projects their positions and shows the assembled subset.
    ///
    /// Flattened projections estimate one projection scale for the whole subset.
    pub fn render_subset(
        &mut self,
        scene: &mut dyn Scene,
        ids: &[DetectorId],
        projection: Projection,
        sample_position: Vec3,
    ) -> Result<AssembledMesh> {
        let indices = self.resolve_ids(ids)?;
        let positions = self.table()?.gather_positions(&indices);
        let display = projection.project(&positions, sample_position);
        let request = AssemblyRequest::new(&indices, &display).flattened(projection.is_flat());
        let mesh = self.show(scene, &request)?;
        log::debug!(
            "rendered {} detectors ({projection:?}) as {} cells",
            ids.len(),
            mesh.num_cells()
        );
        Ok(mesh)
    }

    /// Builds or rebuilds the highlight overlay for the shown subset.
    pub fn build_highlight_overlay(&mut self, scene: &mut dyn Scene) -> Result<SceneHandle> {
        self.controller.build_highlight_overlay(scene)
    }

    /// Applies per-detector values (aligned with the shown subset) to the overlays.
    pub fn set_scalars(&mut self, scene: &mut dyn Scene, values: &[f32], label: &str) -> Result<()> {
        self.controller.set_scalars(scene, values, label)
    }

    /// Applies a display transform to everything shown.
    pub fn apply_transform(&mut self, scene: &mut dyn Scene, transform: Mat4) {
        self.controller.apply_transform(scene, transform);
    }
}
