//! Picking and highlight overlays for one assembled detector surface.
//!
//! Picking uses a point per detector rather than cell picking: flattened shapes
//! are coplanar and overlap, so triangle picks are ambiguous. The highlight
//! overlay is a full copy of the surface drawn semi-transparently on top, with
//! its opacity driven by per-detector values expanded to cells.

use std::sync::{Arc, RwLock};

use glam::{Mat4, Vec3};
use instview_core::error::{ensure_len, InstviewError, Result};
use instview_core::options::OverlayOptions;
use instview_core::pick::{PickResult, Pickable};
use instview_core::structure::Structure;
use instview_structures::{PointCloud, SurfaceMesh};

use crate::assembler::{expand_to_cells, AssembledMesh};
use crate::scene::{PickCallback, Scene, SceneHandle};

/// Name of the drawable detector surface.
pub const DRAWABLE_NAME: &str = "detectors";
/// Name of the pickable point overlay.
pub const PICK_OVERLAY_NAME: &str = "detector picking";
/// Name of the highlight surface.
pub const HIGHLIGHT_NAME: &str = "detector highlight";
/// Scalar label used by a fresh highlight overlay.
pub const DEFAULT_HIGHLIGHT_LABEL: &str = "highlight";

/// Receives the subset index of a picked detector.
pub type DetectorPickCallback = Arc<dyn Fn(usize) + Send + Sync>;

type CallbackSlot = Arc<RwLock<Option<DetectorPickCallback>>>;

/// Whether overlays currently exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayState {
    NoOverlay,
    OverlayBuilt,
}

/// Keeps the drawable surface, pick overlay and highlight overlay in sync.
pub struct PickingAndHighlightController {
    options: OverlayOptions,
    state: OverlayState,

    drawable: Option<SurfaceMesh>,
    pick_points: Option<PointCloud>,
    highlight: Option<SurfaceMesh>,

    drawable_handle: Option<SceneHandle>,
    pick_handle: Option<SceneHandle>,
    highlight_handle: Option<SceneHandle>,

    cell_to_detector: Vec<u32>,
    num_detectors: usize,
    // last (values, label) given to set_scalars, subset-aligned
    cached_scalars: Option<(Vec<f32>, String)>,
    transform: Mat4,
    callback: CallbackSlot,
}

impl Default for PickingAndHighlightController {
    fn default() -> Self {
        Self::new(OverlayOptions::default())
    }
}

impl PickingAndHighlightController {
    pub fn new(options: OverlayOptions) -> Self {
        Self {
            options,
            state: OverlayState::NoOverlay,
            drawable: None,
            pick_points: None,
            highlight: None,
            drawable_handle: None,
            pick_handle: None,
            highlight_handle: None,
            cell_to_detector: Vec::new(),
            num_detectors: 0,
            cached_scalars: None,
            transform: Mat4::IDENTITY,
            callback: Arc::new(RwLock::new(None)),
        }
    }

    pub fn state(&self) -> OverlayState {
        self.state
    }

    /// Sets the function invoked with the subset index of a picked detector.
    ///
    /// Applies to overlays already in a scene as well as future ones.
    pub fn set_pick_callback(&mut self, callback: impl Fn(usize) + Send + Sync + 'static) {
        match self.callback.write() {
            Ok(mut slot) => *slot = Some(Arc::new(callback)),
            Err(_) => log::error!("pick callback lock poisoned, callback not installed"),
        }
    }

    /// Shows a freshly assembled mesh, replacing whatever was shown before.
    ///
    /// `display_positions` are the subset's detector centres used for the pick
    /// overlay. Cached scalars belong to the previous subset and are dropped.
    /// The highlight overlay is not rebuilt; call
    /// [`Self::build_highlight_overlay`] for that.
    pub fn load_mesh(
        &mut self,
        scene: &mut dyn Scene,
        mesh: &AssembledMesh,
        display_positions: &[Vec3],
    ) -> Result<()> {
        ensure_len(mesh.num_detectors(), display_positions.len())?;
        self.remove_from_scene(scene);

        if let Some((_, label)) = self.cached_scalars.take() {
            log::debug!("dropping cached '{label}' scalars of the previous subset");
        }
        self.cell_to_detector = mesh.cell_to_detector().to_vec();
        self.num_detectors = mesh.num_detectors();

        let mut drawable = mesh.to_surface_mesh(DRAWABLE_NAME);
        drawable.set_transform(self.transform);
        self.drawable_handle = Some(scene.add_drawable_mesh(&drawable, false, None));
        self.drawable = Some(drawable);

        let points = self.build_pickable_overlay(display_positions);
        self.pick_handle = Some(scene.add_pickable_overlay(&points, self.scene_callback()));
        self.pick_points = Some(points);

        self.state = OverlayState::OverlayBuilt;
        log::debug!(
            "controller: loaded {} detectors, {} cells",
            self.num_detectors,
            self.cell_to_detector.len()
        );
        Ok(())
    }

    /// Builds a point-per-detector overlay at `positions`.
    pub fn build_pickable_overlay(&self, positions: &[Vec3]) -> PointCloud {
        let mut points = PointCloud::new(PICK_OVERLAY_NAME, positions.to_vec());
        points.set_point_radius(self.options.pick_point_radius);
        points.set_transform(self.transform);
        points
    }

    /// (Re)builds the highlight overlay from the current surface.
    ///
    /// The cell scalars start at zero, or at the last values given to
    /// [`Self::set_scalars`] for this surface.
    pub fn build_highlight_overlay(&mut self, scene: &mut dyn Scene) -> Result<SceneHandle> {
        let drawable = self.drawable.as_ref().ok_or(InstviewError::NoOverlay)?;
        if let Some(handle) = self.highlight_handle.take() {
            scene.remove(handle);
        }

        let mut highlight = drawable.duplicate(HIGHLIGHT_NAME);
        highlight.set_pickable(false);
        let label = match self.apply_cached(&mut highlight, &self.options.highlight_color_map)? {
            Some(label) => label,
            None => {
                let zeros = vec![0.0; highlight.num_faces()];
                highlight
                    .set_face_scalars(DEFAULT_HIGHLIGHT_LABEL, zeros)?
                    .set_colormap(self.options.highlight_color_map.clone());
                DEFAULT_HIGHLIGHT_LABEL.to_string()
            }
        };

        let handle = scene.add_highlight_overlay(
            &highlight,
            &label,
            self.options.highlight_opacity_range,
            &self.options.highlight_color_map,
        );
        self.highlight = Some(highlight);
        self.highlight_handle = Some(handle);
        Ok(handle)
    }

    /// Applies subset-aligned per-detector values to the surface and highlight.
    ///
    /// `values[k]` belongs to the k-th detector of the current subset. The
    /// values and label are cached and re-applied when the highlight overlay
    /// is rebuilt.
    pub fn set_scalars(
        &mut self,
        scene: &mut dyn Scene,
        values: &[f32],
        label: &str,
    ) -> Result<()> {
        let drawable = self.drawable.as_mut().ok_or(InstviewError::NoOverlay)?;
        ensure_len(self.num_detectors, values.len())?;
        let cells = expand_to_cells(&self.cell_to_detector, values);

        drawable
            .set_face_scalars(label, cells.clone())?
            .set_colormap(self.options.data_color_map.clone());
        if let Some(handle) = self.drawable_handle {
            scene.update_cell_scalars(handle, label, &cells);
        }

        if let Some(highlight) = self.highlight.as_mut() {
            highlight
                .set_face_scalars(label, cells.clone())?
                .set_colormap(self.options.highlight_color_map.clone());
            if let Some(handle) = self.highlight_handle {
                scene.update_cell_scalars(handle, label, &cells);
            }
        }

        self.cached_scalars = Some((values.to_vec(), label.to_string()));
        Ok(())
    }

    /// Applies a global display transform to every overlay.
    pub fn apply_transform(&mut self, scene: &mut dyn Scene, transform: Mat4) {
        self.transform = transform;
        if let Some(mesh) = self.drawable.as_mut() {
            mesh.set_transform(transform);
        }
        if let Some(points) = self.pick_points.as_mut() {
            points.set_transform(transform);
        }
        if let Some(mesh) = self.highlight.as_mut() {
            mesh.set_transform(transform);
        }
        for handle in [self.drawable_handle, self.pick_handle, self.highlight_handle]
            .into_iter()
            .flatten()
        {
            scene.apply_transform(handle, transform);
        }
    }

    /// Handles a pick on the point overlay and notifies the pick callback.
    ///
    /// Returns `None` for indices outside the current subset.
    pub fn handle_pick(&self, point_index: usize) -> Option<PickResult> {
        let points = self.pick_points.as_ref()?;
        let Some(&position) = points.points().get(point_index) else {
            log::warn!(
                "ignoring pick of point {point_index}, overlay has {}",
                points.num_points()
            );
            return None;
        };

        notify(&self.callback, point_index);
        Some(PickResult::new(
            points.name(),
            point_index,
            self.transform.transform_point3(position),
        ))
    }

    /// Handles a pick read back from an ID-color buffer.
    pub fn handle_pick_color(&self, color: [u8; 4]) -> Option<PickResult> {
        let index = self.pick_points.as_ref()?.decode_pick_color(color)?;
        self.handle_pick(index)
    }

    /// Removes the highlight overlay. Cached scalars are kept.
    pub fn remove_highlight_overlay(&mut self, scene: &mut dyn Scene) {
        if let Some(handle) = self.highlight_handle.take() {
            scene.remove(handle);
        }
        self.highlight = None;
    }

    /// Removes everything from the scene and forgets cached scalars.
    pub fn clear(&mut self, scene: &mut dyn Scene) {
        self.remove_from_scene(scene);
        self.reset();
    }

    /// Forgets every overlay and cached scalars without touching a scene.
    ///
    /// For when the scene has already been discarded or belongs to an
    /// instrument that is no longer loaded. The pick callback and display
    /// transform are kept.
    pub fn reset(&mut self) {
        self.drawable = None;
        self.pick_points = None;
        self.highlight = None;
        self.drawable_handle = None;
        self.pick_handle = None;
        self.highlight_handle = None;
        self.cell_to_detector.clear();
        self.num_detectors = 0;
        self.cached_scalars = None;
        self.state = OverlayState::NoOverlay;
    }

    pub fn drawable(&self) -> Option<&SurfaceMesh> {
        self.drawable.as_ref()
    }

    pub fn pick_points(&self) -> Option<&PointCloud> {
        self.pick_points.as_ref()
    }

    pub fn highlight(&self) -> Option<&SurfaceMesh> {
        self.highlight.as_ref()
    }

    pub fn drawable_handle(&self) -> Option<SceneHandle> {
        self.drawable_handle
    }

    pub fn pick_handle(&self) -> Option<SceneHandle> {
        self.pick_handle
    }

    pub fn highlight_handle(&self) -> Option<SceneHandle> {
        self.highlight_handle
    }

    pub fn cell_to_detector(&self) -> &[u32] {
        &self.cell_to_detector
    }

    /// The last values and label given to [`Self::set_scalars`].
    pub fn cached_scalars(&self) -> Option<(&[f32], &str)> {
        self.cached_scalars
            .as_ref()
            .map(|(values, label)| (values.as_slice(), label.as_str()))
    }

    pub fn transform(&self) -> Mat4 {
        self.transform
    }

    /// Sets cached scalars on `mesh` and returns their label, if any are cached.
    fn apply_cached(&self, mesh: &mut SurfaceMesh, color_map: &str) -> Result<Option<String>> {
        let Some((values, label)) = &self.cached_scalars else {
            return Ok(None);
        };
        let cells = expand_to_cells(&self.cell_to_detector, values);
        mesh.set_face_scalars(label, cells)?
            .set_colormap(color_map.to_string());
        Ok(Some(label.clone()))
    }

    fn remove_from_scene(&mut self, scene: &mut dyn Scene) {
        for handle in [
            self.drawable_handle.take(),
            self.pick_handle.take(),
            self.highlight_handle.take(),
        ]
        .into_iter()
        .flatten()
        {
            scene.remove(handle);
        }
        self.highlight = None;
    }

    /// Callback handed to the scene: bounds-checks, then forwards to the pick callback.
    fn scene_callback(&self) -> PickCallback {
        let slot = Arc::clone(&self.callback);
        let num_points = self.num_detectors;
        Box::new(move |point_index| {
            if point_index < num_points {
                notify(&slot, point_index);
            } else {
                log::warn!("ignoring pick of point {point_index}, overlay has {num_points}");
            }
        })
    }
}

fn notify(slot: &CallbackSlot, detector: usize) {
    let callback = match slot.read() {
        Ok(guard) => guard.clone(),
        Err(_) => {
            log::error!("pick callback lock poisoned");
            return;
        }
    };
    if let Some(callback) = callback {
        callback(detector);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use crate::scene::HeadlessScene;

    use super::*;

    /// Two detectors: the first has one cell, the second has two.
    fn mesh() -> AssembledMesh {
        AssembledMesh::from_parts(
            vec![
                Vec3::ZERO,
                Vec3::X,
                Vec3::Y,
                Vec3::new(2.0, 0.0, 0.0),
                Vec3::new(3.0, 0.0, 0.0),
                Vec3::new(3.0, 1.0, 0.0),
                Vec3::new(2.0, 1.0, 0.0),
            ],
            vec![[0, 1, 2], [3, 4, 5], [3, 5, 6]],
            vec![0, 1, 1],
            vec![1, 2],
        )
        .unwrap()
    }

    fn positions() -> Vec<Vec3> {
        vec![Vec3::new(0.3, 0.3, 0.0), Vec3::new(2.5, 0.5, 0.0)]
    }

    fn loaded() -> (PickingAndHighlightController, HeadlessScene) {
        let mut scene = HeadlessScene::new();
        let mut controller = PickingAndHighlightController::default();
        controller.load_mesh(&mut scene, &mesh(), &positions()).unwrap();
        (controller, scene)
    }

    #[test]
    fn test_state_machine() {
        let mut scene = HeadlessScene::new();
        let mut controller = PickingAndHighlightController::default();
        assert_eq!(controller.state(), OverlayState::NoOverlay);
        assert!(matches!(
            controller.build_highlight_overlay(&mut scene),
            Err(InstviewError::NoOverlay)
        ));

        controller.load_mesh(&mut scene, &mesh(), &positions()).unwrap();
        assert_eq!(controller.state(), OverlayState::OverlayBuilt);
        assert_eq!(scene.len(), 2);

        controller.set_scalars(&mut scene, &[1.0, 2.0], "counts").unwrap();
        assert_eq!(controller.state(), OverlayState::OverlayBuilt);

        controller.clear(&mut scene);
        assert_eq!(controller.state(), OverlayState::NoOverlay);
        assert!(scene.is_empty());
        assert!(controller.cached_scalars().is_none());
    }

    #[test]
    fn test_load_mesh_checks_positions() {
        let mut scene = HeadlessScene::new();
        let mut controller = PickingAndHighlightController::default();
        let err = controller
            .load_mesh(&mut scene, &mesh(), &[Vec3::ZERO])
            .unwrap_err();
        assert!(matches!(err, InstviewError::SizeMismatch { .. }));
        assert_eq!(controller.state(), OverlayState::NoOverlay);
    }

    #[test]
    fn test_pick_overlay_has_one_point_per_detector() {
        let (controller, scene) = loaded();
        let points = controller.pick_points().unwrap();
        assert_eq!(points.points(), positions().as_slice());
        let recorded = scene.get(controller.pick_handle().unwrap()).unwrap();
        assert_eq!(recorded.points().unwrap().num_points(), 2);
    }

    #[test]
    fn test_highlight_starts_at_zero() {
        let (mut controller, mut scene) = loaded();
        let handle = controller.build_highlight_overlay(&mut scene).unwrap();
        let recorded = scene.get(handle).unwrap();
        assert_eq!(
            recorded.cell_scalars(DEFAULT_HIGHLIGHT_LABEL),
            Some(&[0.0, 0.0, 0.0][..])
        );
        assert_eq!(recorded.mesh().unwrap().num_faces(), 3);
    }

    #[test]
    fn test_set_scalars_reaches_drawable_and_highlight() {
        let (mut controller, mut scene) = loaded();
        let highlight = controller.build_highlight_overlay(&mut scene).unwrap();
        controller.set_scalars(&mut scene, &[5.0, 9.0], "counts").unwrap();

        let expected = [5.0, 9.0, 9.0];
        let drawable = controller.drawable_handle().unwrap();
        assert_eq!(scene.get(drawable).unwrap().cell_scalars("counts"), Some(&expected[..]));
        assert_eq!(scene.get(highlight).unwrap().cell_scalars("counts"), Some(&expected[..]));
        assert_eq!(
            controller
                .highlight()
                .unwrap()
                .face_scalar_quantity("counts")
                .unwrap()
                .values(),
            &expected
        );
    }

    #[test]
    fn test_set_scalars_rejects_wrong_length() {
        let (mut controller, mut scene) = loaded();
        let err = controller
            .set_scalars(&mut scene, &[1.0, 2.0, 3.0], "counts")
            .unwrap_err();
        assert!(matches!(
            err,
            InstviewError::SizeMismatch {
                expected: 2,
                actual: 3
            }
        ));
        assert!(controller.cached_scalars().is_none());
    }

    #[test]
    fn test_rebuilt_highlight_restores_cached_scalars() {
        let (mut controller, mut scene) = loaded();
        controller.build_highlight_overlay(&mut scene).unwrap();
        controller.set_scalars(&mut scene, &[1.0, 0.0], "visible").unwrap();

        controller.remove_highlight_overlay(&mut scene);
        assert!(controller.highlight().is_none());

        let handle = controller.build_highlight_overlay(&mut scene).unwrap();
        assert_eq!(
            scene.get(handle).unwrap().cell_scalars("visible"),
            Some(&[1.0, 0.0, 0.0][..])
        );
        assert_eq!(controller.cached_scalars(), Some((&[1.0, 0.0][..], "visible")));
    }

    #[test]
    fn test_cache_dropped_when_subset_size_changes() {
        let (mut controller, mut scene) = loaded();
        controller.set_scalars(&mut scene, &[1.0, 0.0], "visible").unwrap();

        let single = AssembledMesh::from_parts(
            vec![Vec3::ZERO, Vec3::X, Vec3::Y],
            vec![[0, 1, 2]],
            vec![0],
            vec![1],
        )
        .unwrap();
        controller.load_mesh(&mut scene, &single, &[Vec3::ZERO]).unwrap();
        assert!(controller.cached_scalars().is_none());
    }

    #[test]
    fn test_same_size_subset_does_not_inherit_scalars() {
        let (mut controller, mut scene) = loaded();
        controller.set_scalars(&mut scene, &[5.0, 9.0], "counts").unwrap();

        // a different pair of detectors
        let other = positions().iter().map(|p| *p + Vec3::Y).collect::<Vec<_>>();
        controller.load_mesh(&mut scene, &mesh(), &other).unwrap();
        assert!(controller.cached_scalars().is_none());

        let drawable = controller.drawable_handle().unwrap();
        assert!(scene.get(drawable).unwrap().cell_scalars("counts").is_none());
        let highlight = controller.build_highlight_overlay(&mut scene).unwrap();
        assert_eq!(
            scene.get(highlight).unwrap().cell_scalars(DEFAULT_HIGHLIGHT_LABEL),
            Some(&[0.0, 0.0, 0.0][..])
        );
    }

    #[test]
    fn test_reset_forgets_overlays_but_keeps_callback() {
        let (mut controller, mut scene) = loaded();
        let picked = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&picked);
        controller.set_pick_callback(move |i| sink.lock().unwrap().push(i));
        controller.set_scalars(&mut scene, &[1.0, 2.0], "counts").unwrap();

        controller.reset();
        assert_eq!(controller.state(), OverlayState::NoOverlay);
        assert!(controller.drawable_handle().is_none());
        assert!(controller.pick_handle().is_none());
        assert!(controller.cached_scalars().is_none());
        assert!(controller.handle_pick(0).is_none());
        assert!(matches!(
            controller.set_scalars(&mut scene, &[1.0, 2.0], "counts"),
            Err(InstviewError::NoOverlay)
        ));

        let mut fresh = HeadlessScene::new();
        controller.load_mesh(&mut fresh, &mesh(), &positions()).unwrap();
        fresh.simulate_pick(controller.pick_handle().unwrap(), 1).unwrap();
        assert_eq!(*picked.lock().unwrap(), vec![1]);
    }

    #[test]
    fn test_pick_callback_receives_subset_index() {
        let (mut controller, mut scene) = loaded();
        let picked = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&picked);
        controller.set_pick_callback(move |i| sink.lock().unwrap().push(i));

        scene.simulate_pick(controller.pick_handle().unwrap(), 1).unwrap();
        scene.simulate_pick(controller.pick_handle().unwrap(), 7).unwrap();
        let result = controller.handle_pick(0).unwrap();
        assert!(controller.handle_pick(2).is_none());

        assert_eq!(*picked.lock().unwrap(), vec![1, 0]);
        assert_eq!(result.structure_name, PICK_OVERLAY_NAME);
        assert_eq!(result.world_position, positions()[0]);
    }

    #[test]
    fn test_pick_by_color() {
        let (controller, _scene) = loaded();
        let points = controller.pick_points().unwrap();
        let color = points.encode_pick_color(1);
        assert_eq!(controller.handle_pick_color(color).unwrap().element_index, 1);
        assert!(controller.handle_pick_color([0, 0, 0, 0]).is_none());
    }

    #[test]
    fn test_transform_reaches_every_overlay() {
        let (mut controller, mut scene) = loaded();
        controller.build_highlight_overlay(&mut scene).unwrap();
        let stretch = Mat4::from_scale(Vec3::new(1.0, 2.0, 1.0));
        controller.apply_transform(&mut scene, stretch);

        for handle in [
            controller.drawable_handle(),
            controller.pick_handle(),
            controller.highlight_handle(),
        ] {
            assert_eq!(scene.get(handle.unwrap()).unwrap().transform(), stretch);
        }
        assert_eq!(controller.highlight().unwrap().transform(), stretch);

        // rebuilt overlays keep the transform
        let handle = controller.build_highlight_overlay(&mut scene).unwrap();
        assert_eq!(scene.get(handle).unwrap().transform(), stretch);
        assert_eq!(
            controller.handle_pick(1).unwrap().world_position,
            Vec3::new(2.5, 1.0, 0.0)
        );
    }
}
