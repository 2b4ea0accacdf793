//! Scene (plotter) seam.
//!
//! The controller never talks to a renderer directly; it hands structures to a
//! [`Scene`]. [`HeadlessScene`] records everything it is given and is used by
//! tests and the demo.

use glam::{Mat4, Vec3, Vec4};
use instview_core::error::{InstviewError, Result};
use instview_core::structure::Structure;
use instview_structures::{ColorMap, PointCloud, SurfaceMesh};
use rustc_hash::FxHashMap;

/// Invoked with a point index of a pickable overlay.
pub type PickCallback = Box<dyn FnMut(usize) + Send>;

/// Opaque reference to an object added to a scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SceneHandle(pub u64);

/// Receiver of assembled meshes and overlays.
pub trait Scene {
    /// Adds the detector surface. `color_scalars` names the face quantity used for coloring.
    fn add_drawable_mesh(
        &mut self,
        mesh: &SurfaceMesh,
        pickable: bool,
        color_scalars: Option<&str>,
    ) -> SceneHandle;

    /// Adds a point overlay used only for picking.
    fn add_pickable_overlay(&mut self, points: &PointCloud, callback: PickCallback)
        -> SceneHandle;

    /// Adds a semi-transparent copy of the surface whose opacity follows `scalar_label`.
    fn add_highlight_overlay(
        &mut self,
        mesh: &SurfaceMesh,
        scalar_label: &str,
        opacity_range: (f32, f32),
        color_map: &str,
    ) -> SceneHandle;

    /// Sets the model transform of an object.
    fn apply_transform(&mut self, handle: SceneHandle, transform: Mat4);

    /// Replaces the per-cell scalars of a mesh object under `label`.
    fn update_cell_scalars(&mut self, handle: SceneHandle, label: &str, values: &[f32]);

    /// Removes an object. Unknown handles are ignored.
    fn remove(&mut self, handle: SceneHandle);
}

/// What a recorded object was added as.
#[derive(Debug, Clone, PartialEq)]
pub enum SceneObjectKind {
    Drawable {
        pickable: bool,
        color_scalars: Option<String>,
    },
    PickOverlay,
    Highlight {
        scalar_label: String,
        opacity_range: (f32, f32),
        color_map: String,
    },
}

enum Geometry {
    Mesh(SurfaceMesh),
    Points(PointCloud, PickCallback),
}

/// A recorded scene object.
pub struct SceneObject {
    kind: SceneObjectKind,
    geometry: Geometry,
}

impl SceneObject {
    pub fn kind(&self) -> &SceneObjectKind {
        &self.kind
    }

    /// The recorded mesh, for drawable and highlight objects.
    pub fn mesh(&self) -> Option<&SurfaceMesh> {
        match &self.geometry {
            Geometry::Mesh(mesh) => Some(mesh),
            Geometry::Points(..) => None,
        }
    }

    /// The recorded point cloud, for pick overlays.
    pub fn points(&self) -> Option<&PointCloud> {
        match &self.geometry {
            Geometry::Points(points, _) => Some(points),
            Geometry::Mesh(_) => None,
        }
    }

    pub fn transform(&self) -> Mat4 {
        match &self.geometry {
            Geometry::Mesh(mesh) => mesh.transform(),
            Geometry::Points(points, _) => points.transform(),
        }
    }

    /// Values last sent for `label`, if this is a mesh object.
    pub fn cell_scalars(&self, label: &str) -> Option<&[f32]> {
        self.mesh()?
            .face_scalar_quantity(label)
            .map(instview_structures::MeshFaceScalarQuantity::values)
    }
}

/// In-memory scene that records what a plotter would display.
pub struct HeadlessScene {
    objects: FxHashMap<u64, SceneObject>,
    next_handle: u64,
}

impl Default for HeadlessScene {
    fn default() -> Self {
        Self::new()
    }
}

impl HeadlessScene {
    pub fn new() -> Self {
        Self {
            objects: FxHashMap::default(),
            next_handle: 1,
        }
    }

    fn insert(&mut self, kind: SceneObjectKind, geometry: Geometry) -> SceneHandle {
        let handle = SceneHandle(self.next_handle);
        self.next_handle += 1;
        self.objects.insert(handle.0, SceneObject { kind, geometry });
        handle
    }

    /// Returns the object behind `handle`.
    pub fn get(&self, handle: SceneHandle) -> Option<&SceneObject> {
        self.objects.get(&handle.0)
    }

    /// Returns the number of live objects.
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Fires the pick callback of a pick overlay as if `point_index` had been clicked.
    pub fn simulate_pick(&mut self, handle: SceneHandle, point_index: usize) -> Result<()> {
        match self.objects.get_mut(&handle.0).map(|o| &mut o.geometry) {
            Some(Geometry::Points(_, callback)) => {
                callback(point_index);
                Ok(())
            }
            _ => Err(InstviewError::NoOverlay),
        }
    }

    /// Per-cell RGBA a plotter would draw for a mesh object.
    ///
    /// Drawables are colored by their active scalar with the data map; highlights
    /// use their own map and take alpha from the opacity range.
    pub fn cell_colors(&self, handle: SceneHandle) -> Option<Vec<Vec4>> {
        let object = self.get(handle)?;
        let mesh = object.mesh()?;
        let Some(quantity) = mesh.active_scalar_quantity() else {
            let color = mesh.surface_color().extend(1.0 - mesh.transparency());
            return Some(vec![color; mesh.num_faces()]);
        };

        match &object.kind {
            SceneObjectKind::Highlight {
                opacity_range,
                color_map,
                ..
            } => {
                let map = ColorMap::by_name(color_map)?;
                let alphas = quantity.compute_opacities(*opacity_range);
                Some(
                    quantity
                        .compute_colors(&map)
                        .into_iter()
                        .zip(alphas)
                        .map(|(c, a)| c.extend(a))
                        .collect(),
                )
            }
            _ => {
                let map = ColorMap::by_name(quantity.colormap_name())?;
                Some(
                    quantity
                        .compute_colors(&map)
                        .into_iter()
                        .map(|c: Vec3| c.extend(1.0))
                        .collect(),
                )
            }
        }
    }

    /// Handles of all objects of a given kind, in insertion order.
    pub fn handles_where(&self, predicate: impl Fn(&SceneObjectKind) -> bool) -> Vec<SceneHandle> {
        let mut handles: Vec<u64> = self
            .objects
            .iter()
            .filter(|(_, o)| predicate(&o.kind))
            .map(|(&h, _)| h)
            .collect();
        handles.sort_unstable();
        handles.into_iter().map(SceneHandle).collect()
    }
}

impl Scene for HeadlessScene {
    fn add_drawable_mesh(
        &mut self,
        mesh: &SurfaceMesh,
        pickable: bool,
        color_scalars: Option<&str>,
    ) -> SceneHandle {
        let mut copy = mesh.duplicate(mesh.name());
        copy.set_pickable(pickable);
        if let Some(label) = color_scalars {
            if let Some(values) = mesh.face_scalar_quantity(label).map(|q| q.values().to_vec()) {
                if let Err(err) = copy.set_face_scalars(label, values) {
                    log::warn!("dropping scalars '{label}' for '{}': {err}", mesh.name());
                }
            }
        }
        log::debug!(
            "scene: drawable '{}' ({} cells)",
            mesh.name(),
            mesh.num_faces()
        );
        self.insert(
            SceneObjectKind::Drawable {
                pickable,
                color_scalars: color_scalars.map(str::to_string),
            },
            Geometry::Mesh(copy),
        )
    }

    fn add_pickable_overlay(
        &mut self,
        points: &PointCloud,
        callback: PickCallback,
    ) -> SceneHandle {
        let mut copy = PointCloud::new(points.name(), points.points().to_vec());
        copy.set_transform(points.transform());
        copy.set_point_radius(points.point_radius());
        self.insert(
            SceneObjectKind::PickOverlay,
            Geometry::Points(copy, callback),
        )
    }

    fn add_highlight_overlay(
        &mut self,
        mesh: &SurfaceMesh,
        scalar_label: &str,
        opacity_range: (f32, f32),
        color_map: &str,
    ) -> SceneHandle {
        let mut copy = mesh.duplicate(mesh.name());
        if let Some(values) = mesh
            .face_scalar_quantity(scalar_label)
            .map(|q| q.values().to_vec())
        {
            if let Err(err) = copy.set_face_scalars(scalar_label, values) {
                log::warn!("dropping scalars '{scalar_label}' for '{}': {err}", mesh.name());
            }
        }
        self.insert(
            SceneObjectKind::Highlight {
                scalar_label: scalar_label.to_string(),
                opacity_range,
                color_map: color_map.to_string(),
            },
            Geometry::Mesh(copy),
        )
    }

    fn apply_transform(&mut self, handle: SceneHandle, transform: Mat4) {
        match self.objects.get_mut(&handle.0).map(|o| &mut o.geometry) {
            Some(Geometry::Mesh(mesh)) => mesh.set_transform(transform),
            Some(Geometry::Points(points, _)) => points.set_transform(transform),
            None => log::warn!("apply_transform on unknown scene handle {}", handle.0),
        }
    }

    fn update_cell_scalars(&mut self, handle: SceneHandle, label: &str, values: &[f32]) {
        match self.objects.get_mut(&handle.0).map(|o| &mut o.geometry) {
            Some(Geometry::Mesh(mesh)) => {
                if let Err(err) = mesh.set_face_scalars(label, values.to_vec()) {
                    log::warn!("rejecting scalars '{label}' for '{}': {err}", mesh.name());
                }
            }
            Some(Geometry::Points(..)) | None => {
                log::warn!("update_cell_scalars on non-mesh scene handle {}", handle.0);
            }
        }
    }

    fn remove(&mut self, handle: SceneHandle) {
        self.objects.remove(&handle.0);
    }
}
