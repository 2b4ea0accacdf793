//! instview-rs: batched detector mesh assembly and picking for instrument viewers.
//!
//! An instrument is a few to a few hundred thousand detectors, each a small
//! shape placed by a position, rotation and scale. instview turns any subset of
//! them into one merged surface mesh per frame, plus the overlays a viewer needs
//! for picking and highlighting.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use instview::*;
//!
//! fn main() -> Result<()> {
//!     init_logging();
//!
//!     let facet = Arc::new(ShapeDescriptor::from_flat(&[
//!         0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0,
//!     ])?);
//!     let geometry = InstrumentGeometry::new(vec![
//!         DetectorSpec::new(1, Vec3::new(0.0, 0.0, 1.0), Arc::clone(&facet)),
//!         DetectorSpec::new(2, Vec3::new(1.0, 0.0, 1.0), facet),
//!     ]);
//!
//!     let mut view = InstrumentView::default();
//!     view.load(&geometry);
//!
//!     let mut scene = HeadlessScene::new();
//!     view.render_subset(&mut scene, &[1, 2], Projection::Cylindrical(Axis::Y), Vec3::ZERO)?;
//!     view.build_highlight_overlay(&mut scene)?;
//!     view.set_scalars(&mut scene, &[10.0, 3.0], "counts")?;
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! - Per instrument load: [`precompute`] builds a [`DetectorTransformTable`]
//!   and fills a [`ShapeTemplateCache`] with one template per distinct shape.
//! - Per frame: [`BatchedMeshAssembler`] merges the requested subset into an
//!   [`AssembledMesh`], using [`ProjectionScaleEstimator`] for flattened views.
//! - [`PickingAndHighlightController`] derives the pick and highlight overlays
//!   from the mesh and pushes them to a [`Scene`].
//! - [`InstrumentView`] ties these together for one loaded instrument.

// Mesh indices and detector counts are u32 by construction
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_sign_loss)]
// Documentation lints - internal functions don't need exhaustive panic/error docs
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::must_use_candidate)]

pub mod assembler;
pub mod controller;
pub mod projection;
pub mod scale;
pub mod scene;
pub mod view;

// Re-export core types
pub use instview_core::{
    error::{InstviewError, Result},
    geometry::{
        DetectorId, DetectorShape, DetectorSpec, GeometryModel, InstrumentGeometry,
        ShapeDescriptor,
    },
    options::{AssemblyOptions, Options, OverlayOptions},
    pick::{PickResult, Pickable},
    quantity::Quantity,
    resolve::DetectorIdMap,
    shape::{ShapeKey, ShapeTemplate, ShapeTemplateCache, FALLBACK_SHAPE_KEY},
    structure::{HasQuantities, Structure},
    table::{precompute, DetectorTransformTable},
    Mat3, Mat4, Quat, Vec2, Vec3, Vec4,
};

// Re-export structures
pub use instview_structures::{
    ColorMap, MeshFaceScalarQuantity, PointCloud, SurfaceMesh,
};

pub use assembler::{AssembledMesh, AssemblyRequest, BatchedMeshAssembler};
pub use controller::{DetectorPickCallback, OverlayState, PickingAndHighlightController};
pub use projection::{Axis, Projection};
pub use scale::ProjectionScaleEstimator;
pub use scene::{HeadlessScene, PickCallback, Scene, SceneHandle, SceneObjectKind};
pub use view::InstrumentView;

/// Installs `env_logger` as the `log` backend. Safe to call more than once.
pub fn init_logging() {
    let _ = env_logger::try_init();
}
