//! Structure implementations for instview-rs.
//!
//! This crate provides the drawable artifacts handed to a scene:
//! - Surface meshes (assembled detector surfaces and their highlight copies)
//! - Point clouds (one pickable point per detector)
//! - Color maps for scalar quantities

// Graphics code intentionally uses casts for indices, colors, and coordinates
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
// Documentation lints - internal functions don't need exhaustive panic/error docs
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::must_use_candidate)]

pub mod color_maps;
pub mod point_cloud;
pub mod surface_mesh;

pub use color_maps::{ColorMap, COLOR_MAP_NAMES};
pub use point_cloud::PointCloud;
pub use surface_mesh::{MeshFaceScalarQuantity, SurfaceMesh};
