//! Core abstractions for instview-rs.
//!
//! This crate provides the per-instrument data everything else is built on:
//! - [`GeometryModel`] trait for the external instrument geometry
//! - [`ShapeTemplateCache`] deduplicating detector shapes
//! - [`DetectorTransformTable`] built once by [`precompute`]
//! - [`DetectorIdMap`] resolving detector IDs to table indices
//! - [`Structure`] / [`Quantity`] traits for drawable output
//! - Configuration options

// Documentation lints - internal functions don't need exhaustive panic/error docs
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_errors_doc)]
// Builder patterns return Self which doesn't need must_use
#![allow(clippy::must_use_candidate)]
// Mesh indices are u32 by construction
#![allow(clippy::cast_possible_truncation)]

pub mod error;
pub mod geometry;
pub mod options;
pub mod pick;
pub mod quantity;
pub mod resolve;
pub mod shape;
pub mod structure;
pub mod table;

pub use error::{ensure_len, InstviewError, Result};
pub use geometry::{
    DetectorId, DetectorShape, DetectorSpec, GeometryModel, InstrumentGeometry, ShapeDescriptor,
};
pub use options::{AssemblyOptions, Options, OverlayOptions};
pub use pick::{PickResult, Pickable};
pub use quantity::Quantity;
pub use resolve::DetectorIdMap;
pub use shape::{ShapeKey, ShapeTemplate, ShapeTemplateCache, FALLBACK_SHAPE_KEY};
pub use structure::{HasQuantities, Structure};
pub use table::{precompute, DetectorTransformTable};

// Re-export glam types for convenience
pub use glam::{Mat3, Mat4, Quat, Vec2, Vec3, Vec4};
