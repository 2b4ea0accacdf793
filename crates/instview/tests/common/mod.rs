//! Shared instrument builders for integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use instview::{DetectorSpec, InstrumentGeometry, ShapeDescriptor, Vec3};

/// Axis-aligned box centred on the origin as a 12-triangle soup.
pub fn cuboid(size: Vec3) -> Arc<ShapeDescriptor> {
    let h = size * 0.5;
    let corner = |x: f32, y: f32, z: f32| Vec3::new(x * h.x, y * h.y, z * h.z);
    let corners = [
        corner(-1.0, -1.0, -1.0),
        corner(1.0, -1.0, -1.0),
        corner(1.0, 1.0, -1.0),
        corner(-1.0, 1.0, -1.0),
        corner(-1.0, -1.0, 1.0),
        corner(1.0, -1.0, 1.0),
        corner(1.0, 1.0, 1.0),
        corner(-1.0, 1.0, 1.0),
    ];
    let quads = [
        [0, 3, 2, 1],
        [4, 5, 6, 7],
        [0, 1, 5, 4],
        [2, 3, 7, 6],
        [1, 2, 6, 5],
        [0, 4, 7, 3],
    ];
    let triangles = quads
        .iter()
        .flat_map(|&[a, b, c, d]| {
            [
                [corners[a], corners[b], corners[c]],
                [corners[a], corners[c], corners[d]],
            ]
        })
        .collect();
    Arc::new(ShapeDescriptor::new(triangles))
}

/// Single triangle in the local XY plane.
pub fn facet() -> Arc<ShapeDescriptor> {
    Arc::new(ShapeDescriptor::new(vec![[Vec3::ZERO, Vec3::X, Vec3::Y]]))
}

/// Two detectors sharing one cuboid at `(0,0,0)` and `(1,0,0)`.
pub fn two_cuboids() -> InstrumentGeometry {
    let shape = cuboid(Vec3::splat(0.5));
    InstrumentGeometry::new(vec![
        DetectorSpec::new(100, Vec3::ZERO, Arc::clone(&shape)),
        DetectorSpec::new(101, Vec3::X, shape),
    ])
}

/// `k` detectors evenly spaced on a circle of `radius` in the plane `z`.
pub fn ring(k: usize, radius: f32, z: f32) -> InstrumentGeometry {
    let shape = facet();
    let detectors = (0..k)
        .map(|i| {
            let a = std::f32::consts::TAU * i as f32 / k as f32;
            let p = Vec3::new(radius * a.cos(), radius * a.sin(), z);
            DetectorSpec::new(i as i64, p, Arc::clone(&shape))
        })
        .collect();
    InstrumentGeometry::new(detectors)
}
