//! Property tests for assembled meshes over random subsets.

mod common;

use std::sync::Arc;

use instview::*;
use proptest::prelude::*;

/// 24 detectors cycling through three shapes, one of them missing.
fn mixed_instrument() -> InstrumentGeometry {
    let shapes = [
        Some(common::cuboid(Vec3::new(0.2, 0.1, 0.3))),
        Some(common::facet()),
        None,
    ];
    let detectors = (0..24)
        .map(|i| {
            let p = Vec3::new((i % 6) as f32, (i / 6) as f32, 0.5 * (i % 3) as f32);
            let rotation = Quat::from_rotation_y(0.1 * i as f32);
            let spec = match &shapes[i % 3] {
                Some(shape) => DetectorSpec::new(i as i64, p, Arc::clone(shape)),
                None => DetectorSpec::without_shape(i as i64, p),
            };
            spec.with_rotation(rotation)
                .with_scale(Vec3::new(1.0, 2.0, 1.0))
        })
        .collect();
    InstrumentGeometry::new(detectors)
}

fn loaded() -> InstrumentView {
    let mut view = InstrumentView::default();
    view.load(&mixed_instrument());
    view
}

fn subset() -> impl Strategy<Value = Vec<usize>> {
    prop::collection::vec(0usize..24, 0..48)
}

proptest! {
    #[test]
    fn cell_count_matches_shapes(indices in subset(), flatten in any::<bool>()) {
        let view = loaded();
        let table = view.table().unwrap();
        let positions = table.gather_positions(&indices);
        let mesh = view
            .assemble(&AssemblyRequest::new(&indices, &positions).flattened(flatten))
            .unwrap();

        let expected: usize = indices
            .iter()
            .map(|&i| view.cache().get(table.shape_keys()[i]).unwrap().num_triangles())
            .sum();
        prop_assert_eq!(mesh.num_cells(), expected);
        prop_assert_eq!(mesh.faces().len(), mesh.cell_to_detector().len());
        prop_assert_eq!(
            mesh.faces_per_detector().iter().map(|&t| t as usize).sum::<usize>(),
            expected
        );
    }

    #[test]
    fn cells_map_into_subset(indices in subset()) {
        let view = loaded();
        let positions = view.table().unwrap().gather_positions(&indices);
        let mesh = view.assemble(&AssemblyRequest::new(&indices, &positions)).unwrap();

        for &d in mesh.cell_to_detector() {
            prop_assert!((d as usize) < indices.len());
        }
        for (k, &t) in mesh.faces_per_detector().iter().enumerate() {
            let cells = mesh.cell_to_detector().iter().filter(|&&d| d as usize == k).count();
            prop_assert_eq!(cells, t as usize);
        }
    }

    #[test]
    fn faces_index_valid_vertices(indices in subset(), flatten in any::<bool>()) {
        let view = loaded();
        let positions = view.table().unwrap().gather_positions(&indices);
        let mesh = view
            .assemble(&AssemblyRequest::new(&indices, &positions).flattened(flatten))
            .unwrap();
        let n = mesh.vertices().len();
        prop_assert!(mesh.faces().iter().flatten().all(|&i| (i as usize) < n));
    }

    #[test]
    fn flattened_vertices_lie_on_plane(indices in subset(), z in -5.0f32..5.0) {
        let view = loaded();
        let positions: Vec<Vec3> = view
            .table()
            .unwrap()
            .gather_positions(&indices)
            .into_iter()
            .map(|p| Vec3::new(p.x, p.y, z))
            .collect();
        let flags: Vec<bool> = (0..indices.len()).map(|k| k % 2 == 0).collect();
        let mesh = view
            .assemble(
                &AssemblyRequest::new(&indices, &positions)
                    .flattened(true)
                    .with_rotate_flags(&flags),
            )
            .unwrap();
        prop_assert!(mesh.vertices().iter().all(|v| v.z == 0.0));
    }

    #[test]
    fn assembly_is_reproducible(indices in subset(), flatten in any::<bool>()) {
        let view = loaded();
        let positions = view.table().unwrap().gather_positions(&indices);
        let request = AssemblyRequest::new(&indices, &positions).flattened(flatten);
        let a = view.assemble(&request).unwrap();
        let b = view.assemble(&request).unwrap();
        prop_assert_eq!(a.vertex_bytes(), b.vertex_bytes());
        prop_assert_eq!(a.face_bytes(), b.face_bytes());
        prop_assert_eq!(a.cell_to_detector(), b.cell_to_detector());
    }
}

#[test]
fn test_cache_holds_one_template_per_shape() {
    let view = loaded();
    // cuboid, facet and the fallback
    assert_eq!(view.cache().len(), 3);
}

#[test]
fn test_ring_projection_scale() {
    let k = 64;
    let (r, r_flat) = (2.0, 7.0);
    let mut view = InstrumentView::default();
    view.load(&common::ring(k, r, 3.0));
    let table = view.table().unwrap();

    let indices: Vec<usize> = (0..k).collect();
    let projected: Vec<Vec3> = table
        .gather_positions(&indices)
        .into_iter()
        .map(|p| Vec3::new(p.x, p.y, 0.0) * (r_flat / r))
        .collect();
    let scale = ProjectionScaleEstimator::new(table, &view.options().assembly)
        .estimate_scale(&indices, &projected)
        .unwrap();
    assert!((scale - r_flat / r).abs() < 1e-4, "scale = {scale}");
}

#[test]
fn test_group_scales_feed_assembly() {
    let mut view = InstrumentView::default();
    view.load(&common::ring(16, 1.0, 0.0));
    let indices: Vec<usize> = (0..16).collect();
    let projected: Vec<Vec3> = view
        .table()
        .unwrap()
        .gather_positions(&indices)
        .into_iter()
        .map(|p| p * 4.0)
        .collect();
    let groups: Vec<u32> = (0..16).map(|i| i / 8).collect();

    let scales = view.group_scales(&indices, &projected, &groups).unwrap();
    assert_eq!(scales.len(), 16);
    let mesh = view
        .assemble(
            &AssemblyRequest::new(&indices, &projected)
                .flattened(true)
                .with_scale_override(&scales),
        )
        .unwrap();
    assert_eq!(mesh.num_cells(), 16);
}
