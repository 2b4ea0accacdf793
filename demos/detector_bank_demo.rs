//! Builds a small tube-bank instrument, renders it in 3D and unwrapped onto a
//! cylinder, and drives the overlays the way an interactive viewer would.
//!
//! Run with `RUST_LOG=debug` to see precompute and assembly summaries.

use std::sync::Arc;

use instview::*;

const TUBES: usize = 16;
const PIXELS_PER_TUBE: usize = 32;
const RADIUS: f32 = 2.5;

/// A pixel is a thin box; every pixel shares one shape.
fn pixel_shape() -> Arc<ShapeDescriptor> {
    let h = Vec3::new(0.0125, 0.004, 0.0125);
    let corner = |x: f32, y: f32, z: f32| Vec3::new(x * h.x, y * h.y, z * h.z);
    let v = [
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
        .flat_map(|&[a, b, c, d]| [[v[a], v[b], v[c]], [v[a], v[c], v[d]]])
        .collect();
    Arc::new(ShapeDescriptor::new(triangles))
}

fn tube_bank() -> InstrumentGeometry {
    let shape = pixel_shape();
    let mut geometry = InstrumentGeometry::default();
    for tube in 0..TUBES {
        let angle = std::f32::consts::PI * (tube as f32 / TUBES as f32 - 0.5);
        let facing = Quat::from_rotation_y(angle);
        for pixel in 0..PIXELS_PER_TUBE {
            let height = (pixel as f32 - PIXELS_PER_TUBE as f32 / 2.0) * 0.01;
            let position = Vec3::new(RADIUS * angle.sin(), height, RADIUS * angle.cos());
            let id = (1000 * tube + pixel) as DetectorId;
            geometry.push(
                DetectorSpec::new(id, position, Arc::clone(&shape))
                    .with_rotation(facing)
                    .with_shape_id(1),
            );
        }
    }
    // a monitor with broken geometry
    geometry.push(DetectorSpec::without_shape(-1, Vec3::new(0.0, 0.0, -1.0)));
    geometry
}

fn main() -> Result<()> {
    init_logging();

    let geometry = tube_bank();
    let mut view = InstrumentView::default();
    view.load(&geometry);
    log::info!(
        "loaded {} detectors, {} shape templates",
        view.table()?.len(),
        view.cache().len()
    );

    let ids: Vec<DetectorId> = geometry.detectors().iter().map(|d| d.id).collect();
    let mut scene = HeadlessScene::new();
    view.controller_mut()
        .set_pick_callback(|index| log::info!("picked detector {index} of the subset"));

    for projection in [Projection::ThreeD, Projection::Cylindrical(Axis::Y)] {
        let mesh = view.render_subset(&mut scene, &ids, projection, Vec3::ZERO)?;
        log::info!(
            "{projection:?}: {} vertices, {} cells, {} KiB of vertex data",
            mesh.vertices().len(),
            mesh.num_cells(),
            mesh.vertex_bytes().len() / 1024
        );
    }

    view.build_highlight_overlay(&mut scene)?;
    let counts: Vec<f32> = (0..ids.len()).map(|i| (i % 97) as f32).collect();
    view.set_scalars(&mut scene, &counts, "counts")?;

    if let Some(handle) = view.controller().pick_handle() {
        scene.simulate_pick(handle, 42)?;
    }

    view.apply_transform(&mut scene, Mat4::from_scale(Vec3::new(1.0, 4.0, 1.0)));
    log::info!("scene holds {} objects", scene.len());
    Ok(())
}
