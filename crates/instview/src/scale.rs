//! Projection scale estimation for flattened views.
//!
//! True-to-size shapes are either invisible or overlapping once detector
//! centres are projected into 2D. The estimator compares the typical spacing of
//! detectors before and after projection and returns the ratio, so flattened
//! shapes keep roughly the same size relative to their neighbours.

use glam::Vec3;
use instview_core::error::{ensure_len, Result};
use instview_core::options::AssemblyOptions;
use instview_core::table::DetectorTransformTable;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rstar::{Point, RTree};
use rustc_hash::FxHashMap;

/// Estimates how much to scale shapes in a flattened projection.
pub struct ProjectionScaleEstimator<'a> {
    table: &'a DetectorTransformTable,
    sample_cap: usize,
    sample_seed: u64,
    zero_distance_epsilon: f32,
}

impl<'a> ProjectionScaleEstimator<'a> {
    /// Creates an estimator reading 3D positions from `table`.
    pub fn new(table: &'a DetectorTransformTable, options: &AssemblyOptions) -> Self {
        Self {
            table,
            sample_cap: options.scale_sample_cap.max(2),
            sample_seed: options.sample_seed,
            zero_distance_epsilon: options.zero_distance_epsilon,
        }
    }

    /// Returns `median_nn_distance_2d / median_nn_distance_3d` over a sample of the detectors.
    ///
    /// Returns `1.0` for fewer than two detectors, a zero 3D spacing, or a
    /// non-finite ratio.
    pub fn estimate_scale(
        &self,
        detector_indices: &[usize],
        projected_positions: &[Vec3],
    ) -> Result<f32> {
        ensure_len(detector_indices.len(), projected_positions.len())?;

        let sample = self.sample(detector_indices.len());
        let world: Vec<[f32; 3]> = sample
            .iter()
            .map(|&k| self.table.positions()[detector_indices[k]].to_array())
            .collect();
        let flat: Vec<[f32; 2]> = sample
            .iter()
            .map(|&k| projected_positions[k].truncate().to_array())
            .collect();

        let Some(spacing_3d) = median_nearest_neighbour_distance(world) else {
            return Ok(1.0);
        };
        if spacing_3d <= self.zero_distance_epsilon {
            log::debug!("zero detector spacing in 3D, using identity projection scale");
            return Ok(1.0);
        }
        let Some(spacing_2d) = median_nearest_neighbour_distance(flat) else {
            return Ok(1.0);
        };

        let scale = spacing_2d / spacing_3d;
        Ok(if scale.is_finite() { scale } else { 1.0 })
    }

    /// Runs the estimator separately for each group and returns one scale per detector.
    ///
    /// `group_of[k]` labels the group of the k-th requested detector. The result
    /// can be passed as a per-detector scale override when assembling.
    pub fn estimate_group_scales(
        &self,
        detector_indices: &[usize],
        projected_positions: &[Vec3],
        group_of: &[u32],
    ) -> Result<Vec<f32>> {
        ensure_len(detector_indices.len(), projected_positions.len())?;
        ensure_len(detector_indices.len(), group_of.len())?;

        let mut members: FxHashMap<u32, Vec<usize>> = FxHashMap::default();
        for (k, &group) in group_of.iter().enumerate() {
            members.entry(group).or_default().push(k);
        }

        let mut scales = vec![1.0; detector_indices.len()];
        for positions_in_group in members.values() {
            let indices: Vec<usize> = positions_in_group
                .iter()
                .map(|&k| detector_indices[k])
                .collect();
            let projected: Vec<Vec3> = positions_in_group
                .iter()
                .map(|&k| projected_positions[k])
                .collect();
            let scale = self.estimate_scale(&indices, &projected)?;
            for &k in positions_in_group {
                scales[k] = scale;
            }
        }
        Ok(scales)
    }

    /// Picks at most `sample_cap` of `n` positions, sorted, reproducibly.
    fn sample(&self, n: usize) -> Vec<usize> {
        if n <= self.sample_cap {
            return (0..n).collect();
        }
        let mut rng = StdRng::seed_from_u64(self.sample_seed);
        let mut picked = rand::seq::index::sample(&mut rng, n, self.sample_cap).into_vec();
        picked.sort_unstable();
        picked
    }
}

/// Median distance from each point to its nearest other point.
///
/// Returns `None` for fewer than two points.
pub fn median_nearest_neighbour_distance<P>(points: Vec<P>) -> Option<f32>
where
    P: Point<Scalar = f32>,
{
    if points.len() < 2 {
        return None;
    }

    let tree = RTree::bulk_load(points);
    let mut distances: Vec<f32> = tree
        .iter()
        .filter_map(|p| {
            // The first hit is the query point itself.
            tree.nearest_neighbor_iter_with_distance_2(p)
                .nth(1)
                .map(|(_, d2)| d2.sqrt())
        })
        .collect();

    median(&mut distances)
}

/// Median with the mean of the two middle values for even lengths.
fn median(values: &mut [f32]) -> Option<f32> {
    if values.is_empty() {
        return None;
    }
    values.sort_unstable_by(f32::total_cmp);
    let mid = values.len() / 2;
    Some(if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) * 0.5
    } else {
        values[mid]
    })
}
