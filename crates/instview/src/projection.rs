//! Flattened view projections.
//!
//! Unwraps detector centres onto a plane around the sample position. Output
//! positions always have a zero third coordinate so they can be passed directly
//! as display positions for a flattened assembly.

use glam::Vec3;

/// Coordinate axis a projection is built around.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    /// Returns `(u, v, w)` with `w` along the axis and `u`, `v` completing a right-handed frame.
    fn frame(self) -> (Vec3, Vec3, Vec3) {
        match self {
            Axis::X => (Vec3::Y, Vec3::Z, Vec3::X),
            Axis::Y => (Vec3::Z, Vec3::X, Vec3::Y),
            Axis::Z => (Vec3::X, Vec3::Y, Vec3::Z),
        }
    }
}

/// How detector positions are mapped to display positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Projection {
    /// True 3D positions.
    #[default]
    ThreeD,
    /// (azimuth, polar angle) around an axis through the sample.
    Spherical(Axis),
    /// (azimuth, height along the axis) around an axis through the sample.
    Cylindrical(Axis),
}

impl Projection {
    /// Returns true for projections that flatten detectors onto a plane.
    pub fn is_flat(self) -> bool {
        !matches!(self, Projection::ThreeD)
    }

    /// Maps world positions to display positions.
    pub fn project(self, positions: &[Vec3], sample_position: Vec3) -> Vec<Vec3> {
        match self {
            Projection::ThreeD => positions.to_vec(),
            Projection::Spherical(axis) => {
                let (u, v, w) = axis.frame();
                positions
                    .iter()
                    .map(|&p| {
                        let r = p - sample_position;
                        let polar = r.normalize_or_zero().dot(w).clamp(-1.0, 1.0).acos();
                        Vec3::new(azimuth(r, u, v), polar, 0.0)
                    })
                    .collect()
            }
            Projection::Cylindrical(axis) => {
                let (u, v, w) = axis.frame();
                positions
                    .iter()
                    .map(|&p| {
                        let r = p - sample_position;
                        Vec3::new(azimuth(r, u, v), r.dot(w), 0.0)
                    })
                    .collect()
            }
        }
    }
}

fn azimuth(r: Vec3, u: Vec3, v: Vec3) -> f32 {
    r.dot(v).atan2(r.dot(u))
}

#[cfg(test)]
mod tests {
    use std::f32::consts::{FRAC_PI_2, PI};

    use super::*;

    #[test]
    fn test_three_d_is_identity() {
        let positions = vec![Vec3::new(1.0, 2.0, 3.0), Vec3::new(-1.0, 0.5, 0.0)];
        assert_eq!(Projection::ThreeD.project(&positions, Vec3::ONE), positions);
        assert!(!Projection::ThreeD.is_flat());
        assert!(Projection::Spherical(Axis::Y).is_flat());
    }

    #[test]
    fn test_spherical_z() {
        let projected = Projection::Spherical(Axis::Z).project(
            &[Vec3::new(0.0, 2.0, 0.0), Vec3::new(0.0, 0.0, 5.0)],
            Vec3::ZERO,
        );
        assert!((projected[0].x - FRAC_PI_2).abs() < 1e-6);
        assert!((projected[0].y - FRAC_PI_2).abs() < 1e-6);
        assert!(projected[1].y.abs() < 1e-6);
        assert!(projected.iter().all(|p| p.z == 0.0));
    }

    #[test]
    fn test_cylindrical_is_relative_to_sample() {
        let sample = Vec3::new(0.0, 0.0, 1.0);
        let projected = Projection::Cylindrical(Axis::Y)
            .project(&[Vec3::new(0.0, 3.0, 0.0)], sample);
        // r = (0, 3, -1); u = Z, v = X for the Y axis
        assert!((projected[0].x - PI).abs() < 1e-6);
        assert_eq!(projected[0].y, 3.0);
        assert_eq!(projected[0].z, 0.0);
    }

    #[test]
    fn test_position_at_sample_stays_finite() {
        let projected = Projection::Spherical(Axis::X).project(&[Vec3::ZERO], Vec3::ZERO);
        assert!(projected[0].is_finite());
    }
}
