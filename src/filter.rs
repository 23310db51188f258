//! Complementary smoothing filter for commanded poses.
//!
//! Translation is blended linearly; orientation is slerped so that averaging
//! rotation vectors never produces an off-manifold rotation.

use crate::types::CartesianPose;
use crate::{Result, TeleopError};
use nalgebra::{UnitQuaternion, Vector3};

/// Blend ratio used when none is configured.
pub const DEFAULT_BLEND_RATIO: f64 = 0.8;

/// Quaternion angle below which slerp falls back to the target orientation.
const SLERP_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone)]
pub struct MotionFilter {
    position: Vector3<f64>,
    orientation: UnitQuaternion<f64>,
    blend_ratio: f64,
}

impl MotionFilter {
    /// Seed the filter with a real pose. `blend_ratio` is the weight kept from
    /// the previous estimate and must lie strictly between 0 and 1.
    pub fn new(initial: &CartesianPose, blend_ratio: f64) -> Result<Self> {
        if !(blend_ratio > 0.0 && blend_ratio < 1.0) {
            return Err(TeleopError::InvalidConfig(format!(
                "filter blend ratio must be in (0, 1), got {}",
                blend_ratio
            )));
        }
        Ok(Self {
            position: initial.translation,
            orientation: UnitQuaternion::from_scaled_axis(initial.rotation),
            blend_ratio,
        })
    }

    pub fn blend_ratio(&self) -> f64 {
        self.blend_ratio
    }

    /// Current estimate.
    pub fn estimate(&self) -> CartesianPose {
        CartesianPose::new(self.position, self.orientation.scaled_axis())
    }

    /// Fold in the next pose and return the smoothed one.
    pub fn apply(&mut self, next: &CartesianPose) -> CartesianPose {
        let k = self.blend_ratio;
        self.position = self.position * k + next.translation * (1.0 - k);

        let target = UnitQuaternion::from_scaled_axis(next.rotation);
        self.orientation = self
            .orientation
            .try_slerp(&target, 1.0 - k, SLERP_EPSILON)
            .unwrap_or(target);
        self.estimate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_out_of_range_ratio() {
        let pose = CartesianPose::zero();
        assert!(MotionFilter::new(&pose, 0.0).is_err());
        assert!(MotionFilter::new(&pose, 1.0).is_err());
        assert!(MotionFilter::new(&pose, f64::NAN).is_err());
        assert!(MotionFilter::new(&pose, 0.6).is_ok());
    }

    #[test]
    fn test_single_step_blend() {
        let mut filter = MotionFilter::new(&CartesianPose::zero(), 0.8).unwrap();
        let out = filter.apply(&CartesianPose::from_array([100.0, -50.0, 10.0, 0.0, 0.0, 1.0]));
        assert!((out.translation - Vector3::new(20.0, -10.0, 2.0)).norm() < 1e-9);
        // Slerp along a single axis scales the angle linearly.
        assert!((out.rotation - Vector3::new(0.0, 0.0, 0.2)).norm() < 1e-9);
    }

    #[test]
    fn test_converges_to_constant_pose() {
        let k = 0.8;
        let target = CartesianPose::from_array([250.0, 30.0, 180.0, 0.4, -1.2, 0.9]);
        let mut filter = MotionFilter::new(&CartesianPose::zero(), k).unwrap();

        // Error shrinks by k per tick; 20 / (1 - k) ticks leaves k^100 of it.
        let ticks = (20.0 / (1.0 - k)).round() as usize;
        let mut out = CartesianPose::zero();
        for _ in 0..ticks {
            out = filter.apply(&target);
        }
        assert!((out.translation - target.translation).norm() < 1e-3);
        assert!((out.rotation - target.rotation).norm() < 1e-4);
    }

    #[test]
    fn test_orientation_stays_on_manifold() {
        let start = CartesianPose::from_array([0.0, 0.0, 0.0, 3.0, 0.0, 0.0]);
        let mut filter = MotionFilter::new(&start, 0.6).unwrap();
        let out = filter.apply(&CartesianPose::from_array([0.0, 0.0, 0.0, -3.0, 0.0, 0.0]));
        // 3 rad and -3 rad about x are 0.28 rad apart through π, not 6 rad through zero.
        assert!(out.rotation.norm() > 2.9);
    }

    #[test]
    fn test_estimate_matches_seed() {
        let seed = CartesianPose::from_array([200.0, 0.0, 200.0, 0.5, 0.0, 0.0]);
        let filter = MotionFilter::new(&seed, DEFAULT_BLEND_RATIO).unwrap();
        let est = filter.estimate();
        assert!((est.translation - seed.translation).norm() < 1e-12);
        assert!((est.rotation - seed.rotation).norm() < 1e-12);
    }
}
