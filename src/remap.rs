//! Tracker-to-robot basis change and the retargeting kernel.
//!
//! The headset reports poses in a different axis convention than the arm.
//! Rotations and translations are remapped by two separate fixed permutation
//! matrices, conjugating the hand's relative motion into robot axes.

use crate::transform::{self, Homogeneous};
use crate::Result;
use nalgebra::Matrix4;

/// Rotation-axis remap `Rv`.
#[rustfmt::skip]
pub fn rotation_remap() -> Homogeneous {
    Matrix4::new(
        0.0, -1.0,  0.0, 0.0,
        0.0,  0.0, -1.0, 0.0,
        1.0,  0.0,  0.0, 0.0,
        0.0,  0.0,  0.0, 1.0,
    )
}

/// Translation-axis remap `Tv`.
#[rustfmt::skip]
pub fn translation_remap() -> Homogeneous {
    Matrix4::new(
        0.0, 1.0, 0.0, 0.0,
        0.0, 0.0, 1.0, 0.0,
        1.0, 0.0, 0.0, 0.0,
        0.0, 0.0, 0.0, 1.0,
    )
}

/// Express a hand-relative delta in robot axes.
///
/// Rotation block is `Rv⁻¹ · Δ · Rv`, translation is the translation column
/// of `Tv⁻¹ · Δ · Tv`.
pub fn remap_delta(delta: &Homogeneous) -> Result<Homogeneous> {
    let rv = rotation_remap();
    let tv = translation_remap();
    let rotated = transform::invert(&rv)? * delta * rv;
    let translated = transform::invert(&tv)? * delta * tv;
    Ok(transform::from_parts(
        &transform::rotation(&rotated),
        &transform::translation(&translated),
    ))
}

/// Map the hand's motion since the anchor onto the robot's anchor pose.
///
/// `delta = hand_init⁻¹ · hand_moving`, remapped, then applied to `robot_init`:
/// rotation composes on the right, translation adds.
pub fn retarget(
    hand_init: &Homogeneous,
    hand_moving: &Homogeneous,
    robot_init: &Homogeneous,
) -> Result<Homogeneous> {
    let delta = transform::compose(&transform::invert(hand_init)?, hand_moving);
    let remapped = remap_delta(&delta)?;
    let r = transform::rotation(robot_init) * transform::rotation(&remapped);
    let t = transform::translation(robot_init) + transform::translation(&remapped);
    Ok(transform::from_parts(&r, &t))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CartesianPose, HandFrame};
    use nalgebra::{Matrix3, Rotation3, Vector3};
    use std::f64::consts::FRAC_PI_2;

    const EPS: f64 = 1e-9;

    #[test]
    fn test_remap_matrices_are_rigid() {
        assert!(transform::invert(&rotation_remap()).is_ok());
        assert!(transform::invert(&translation_remap()).is_ok());
    }

    #[test]
    fn test_rotation_about_tracker_x() {
        // +90° about tracker x becomes -90° about robot y.
        let rx = Rotation3::from_axis_angle(&Vector3::x_axis(), FRAC_PI_2);
        let delta = transform::from_parts(rx.matrix(), &Vector3::zeros());
        let remapped = remap_delta(&delta).unwrap();
        #[rustfmt::skip]
        let expected = Matrix3::new(
            0.0, 0.0, -1.0,
            0.0, 1.0,  0.0,
            1.0, 0.0,  0.0,
        );
        assert!((transform::rotation(&remapped) - expected).norm() < EPS);
        let pose = transform::to_cartesian(&remapped).unwrap();
        assert!((pose.rotation - Vector3::new(0.0, -FRAC_PI_2, 0.0)).norm() < EPS);
    }

    #[test]
    fn test_translation_permutation() {
        let delta = transform::from_parts(&Matrix3::identity(), &Vector3::new(1.0, 2.0, 3.0));
        let remapped = remap_delta(&delta).unwrap();
        assert!((transform::translation(&remapped) - Vector3::new(3.0, 1.0, 2.0)).norm() < EPS);
    }

    #[test]
    fn test_translation_ignores_delta_rotation() {
        let rz = Rotation3::from_axis_angle(&Vector3::z_axis(), 0.7);
        let delta = transform::from_parts(rz.matrix(), &Vector3::new(0.0, 0.0, 10.0));
        let remapped = remap_delta(&delta).unwrap();
        assert!((transform::translation(&remapped) - Vector3::new(10.0, 0.0, 0.0)).norm() < EPS);
    }

    #[test]
    fn test_no_hand_motion_returns_robot_anchor() {
        let hand = transform::to_homogeneous(&HandFrame([
            [0.3, -0.1, 0.2],
            [0.0, 0.0, 1.0],
            [0.0, 1.0, 0.0],
            [-1.0, 0.0, 0.0],
        ]))
        .unwrap();
        let robot = transform::from_cartesian(
            &CartesianPose::from_array([200.0, 0.0, 200.0, 3.1415926, 0.0, 0.0]),
            1000.0,
        );
        let target = retarget(&hand, &hand, &robot).unwrap();
        assert!((target - robot).norm() < EPS);
    }

    #[test]
    fn test_relative_motion_is_anchor_independent() {
        // The same hand displacement from two different anchors yields the same robot delta.
        let step = Vector3::new(0.0, 0.05, 0.0);
        let robot = transform::from_parts(&Matrix3::identity(), &Vector3::new(0.2, 0.0, 0.2));
        let mut results = Vec::new();
        for origin in [Vector3::zeros(), Vector3::new(1.0, -2.0, 0.5)] {
            let init = transform::from_parts(&Matrix3::identity(), &origin);
            let moving = transform::from_parts(&Matrix3::identity(), &(origin + step));
            results.push(retarget(&init, &moving, &robot).unwrap());
        }
        assert!((results[0] - results[1]).norm() < EPS);
        let t = transform::translation(&results[0]);
        assert!((t - Vector3::new(0.2, 0.0, 0.25)).norm() < EPS);
    }

    #[test]
    fn test_malformed_hand_anchor_is_reported() {
        let bad = transform::from_parts(&(Matrix3::identity() * 0.5), &Vector3::zeros());
        let good = Matrix4::identity();
        assert!(retarget(&bad, &good, &good).is_err());
    }
}
