//! Homogeneous rigid transforms.
//!
//! A transform is a 4x4 matrix `[[R, t], [0, 1]]` with `R` orthonormal.
//! Every entry point that consumes a transform re-checks the rotation block
//! and reports [`TeleopError::MalformedGeometry`] instead of computing through
//! corrupted data.

use crate::types::{CartesianPose, HandFrame};
use crate::{Result, TeleopError};
use nalgebra::{Matrix3, Matrix4, Rotation3, UnitQuaternion, Vector3};

/// 4x4 homogeneous transform.
pub type Homogeneous = Matrix4<f64>;

/// Maximum Frobenius deviation of `RᵀR` from identity (and of `det R` from 1).
///
/// Tracker rotations arrive as single-precision floats, so this is far looser
/// than f64 epsilon.
pub const ORTHONORMAL_TOLERANCE: f64 = 1e-3;

pub fn rotation(h: &Homogeneous) -> Matrix3<f64> {
    h.fixed_view::<3, 3>(0, 0).into_owned()
}

pub fn translation(h: &Homogeneous) -> Vector3<f64> {
    h.fixed_view::<3, 1>(0, 3).into_owned()
}

/// Assemble `[[r, t], [0, 1]]`.
pub fn from_parts(r: &Matrix3<f64>, t: &Vector3<f64>) -> Homogeneous {
    let mut h = Matrix4::identity();
    h.fixed_view_mut::<3, 3>(0, 0).copy_from(r);
    h.fixed_view_mut::<3, 1>(0, 3).copy_from(t);
    h
}

/// Check that `r` is a proper rotation.
pub fn ensure_orthonormal(r: &Matrix3<f64>) -> Result<()> {
    if r.iter().any(|v| !v.is_finite()) {
        return Err(TeleopError::MalformedGeometry(
            "rotation block contains non-finite values".into(),
        ));
    }
    let deviation = (r.transpose() * r - Matrix3::identity()).norm();
    let det = r.determinant();
    if deviation > ORTHONORMAL_TOLERANCE || (det - 1.0).abs() > ORTHONORMAL_TOLERANCE {
        return Err(TeleopError::MalformedGeometry(format!(
            "rotation block not orthonormal (|RᵀR - I| = {:.3e}, det = {:.6})",
            deviation, det
        )));
    }
    Ok(())
}

fn ensure_rigid(h: &Homogeneous) -> Result<()> {
    let bottom = h.fixed_view::<1, 4>(3, 0);
    if bottom[0] != 0.0 || bottom[1] != 0.0 || bottom[2] != 0.0 || bottom[3] != 1.0 {
        return Err(TeleopError::MalformedGeometry(format!(
            "bottom row is [{}, {}, {}, {}], expected [0, 0, 0, 1]",
            bottom[0], bottom[1], bottom[2], bottom[3]
        )));
    }
    ensure_orthonormal(&rotation(h))
}

/// Build a transform from a tracker frame.
///
/// The tracker sends rotation rows; the transform stores their transpose.
pub fn to_homogeneous(frame: &HandFrame) -> Result<Homogeneous> {
    let rows = frame.rotation_rows();
    let r = Matrix3::new(
        rows[0][0], rows[0][1], rows[0][2],
        rows[1][0], rows[1][1], rows[1][2],
        rows[2][0], rows[2][1], rows[2][2],
    )
    .transpose();
    ensure_orthonormal(&r)?;
    let t = frame.translation();
    Ok(from_parts(&r, &Vector3::new(t[0], t[1], t[2])))
}

/// `a · b`
pub fn compose(a: &Homogeneous, b: &Homogeneous) -> Homogeneous {
    a * b
}

/// Rigid inverse `[[Rᵀ, -Rᵀt], [0, 1]]`.
pub fn invert(h: &Homogeneous) -> Result<Homogeneous> {
    ensure_rigid(h)?;
    let rt = rotation(h).transpose();
    let t = -(rt * translation(h));
    Ok(from_parts(&rt, &t))
}

/// Decompose into translation and minimal-angle rotation vector.
///
/// Translation is returned in the transform's own units. The rotation goes
/// through a quaternion so that half-turns keep their axis.
pub fn to_cartesian(h: &Homogeneous) -> Result<CartesianPose> {
    ensure_rigid(h)?;
    let rot = Rotation3::from_matrix_unchecked(rotation(h));
    let q = UnitQuaternion::from_rotation_matrix(&rot);
    Ok(CartesianPose::new(translation(h), q.scaled_axis()))
}

/// Build a transform from an actuator pose.
///
/// Translation is divided by `translation_scale` (1000 turns millimeters into meters).
pub fn from_cartesian(pose: &CartesianPose, translation_scale: f64) -> Homogeneous {
    let r = Rotation3::from_scaled_axis(pose.rotation);
    from_parts(r.matrix(), &(pose.translation / translation_scale))
}
