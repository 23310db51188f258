//! C FFI layer for teleop-core.
//!
//! Exposes the retargeting math, the pinch toggle and the motion filter to
//! C/C++ consumers. Poses cross the boundary as flat `f64` arrays: frames are
//! 12 values (translation row then rotation rows), Cartesian poses are 6
//! (`[x, y, z, rx, ry, rz]`). The generated C header is written to
//! `include/teleop_core.h` by cbindgen.

use crate::error::LastError;
use crate::filter::MotionFilter;
use crate::toggle::{ToggleOutput, ToggleState};
use crate::types::{CartesianPose, HandFrame};
use crate::{remap, transform, Result};
use std::ffi::{c_char, c_int};

/// Last error message for C consumers.
static LAST_ERROR: LastError = LastError::new();

/// Opaque pinch toggle handle for C consumers.
pub struct TcToggle(ToggleState);

/// Opaque motion filter handle for C consumers.
pub struct TcFilter(MotionFilter);

/// Toggle sample result in C-compatible layout.
#[repr(C)]
pub struct TcToggleOutput {
    /// Flag after this sample.
    pub flag: bool,
    /// Flag differs from the one before the last flip.
    pub toggled: bool,
    /// Flag flipped on this sample.
    pub crossed: bool,
}

impl From<ToggleOutput> for TcToggleOutput {
    fn from(o: ToggleOutput) -> Self {
        Self {
            flag: o.flag,
            toggled: o.toggled,
            crossed: o.crossed,
        }
    }
}

unsafe fn read_array<const N: usize>(ptr: *const f64) -> Option<[f64; N]> {
    if ptr.is_null() {
        return None;
    }
    let mut buf = [0.0; N];
    buf.copy_from_slice(std::slice::from_raw_parts(ptr, N));
    Some(buf)
}

unsafe fn write_pose(out: *mut f64, pose: &CartesianPose) {
    let values = pose.to_array();
    std::ptr::copy_nonoverlapping(values.as_ptr(), out, values.len());
}

/// Map a `Result` onto the C status convention, recording the error.
fn status(result: Result<()>) -> c_int {
    match result {
        Ok(()) => 0,
        Err(e) => {
            LAST_ERROR.set(&e);
            -1
        }
    }
}

/// Decompose a tracker frame into a 6-value pose (tracker units, radians).
/// Returns 0 on success, -1 on error.
///
/// # Safety
/// `frame` must point to 12 `f64` values and `out` to space for 6, or be null.
#[no_mangle]
pub unsafe extern "C" fn tc_frame_to_cartesian(frame: *const f64, out: *mut f64) -> c_int {
    let Some(values) = read_array::<12>(frame) else {
        return -1;
    };
    if out.is_null() {
        return -1;
    }
    status((|| -> Result<()> {
        let h = transform::to_homogeneous(&HandFrame::from_slice(&values)?)?;
        write_pose(out, &transform::to_cartesian(&h)?);
        Ok(())
    })())
}

/// Retarget hand motion onto a robot anchor pose.
///
/// `robot_init` and `out` are actuator poses whose translation is divided by
/// `translation_scale` to reach tracker units (1000 for millimeters).
/// Returns 0 on success, -1 on error.
///
/// # Safety
/// `hand_init` and `hand_moving` must point to 12 `f64` values, `robot_init`
/// to 6 and `out` to space for 6, or be null.
#[no_mangle]
pub unsafe extern "C" fn tc_retarget(
    hand_init: *const f64,
    hand_moving: *const f64,
    robot_init: *const f64,
    translation_scale: f64,
    out: *mut f64,
) -> c_int {
    let (Some(init), Some(moving), Some(robot)) = (
        read_array::<12>(hand_init),
        read_array::<12>(hand_moving),
        read_array::<6>(robot_init),
    ) else {
        return -1;
    };
    if out.is_null() {
        return -1;
    }
    status((|| -> Result<()> {
        let init = transform::to_homogeneous(&HandFrame::from_slice(&init)?)?;
        let moving = transform::to_homogeneous(&HandFrame::from_slice(&moving)?)?;
        let robot = transform::from_cartesian(&CartesianPose::from_array(robot), translation_scale);
        let target = transform::to_cartesian(&remap::retarget(&init, &moving, &robot)?)?;
        let pose = CartesianPose::new(target.translation * translation_scale, target.rotation);
        write_pose(out, &pose);
        Ok(())
    })())
}

/// Create a pinch toggle with the given initial flag.
#[no_mangle]
pub extern "C" fn tc_toggle_new(initial: bool) -> *mut TcToggle {
    Box::into_raw(Box::new(TcToggle(ToggleState::new(initial))))
}

/// Feed one fingertip distance. Returns 0 on success, -1 on null pointers.
///
/// # Safety
/// `toggle` must come from `tc_toggle_new` and `out` must be valid, or null.
#[no_mangle]
pub unsafe extern "C" fn tc_toggle_update(
    toggle: *mut TcToggle,
    distance: f64,
    threshold: f64,
    out: *mut TcToggleOutput,
) -> c_int {
    if toggle.is_null() || out.is_null() {
        return -1;
    }
    let toggle = &mut *toggle;
    out.write(toggle.0.update(distance, threshold).into());
    0
}

/// Free a toggle.
///
/// # Safety
/// `toggle` must be a pointer returned by `tc_toggle_new`, or null.
#[no_mangle]
pub unsafe extern "C" fn tc_toggle_free(toggle: *mut TcToggle) {
    if !toggle.is_null() {
        drop(Box::from_raw(toggle));
    }
}

/// Create a motion filter seeded with a 6-value pose.
/// Returns NULL on error (check tc_last_error()).
///
/// # Safety
/// `initial` must point to 6 `f64` values, or be null.
#[no_mangle]
pub unsafe extern "C" fn tc_filter_new(initial: *const f64, blend_ratio: f64) -> *mut TcFilter {
    let Some(values) = read_array::<6>(initial) else {
        return std::ptr::null_mut();
    };
    match MotionFilter::new(&CartesianPose::from_array(values), blend_ratio) {
        Ok(filter) => Box::into_raw(Box::new(TcFilter(filter))),
        Err(e) => {
            LAST_ERROR.set(&e);
            std::ptr::null_mut()
        }
    }
}

/// Fold a 6-value pose into the filter and write the smoothed pose.
/// Returns 0 on success, -1 on null pointers.
///
/// # Safety
/// `filter` must come from `tc_filter_new`, `pose` must point to 6 `f64`
/// values and `out` to space for 6, or be null.
#[no_mangle]
pub unsafe extern "C" fn tc_filter_apply(
    filter: *mut TcFilter,
    pose: *const f64,
    out: *mut f64,
) -> c_int {
    if filter.is_null() || out.is_null() {
        return -1;
    }
    let Some(values) = read_array::<6>(pose) else {
        return -1;
    };
    let filter = &mut *filter;
    let smoothed = filter.0.apply(&CartesianPose::from_array(values));
    write_pose(out, &smoothed);
    0
}

/// Free a filter.
///
/// # Safety
/// `filter` must be a pointer returned by `tc_filter_new`, or null.
#[no_mangle]
pub unsafe extern "C" fn tc_filter_free(filter: *mut TcFilter) {
    if !filter.is_null() {
        drop(Box::from_raw(filter));
    }
}

/// Get the last error message. Returns NULL if no error.
/// The returned pointer is valid until the next failing teleop-core call.
#[no_mangle]
pub extern "C" fn tc_last_error() -> *const c_char {
    LAST_ERROR.as_ptr()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retarget_fixture_through_c_api() {
        let init = HandFrame::from_translation([0.0; 3]).to_flat();
        let moving = HandFrame::from_translation([0.0, 0.0, 10.0]).to_flat();
        let robot = [0.0; 6];
        let mut out = [f64::NAN; 6];
        let rc = unsafe {
            tc_retarget(
                init.as_ptr(),
                moving.as_ptr(),
                robot.as_ptr(),
                1000.0,
                out.as_mut_ptr(),
            )
        };
        assert_eq!(rc, 0);
        let expected = [10000.0, 0.0, 0.0, 0.0, 0.0, 0.0];
        for (a, b) in out.iter().zip(expected.iter()) {
            assert!((a - b).abs() < 1e-6, "{:?}", out);
        }
    }

    #[test]
    fn test_malformed_frame_sets_last_error() {
        let mut frame = HandFrame::from_translation([0.0; 3]).to_flat();
        frame[3] = 2.0;
        let mut out = [0.0; 6];
        let rc = unsafe { tc_frame_to_cartesian(frame.as_ptr(), out.as_mut_ptr()) };
        assert_eq!(rc, -1);
        assert!(!tc_last_error().is_null());
    }

    #[test]
    fn test_null_pointers_rejected() {
        let mut out = [0.0; 6];
        let rc = unsafe { tc_frame_to_cartesian(std::ptr::null(), out.as_mut_ptr()) };
        assert_eq!(rc, -1);
        assert!(unsafe { tc_filter_new(std::ptr::null(), 0.8) }.is_null());
    }

    #[test]
    fn test_toggle_handle() {
        let toggle = tc_toggle_new(true);
        let mut out = TcToggleOutput {
            flag: true,
            toggled: false,
            crossed: false,
        };
        unsafe {
            assert_eq!(tc_toggle_update(toggle, 0.01, 0.03, &mut out), 0);
            assert!(out.crossed && !out.flag);
            assert_eq!(tc_toggle_update(toggle, 0.01, 0.03, &mut out), 0);
            assert!(!out.crossed && !out.flag);
            tc_toggle_free(toggle);
        }
    }

    #[test]
    fn test_filter_handle() {
        let seed = [0.0; 6];
        let target = [10.0, 0.0, 0.0, 0.0, 0.0, 0.0];
        let mut out = [0.0; 6];
        unsafe {
            let filter = tc_filter_new(seed.as_ptr(), 0.8);
            assert!(!filter.is_null());
            assert_eq!(tc_filter_apply(filter, target.as_ptr(), out.as_mut_ptr()), 0);
            tc_filter_free(filter);
        }
        assert!((out[0] - 2.0).abs() < 1e-9);
        assert!(unsafe { tc_filter_new(seed.as_ptr(), 1.5) }.is_null());
    }
}
