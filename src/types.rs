use crate::{Result, TeleopError};
use nalgebra::Vector3;

/// Hand pose as published on `transformed_hand_frame`.
///
/// Row 0 is the wrist translation, rows 1..=3 are the rows of the hand
/// rotation matrix in tracker axes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HandFrame(pub [[f64; 3]; 4]);

impl HandFrame {
    /// Number of scalars in a flattened frame.
    pub const LEN: usize = 12;

    /// Identity rotation at the given translation.
    pub fn from_translation(t: [f64; 3]) -> Self {
        HandFrame([t, [1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]])
    }

    /// Rebuild a frame from the flat 4x3 payload.
    pub fn from_slice(values: &[f64]) -> Result<Self> {
        if values.len() != Self::LEN {
            return Err(TeleopError::InvalidFrame(values.len()));
        }
        let mut rows = [[0.0; 3]; 4];
        for (row, chunk) in rows.iter_mut().zip(values.chunks_exact(3)) {
            row.copy_from_slice(chunk);
        }
        Ok(HandFrame(rows))
    }

    pub fn translation(&self) -> [f64; 3] {
        self.0[0]
    }

    /// Rotation rows as delivered by the tracker.
    pub fn rotation_rows(&self) -> [[f64; 3]; 3] {
        [self.0[1], self.0[2], self.0[3]]
    }

    pub fn to_flat(&self) -> [f64; 12] {
        let mut out = [0.0; 12];
        for (chunk, row) in out.chunks_exact_mut(3).zip(self.0.iter()) {
            chunk.copy_from_slice(row);
        }
        out
    }
}

/// Cartesian pose at the actuator boundary.
///
/// Translation is in millimeters, rotation is a rotation vector in radians.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CartesianPose {
    pub translation: Vector3<f64>,
    pub rotation: Vector3<f64>,
}

impl CartesianPose {
    pub fn new(translation: Vector3<f64>, rotation: Vector3<f64>) -> Self {
        Self { translation, rotation }
    }

    pub fn zero() -> Self {
        Self::new(Vector3::zeros(), Vector3::zeros())
    }

    pub fn from_array(v: [f64; 6]) -> Self {
        Self::new(
            Vector3::new(v[0], v[1], v[2]),
            Vector3::new(v[3], v[4], v[5]),
        )
    }

    pub fn to_array(&self) -> [f64; 6] {
        [
            self.translation.x,
            self.translation.y,
            self.translation.z,
            self.rotation.x,
            self.rotation.y,
            self.rotation.z,
        ]
    }
}

/// Translation sensitivity selected by the headset button.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionMode {
    /// Full-scale hand displacement (channel value 1).
    High,
    /// Fine motion (channel value 0).
    Low,
}

/// `(channel value, mode, translation scale)`.
const RESOLUTION_TABLE: [(f64, ResolutionMode, f64); 2] = [
    (1.0, ResolutionMode::High, 1.0),
    (0.0, ResolutionMode::Low, 0.6),
];

impl ResolutionMode {
    /// Decode the `button` channel value. Anything but 1 or 0 is rejected.
    pub fn from_signal(value: f64) -> Result<Self> {
        RESOLUTION_TABLE
            .iter()
            .find(|(signal, _, _)| *signal == value)
            .map(|(_, mode, _)| *mode)
            .ok_or(TeleopError::InvalidResolution(value))
    }

    pub fn signal(self) -> f64 {
        self.lookup().0
    }

    /// Factor applied to the translation delta from the live position.
    pub fn scale(self) -> f64 {
        self.lookup().2
    }

    fn lookup(self) -> (f64, ResolutionMode, f64) {
        match self {
            ResolutionMode::High => RESOLUTION_TABLE[0],
            ResolutionMode::Low => RESOLUTION_TABLE[1],
        }
    }
}

/// Whether motion commands are being forwarded to the arm.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TeleopState {
    Stopped,
    Active,
}

impl TeleopState {
    /// Map the pause/resume detector flag onto a state (`true` resumes).
    pub fn from_flag(resume: bool) -> Self {
        if resume {
            TeleopState::Active
        } else {
            TeleopState::Stopped
        }
    }
}

/// Fingers whose tips drive the pinch detectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Finger {
    Thumb,
    Index,
    Middle,
    Ring,
    Pinky,
}

impl Finger {
    /// Keypoint index of the fingertip in the headset joint layout.
    pub fn tip_index(self) -> usize {
        match self {
            Finger::Thumb => 19,
            Finger::Index => 20,
            Finger::Middle => 21,
            Finger::Ring => 22,
            Finger::Pinky => 23,
        }
    }
}

/// Number of keypoints published per hand.
pub const HAND_KEYPOINT_COUNT: usize = 24;

/// Hand joint coordinates as published on `transformed_hand_coords`.
#[derive(Debug, Clone, PartialEq)]
pub struct HandKeypoints(pub Vec<[f64; 3]>);

impl HandKeypoints {
    pub fn tip(&self, finger: Finger) -> Result<Vector3<f64>> {
        let index = finger.tip_index();
        self.0
            .get(index)
            .map(|p| Vector3::new(p[0], p[1], p[2]))
            .ok_or(TeleopError::InvalidKeypoints {
                index,
                len: self.0.len(),
            })
    }

    /// Euclidean distance between two fingertips.
    pub fn tip_distance(&self, a: Finger, b: Finger) -> Result<f64> {
        Ok((self.tip(a)? - self.tip(b)?).norm())
    }
}

bitflags::bitflags! {
    /// What a single engine tick did.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct TickFlags: u32 {
        /// Anchor frames were captured this tick.
        const RESET         = 1 << 0;
        /// A reset is waiting for the first hand frame.
        const RESET_PENDING = 1 << 1;
        /// `arm_control` was issued.
        const MOTION        = 1 << 2;
        /// `set_gripper_state` was issued.
        const GRIPPER       = 1 << 3;
        /// Telemetry was published.
        const TELEMETRY     = 1 << 4;
        /// No hand frame arrived within the poll budget.
        const SKIPPED       = 1 << 5;
    }
}

/// Counters accumulated by the control loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopStats {
    pub ticks: u64,
    pub skipped: u64,
    pub failed: u64,
    pub overruns: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hand_frame_from_slice() {
        let flat = [1.0, 2.0, 3.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0];
        let frame = HandFrame::from_slice(&flat).unwrap();
        assert_eq!(frame.translation(), [1.0, 2.0, 3.0]);
        assert_eq!(frame.rotation_rows()[2], [0.0, 0.0, 1.0]);
        assert_eq!(frame.to_flat(), flat);
    }

    #[test]
    fn test_hand_frame_wrong_length() {
        let err = HandFrame::from_slice(&[0.0; 9]).unwrap_err();
        assert!(matches!(err, TeleopError::InvalidFrame(9)));
    }

    #[test]
    fn test_resolution_lookup() {
        assert_eq!(ResolutionMode::from_signal(1.0).unwrap(), ResolutionMode::High);
        assert_eq!(ResolutionMode::from_signal(0.0).unwrap(), ResolutionMode::Low);
        assert_eq!(ResolutionMode::High.scale(), 1.0);
        assert_eq!(ResolutionMode::Low.scale(), 0.6);
        assert_eq!(ResolutionMode::Low.signal(), 0.0);
    }

    #[test]
    fn test_resolution_rejects_unknown() {
        assert!(matches!(
            ResolutionMode::from_signal(0.5),
            Err(TeleopError::InvalidResolution(_))
        ));
        assert!(ResolutionMode::from_signal(2.0).is_err());
    }

    #[test]
    fn test_tip_distance() {
        let mut points = vec![[0.0; 3]; HAND_KEYPOINT_COUNT];
        points[Finger::Pinky.tip_index()] = [0.03, 0.04, 0.0];
        let kp = HandKeypoints(points);
        let d = kp.tip_distance(Finger::Pinky, Finger::Thumb).unwrap();
        assert!((d - 0.05).abs() < 1e-12);
    }

    #[test]
    fn test_tip_out_of_range() {
        let kp = HandKeypoints(vec![[0.0; 3]; 20]);
        let err = kp.tip(Finger::Index).unwrap_err();
        assert!(matches!(err, TeleopError::InvalidKeypoints { index: 20, len: 20 }));
    }

    #[test]
    fn test_cartesian_array_roundtrip() {
        let pose = CartesianPose::from_array([200.0, 0.0, 200.0, 3.14, 0.0, 0.0]);
        assert_eq!(pose.to_array(), [200.0, 0.0, 200.0, 3.14, 0.0, 0.0]);
    }
}
