//! Pinch-driven toggles.
//!
//! A [`ToggleState`] flips its flag on the first tick a distance drops below
//! the threshold and stays put while the pinch is held. Releasing (distance at
//! or above the threshold) re-arms it.

use crate::types::{Finger, HandKeypoints};
use crate::Result;

/// Fingertip distance (tracker units) below which a pinch is registered.
pub const PINCH_THRESHOLD: f64 = 0.03;

/// Result of feeding one distance sample into a [`ToggleState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToggleOutput {
    /// Flag after this sample.
    pub flag: bool,
    /// `flag != previous_flag`.
    pub toggled: bool,
    /// The flag flipped on this very sample.
    pub crossed: bool,
}

#[derive(Debug, Clone)]
pub struct ToggleState {
    flag: bool,
    previous_flag: bool,
    consecutive_below: u32,
}

impl ToggleState {
    pub fn new(initial: bool) -> Self {
        Self {
            flag: initial,
            previous_flag: !initial,
            consecutive_below: 0,
        }
    }

    pub fn flag(&self) -> bool {
        self.flag
    }

    pub fn update(&mut self, distance: f64, threshold: f64) -> ToggleOutput {
        let mut crossed = false;
        if distance < threshold {
            self.consecutive_below = self.consecutive_below.saturating_add(1);
            if self.consecutive_below == 1 {
                self.previous_flag = self.flag;
                self.flag = !self.flag;
                crossed = true;
            }
        } else {
            self.consecutive_below = 0;
        }
        ToggleOutput {
            flag: self.flag,
            toggled: self.flag != self.previous_flag,
            crossed,
        }
    }
}

/// Pinky-to-thumb pinch toggles the gripper.
#[derive(Debug, Clone)]
pub struct GripperDetector {
    state: ToggleState,
    threshold: f64,
}

impl GripperDetector {
    /// Starts closed.
    pub fn new(threshold: f64) -> Self {
        Self {
            state: ToggleState::new(true),
            threshold,
        }
    }

    pub fn update(&mut self, keypoints: &HandKeypoints) -> Result<ToggleOutput> {
        let distance = keypoints.tip_distance(Finger::Pinky, Finger::Thumb)?;
        Ok(self.state.update(distance, self.threshold))
    }
}

/// Ring-to-thumb or middle-to-thumb pinch toggles pause/resume.
///
/// Either finger counts; there is no priority when both pinch at once.
#[derive(Debug, Clone)]
pub struct PauseDetector {
    state: ToggleState,
    threshold: f64,
}

impl PauseDetector {
    /// Starts in "resume".
    pub fn new(threshold: f64) -> Self {
        Self {
            state: ToggleState::new(true),
            threshold,
        }
    }

    pub fn update(&mut self, keypoints: &HandKeypoints) -> Result<ToggleOutput> {
        let ring = keypoints.tip_distance(Finger::Ring, Finger::Thumb)?;
        let middle = keypoints.tip_distance(Finger::Middle, Finger::Thumb)?;
        Ok(self.state.update(ring.min(middle), self.threshold))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::HAND_KEYPOINT_COUNT;

    fn hand_with(finger: Option<Finger>) -> HandKeypoints {
        let mut points = vec![[0.0; 3]; HAND_KEYPOINT_COUNT];
        for f in [Finger::Index, Finger::Middle, Finger::Ring, Finger::Pinky] {
            points[f.tip_index()] = [0.1, 0.0, 0.0];
        }
        if let Some(f) = finger {
            points[f.tip_index()] = [0.01, 0.0, 0.0];
        }
        HandKeypoints(points)
    }

    #[test]
    fn test_edges_fire_once_per_pinch() {
        let mut state = ToggleState::new(false);
        let distances = [0.05, 0.01, 0.01, 0.01, 0.05, 0.01];
        let crossings: Vec<usize> = distances
            .iter()
            .enumerate()
            .filter(|(_, d)| state.update(**d, PINCH_THRESHOLD).crossed)
            .map(|(i, _)| i)
            .collect();
        assert_eq!(crossings, vec![1, 5]);
        assert!(!state.flag());
    }

    #[test]
    fn test_toggled_compares_against_previous_flag() {
        let mut state = ToggleState::new(true);
        let out = state.update(0.05, PINCH_THRESHOLD);
        assert!(out.flag && out.toggled && !out.crossed);

        let out = state.update(0.01, PINCH_THRESHOLD);
        assert!(!out.flag && out.toggled && out.crossed);

        let out = state.update(0.01, PINCH_THRESHOLD);
        assert!(!out.flag && !out.crossed);
    }

    #[test]
    fn test_threshold_is_exclusive() {
        let mut state = ToggleState::new(false);
        assert!(!state.update(PINCH_THRESHOLD, PINCH_THRESHOLD).crossed);
        assert!(state.update(PINCH_THRESHOLD - 1e-9, PINCH_THRESHOLD).crossed);
    }

    #[test]
    fn test_gripper_uses_pinky() {
        let mut gripper = GripperDetector::new(PINCH_THRESHOLD);
        assert!(!gripper.update(&hand_with(Some(Finger::Ring))).unwrap().crossed);
        let out = gripper.update(&hand_with(Some(Finger::Pinky))).unwrap();
        assert!(out.crossed);
        assert!(!out.flag);
    }

    #[test]
    fn test_pause_accepts_ring_or_middle() {
        let mut pause = PauseDetector::new(PINCH_THRESHOLD);
        let out = pause.update(&hand_with(Some(Finger::Middle))).unwrap();
        assert!(out.crossed && !out.flag);

        // Switching from middle to ring without release is still the same pinch.
        assert!(!pause.update(&hand_with(Some(Finger::Ring))).unwrap().crossed);

        pause.update(&hand_with(None)).unwrap();
        let out = pause.update(&hand_with(Some(Finger::Ring))).unwrap();
        assert!(out.crossed && out.flag);
    }

    #[test]
    fn test_pause_ignores_pinky() {
        let mut pause = PauseDetector::new(PINCH_THRESHOLD);
        assert!(!pause.update(&hand_with(Some(Finger::Pinky))).unwrap().crossed);
    }

    #[test]
    fn test_short_keypoint_list_is_an_error() {
        let mut gripper = GripperDetector::new(PINCH_THRESHOLD);
        assert!(gripper.update(&HandKeypoints(vec![[0.0; 3]; 5])).is_err());
    }
}
