//! Operator configuration.

use crate::channel::HAND_FRAME_ATTEMPTS;
use crate::filter::DEFAULT_BLEND_RATIO;
use crate::toggle::PINCH_THRESHOLD;
use crate::{Result, TeleopError};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Slowest accepted control rate.
pub const MIN_FREQUENCY_HZ: f64 = 0.1;

/// Tunables for one arm operator. Missing JSON fields fall back to [`Default`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OperatorConfig {
    /// Control loop rate. Bounded by how fast the arm accepts Cartesian targets.
    pub frequency_hz: f64,
    /// Smooth commanded poses with the complementary filter.
    pub use_filter: bool,
    /// Weight kept from the previous filter estimate, in (0, 1).
    pub filter_blend_ratio: f64,
    /// Fingertip distance (tracker units) that counts as a pinch.
    pub pinch_threshold: f64,
    /// Gripper command for "fully closed".
    pub gripper_close_value: f64,
    /// Actuator translation units per tracker unit (1000: meters to millimeters).
    pub translation_scale: f64,
    /// Non-blocking hand frame reads per tick.
    pub hand_frame_attempts: usize,
}

impl Default for OperatorConfig {
    fn default() -> Self {
        Self {
            frequency_hz: 30.0,
            use_filter: false,
            filter_blend_ratio: DEFAULT_BLEND_RATIO,
            pinch_threshold: PINCH_THRESHOLD,
            gripper_close_value: 800.0,
            translation_scale: 1000.0,
            hand_frame_attempts: HAND_FRAME_ATTEMPTS,
        }
    }
}

impl OperatorConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: OperatorConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Pretty JSON accepted back by [`OperatorConfig::from_json_str`].
    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.frequency_hz.is_finite() && self.frequency_hz >= MIN_FREQUENCY_HZ) {
            return Err(TeleopError::InvalidConfig(format!(
                "frequency_hz must be at least {}, got {}",
                MIN_FREQUENCY_HZ, self.frequency_hz
            )));
        }
        if !(self.filter_blend_ratio > 0.0 && self.filter_blend_ratio < 1.0) {
            return Err(TeleopError::InvalidConfig(format!(
                "filter_blend_ratio must be in (0, 1), got {}",
                self.filter_blend_ratio
            )));
        }
        if !(self.pinch_threshold > 0.0) {
            return Err(TeleopError::InvalidConfig(format!(
                "pinch_threshold must be positive, got {}",
                self.pinch_threshold
            )));
        }
        if !(self.gripper_close_value.is_finite() && self.gripper_close_value >= 0.0) {
            return Err(TeleopError::InvalidConfig(format!(
                "gripper_close_value must be non-negative, got {}",
                self.gripper_close_value
            )));
        }
        if !(self.translation_scale.is_finite() && self.translation_scale > 0.0) {
            return Err(TeleopError::InvalidConfig(format!(
                "translation_scale must be positive, got {}",
                self.translation_scale
            )));
        }
        if self.hand_frame_attempts == 0 {
            return Err(TeleopError::InvalidConfig(
                "hand_frame_attempts must be at least 1".into(),
            ));
        }
        Ok(())
    }
}
