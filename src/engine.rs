//! Retargeting engine: anchor bookkeeping and one control tick.
//!
//! Teleoperation is relative. On every reset the engine captures the arm's
//! current pose and the next hand frame as a pair of anchors; afterwards each
//! hand frame is turned into a delta against the hand anchor, remapped into
//! robot axes, and applied to the robot anchor.
//!
//! All mutable control state (anchors, both toggles, the optional filter,
//! the teleop state and the last gripper command) lives in
//! [`RetargetingEngine`], which is driven by exclusive reference from the
//! control loop.

use crate::actuator::Actuator;
use crate::channel::{poll_bounded, Publisher, Subscriber};
use crate::config::OperatorConfig;
use crate::filter::MotionFilter;
use crate::remap;
use crate::toggle::{GripperDetector, PauseDetector, ToggleOutput};
use crate::transform::{self, Homogeneous};
use crate::types::{
    CartesianPose, HandFrame, HandKeypoints, ResolutionMode, TeleopState, TickFlags,
};
use crate::Result;

/// Hand and robot poses captured at the last reset.
#[derive(Debug, Clone, PartialEq)]
pub struct AnchorState {
    pub hand_init: Homogeneous,
    pub robot_init: Homogeneous,
}

/// Input topics read by the engine each tick.
pub struct EngineInputs {
    /// `transformed_hand_frame`, polled without blocking.
    pub hand_frame: Box<dyn Subscriber<HandFrame>>,
    /// `transformed_hand_coords`, read blocking once per tick.
    pub hand_keypoints: Box<dyn Subscriber<HandKeypoints>>,
    /// `button`, read blocking once per tick.
    pub resolution: Box<dyn Subscriber<f64>>,
}

/// Output topics written on every tick that produced a target.
pub struct Telemetry {
    /// `gripper_right`: last commanded gripper flag.
    pub gripper: Box<dyn Publisher<f64>>,
    /// `cartesian`: live arm pose.
    pub cartesian: Box<dyn Publisher<[f64; 6]>>,
    /// `joint`: live joint angles.
    pub joint: Box<dyn Publisher<Vec<f64>>>,
    /// `cartesian` on the command channel: pose sent (or withheld) this tick.
    pub cartesian_command: Box<dyn Publisher<[f64; 6]>>,
}

pub struct RetargetingEngine {
    config: OperatorConfig,
    anchor: Option<AnchorState>,
    /// Robot pose captured by a reset that is still waiting for a hand frame.
    pending_robot_init: Option<Homogeneous>,
    first_frame: bool,
    state: TeleopState,
    resolution: ResolutionMode,
    gripper: GripperDetector,
    pause: PauseDetector,
    /// Last gripper flag sent to the arm.
    gripper_command: bool,
    filter: Option<MotionFilter>,
}

impl RetargetingEngine {
    pub fn new(config: OperatorConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            gripper: GripperDetector::new(config.pinch_threshold),
            pause: PauseDetector::new(config.pinch_threshold),
            config,
            anchor: None,
            pending_robot_init: None,
            first_frame: true,
            state: TeleopState::Stopped,
            resolution: ResolutionMode::High,
            gripper_command: true,
            filter: None,
        })
    }

    pub fn config(&self) -> &OperatorConfig {
        &self.config
    }

    pub fn state(&self) -> TeleopState {
        self.state
    }

    pub fn anchor(&self) -> Option<&AnchorState> {
        self.anchor.as_ref()
    }

    pub fn resolution(&self) -> ResolutionMode {
        self.resolution
    }

    pub fn is_reset_pending(&self) -> bool {
        self.pending_robot_init.is_some()
    }

    pub fn filter(&self) -> Option<&MotionFilter> {
        self.filter.as_ref()
    }

    /// Capture the arm's current pose and wait for the hand anchor.
    ///
    /// Motion is withheld until [`complete_reset`](Self::complete_reset) runs.
    pub fn begin_reset(&mut self, live: &CartesianPose) -> Result<()> {
        log::info!("Resetting teleop anchors");
        let robot_init = transform::from_cartesian(live, self.config.translation_scale);
        // Validates the arm's reported rotation before it becomes an anchor.
        transform::to_cartesian(&robot_init)?;
        if self.config.use_filter && self.filter.is_none() {
            self.filter = Some(MotionFilter::new(live, self.config.filter_blend_ratio)?);
        }
        self.pending_robot_init = Some(robot_init);
        Ok(())
    }

    /// Pair the pending robot anchor with the first hand frame after a reset.
    /// Returns `false` if no reset was pending.
    pub fn complete_reset(&mut self, frame: &HandFrame) -> Result<bool> {
        let Some(robot_init) = self.pending_robot_init else {
            return Ok(false);
        };
        let hand_init = transform::to_homogeneous(frame)?;
        self.anchor = Some(AnchorState { hand_init, robot_init });
        self.pending_robot_init = None;
        self.first_frame = false;
        log::info!("Reset complete");
        Ok(true)
    }

    /// Robot-frame target (meters) for the given hand frame.
    pub fn target_transform(&self, frame: &HandFrame) -> Result<Option<Homogeneous>> {
        let Some(anchor) = &self.anchor else {
            return Ok(None);
        };
        let hand_moving = transform::to_homogeneous(frame)?;
        remap::retarget(&anchor.hand_init, &hand_moving, &anchor.robot_init).map(Some)
    }

    /// Convert a target to actuator units and scale its displacement from the
    /// arm's live position by the resolution factor. Rotation is passed through.
    pub fn scale_target(&self, target: &Homogeneous, live: &CartesianPose) -> Result<CartesianPose> {
        let unscaled = transform::to_cartesian(target)?;
        let target_translation = unscaled.translation * self.config.translation_scale;
        let delta = target_translation - live.translation;
        Ok(CartesianPose::new(
            live.translation + delta * self.resolution.scale(),
            unscaled.rotation,
        ))
    }

    /// Run the smoothing filter if enabled; pass through otherwise.
    pub fn smooth(&mut self, pose: CartesianPose) -> CartesianPose {
        match self.filter.as_mut() {
            Some(filter) => filter.apply(&pose),
            None => pose,
        }
    }

    /// Update the teleop state from the pause detector, starting a reset on
    /// the first tick or on a STOPPED to ACTIVE transition.
    fn update_state(&mut self, pause: ToggleOutput, actuator: &mut dyn Actuator) -> Result<()> {
        let desired = TeleopState::from_flag(pause.flag);
        let resuming = self.state == TeleopState::Stopped && desired == TeleopState::Active;
        let must_reset = self.first_frame || resuming;
        if must_reset && self.pending_robot_init.is_none() {
            let live = actuator.cartesian_position()?;
            self.begin_reset(&live)?;
        }
        if desired != self.state {
            log::info!("Teleop state {:?} -> {:?}", self.state, desired);
        }
        self.state = desired;
        Ok(())
    }

    /// One control tick.
    ///
    /// Reads keypoints and the resolution button (blocking) and the hand frame
    /// (bounded polling), then issues at most one of gripper or motion command
    /// and publishes telemetry. A tick without a hand frame is skipped, not failed.
    pub fn tick(
        &mut self,
        actuator: &mut dyn Actuator,
        inputs: &EngineInputs,
        telemetry: &Telemetry,
    ) -> Result<TickFlags> {
        let mut flags = TickFlags::empty();

        let keypoints = inputs.hand_keypoints.recv()?;
        let pause = self.pause.update(&keypoints)?;
        self.update_state(pause, actuator)?;

        let frame = poll_bounded(inputs.hand_frame.as_ref(), self.config.hand_frame_attempts)?;
        if let Some(frame) = &frame {
            if self.complete_reset(frame)? {
                flags |= TickFlags::RESET;
            }
        }

        self.resolution = ResolutionMode::from_signal(inputs.resolution.recv()?)?;

        let Some(frame) = frame else {
            if self.is_reset_pending() {
                flags |= TickFlags::RESET_PENDING;
            }
            log::trace!("No hand frame within {} reads", self.config.hand_frame_attempts);
            return Ok(flags | TickFlags::SKIPPED);
        };

        let Some(target) = self.target_transform(&frame)? else {
            return Ok(flags | TickFlags::SKIPPED);
        };
        let live = actuator.cartesian_position()?;
        let scaled = self.scale_target(&target, &live)?;
        let command = self.smooth(scaled);

        // With the arm in sync this fires exactly on a crossed, toggled pinch.
        // After a rejected command it keeps firing until the arm accepts one.
        let gripper = self.gripper.update(&keypoints)?;
        let gripper_pending = gripper.flag != self.gripper_command;
        if gripper_pending {
            let value = self.gripper_value_for(gripper.flag);
            log::debug!("Gripper command {}", value);
            actuator.set_gripper_state(value)?;
            self.gripper_command = gripper.flag;
            flags |= TickFlags::GRIPPER;
        }

        telemetry.gripper.publish(if self.gripper_command { 1.0 } else { 0.0 });
        telemetry.cartesian.publish(actuator.cartesian_position()?.to_array());
        telemetry.joint.publish(actuator.joint_position()?);
        telemetry.cartesian_command.publish(command.to_array());
        flags |= TickFlags::TELEMETRY;

        if self.state == TeleopState::Active && !gripper.crossed && !gripper_pending {
            log::debug!("Arm target {:?}", command.to_array());
            actuator.arm_control(&command)?;
            flags |= TickFlags::MOTION;
        }

        Ok(flags)
    }

    /// Actuator value for the last commanded gripper flag.
    pub fn gripper_value(&self) -> f64 {
        self.gripper_value_for(self.gripper_command)
    }

    fn gripper_value_for(&self, closed: bool) -> f64 {
        if closed {
            self.config.gripper_close_value
        } else {
            0.0
        }
    }
}
