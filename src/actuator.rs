//! Robot arm boundary.
//!
//! The engine drives any arm through [`Actuator`]. Poses are in millimeters
//! and rotation-vector radians.

use crate::types::CartesianPose;
use crate::{Result, TeleopError};

/// Capabilities the teleoperation engine needs from a robot driver.
pub trait Actuator: Send {
    /// Home the arm and clear faults.
    fn reset(&mut self) -> Result<()>;

    fn cartesian_position(&mut self) -> Result<CartesianPose>;

    fn joint_position(&mut self) -> Result<Vec<f64>>;

    /// Command a Cartesian target.
    fn arm_control(&mut self, pose: &CartesianPose) -> Result<()>;

    /// `0` is open; the driver's full-close value closes completely.
    fn set_gripper_state(&mut self, value: f64) -> Result<()>;
}

impl<A: Actuator + ?Sized> Actuator for Box<A> {
    fn reset(&mut self) -> Result<()> {
        (**self).reset()
    }

    fn cartesian_position(&mut self) -> Result<CartesianPose> {
        (**self).cartesian_position()
    }

    fn joint_position(&mut self) -> Result<Vec<f64>> {
        (**self).joint_position()
    }

    fn arm_control(&mut self, pose: &CartesianPose) -> Result<()> {
        (**self).arm_control(pose)
    }

    fn set_gripper_state(&mut self, value: f64) -> Result<()> {
        (**self).set_gripper_state(value)
    }
}

/// Home pose of a Lite6-class arm: 200 mm forward, 200 mm up, tool pointing down.
pub const DEFAULT_HOME: [f64; 6] = [200.0, 0.0, 200.0, 3.1415926, 0.0, 0.0];

/// In-process arm that reaches every commanded pose instantly.
///
/// Used for dry runs without hardware and as the test double for the engine.
#[derive(Debug, Clone)]
pub struct LoopbackArm {
    home: CartesianPose,
    pose: CartesianPose,
    joints: Vec<f64>,
    gripper: f64,
    commands: Vec<CartesianPose>,
    gripper_commands: Vec<f64>,
    fail_next: Option<String>,
}

impl LoopbackArm {
    pub fn new(home: CartesianPose, joint_count: usize) -> Self {
        Self {
            home,
            pose: home,
            joints: vec![0.0; joint_count],
            gripper: 0.0,
            commands: Vec::new(),
            gripper_commands: Vec::new(),
            fail_next: None,
        }
    }

    pub fn pose(&self) -> CartesianPose {
        self.pose
    }

    pub fn gripper(&self) -> f64 {
        self.gripper
    }

    /// Every pose passed to `arm_control`, oldest first.
    pub fn commands(&self) -> &[CartesianPose] {
        &self.commands
    }

    pub fn gripper_commands(&self) -> &[f64] {
        &self.gripper_commands
    }

    /// Make the next motion or gripper command fail with `reason`.
    pub fn fail_next_command(&mut self, reason: &str) {
        self.fail_next = Some(reason.to_string());
    }

    fn check_fault(&mut self) -> Result<()> {
        match self.fail_next.take() {
            Some(reason) => Err(TeleopError::Actuator(reason)),
            None => Ok(()),
        }
    }
}

impl Default for LoopbackArm {
    fn default() -> Self {
        Self::new(CartesianPose::from_array(DEFAULT_HOME), 6)
    }
}

impl Actuator for LoopbackArm {
    fn reset(&mut self) -> Result<()> {
        self.pose = self.home;
        self.fail_next = None;
        Ok(())
    }

    fn cartesian_position(&mut self) -> Result<CartesianPose> {
        Ok(self.pose)
    }

    fn joint_position(&mut self) -> Result<Vec<f64>> {
        Ok(self.joints.clone())
    }

    fn arm_control(&mut self, pose: &CartesianPose) -> Result<()> {
        self.check_fault()?;
        self.pose = *pose;
        self.commands.push(*pose);
        Ok(())
    }

    fn set_gripper_state(&mut self, value: f64) -> Result<()> {
        self.check_fault()?;
        self.gripper = value;
        self.gripper_commands.push(value);
        Ok(())
    }
}
