//! # teleop-core - hand-pose to robot-arm retargeting
//!
//! Turns a stream of tracked hand poses into Cartesian commands for a robot
//! arm. Provides:
//! - Rigid-transform math and tracker-to-robot axis remapping
//! - Pinch-gesture toggles for the gripper and pause/resume
//! - A complementary motion filter
//! - A fixed-rate operator loop over in-process topics and an `Actuator` trait
//! - C FFI for the math kernel, toggles and filter
//!
//! ## Quick Start
//! ```no_run
//! use teleop_core::actuator::LoopbackArm;
//! use teleop_core::channel::{topic, DEFAULT_CAPACITY};
//! use teleop_core::engine::{EngineInputs, Telemetry};
//! use teleop_core::{HandFrame, HandKeypoints, Operator, OperatorConfig};
//!
//! let (_frames, frame_rx) = topic::<HandFrame>("transformed_hand_frame", DEFAULT_CAPACITY);
//! let (_coords, coords_rx) = topic::<HandKeypoints>("transformed_hand_coords", DEFAULT_CAPACITY);
//! let (_button, button_rx) = topic::<f64>("button", DEFAULT_CAPACITY);
//!
//! let inputs = EngineInputs {
//!     hand_frame: Box::new(frame_rx),
//!     hand_keypoints: Box::new(coords_rx),
//!     resolution: Box::new(button_rx),
//! };
//! let telemetry = Telemetry {
//!     gripper: Box::new(topic::<f64>("gripper_right", DEFAULT_CAPACITY).0),
//!     cartesian: Box::new(topic::<[f64; 6]>("cartesian", DEFAULT_CAPACITY).0),
//!     joint: Box::new(topic::<Vec<f64>>("joint", DEFAULT_CAPACITY).0),
//!     cartesian_command: Box::new(topic::<[f64; 6]>("cartesian", DEFAULT_CAPACITY).0),
//! };
//!
//! let operator = Operator::new(
//!     OperatorConfig::default(),
//!     Box::new(LoopbackArm::default()),
//!     inputs,
//!     telemetry,
//! )
//! .unwrap();
//! let handle = operator.spawn().unwrap();
//! // ... publish frames, keypoints and button values ...
//! let stats = handle.stop().unwrap();
//! println!("{} ticks", stats.ticks);
//! ```

pub mod error;
pub mod types;
pub mod transform;
pub mod remap;
pub mod toggle;
pub mod filter;
pub mod channel;
pub mod actuator;
pub mod config;
pub mod timer;
pub mod engine;
pub mod operator;
pub mod wire;
pub mod ffi;

pub use error::TeleopError;
pub use types::*;
pub use actuator::Actuator;
pub use config::OperatorConfig;
pub use engine::RetargetingEngine;
pub use operator::{Operator, OperatorHandle};

/// Result type alias for teleop-core operations.
pub type Result<T> = std::result::Result<T, TeleopError>;
