//! Drive the loopback arm from a synthetic headset.
//!
//! A headset thread emits raw hand tokens and button presses the way the VR
//! app does: the wrist traces a slow circle, the pinky pinches once to close
//! the gripper, and the resolution button drops to Low halfway through.
//!
//! Usage:
//!   RUST_LOG=info cargo run --example sim_operator [config.json]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use teleop_core::actuator::LoopbackArm;
use teleop_core::channel::{topic, Publisher, Subscriber, DEFAULT_CAPACITY};
use teleop_core::engine::{EngineInputs, Telemetry};
use teleop_core::wire;
use teleop_core::{
    Finger, HandFrame, HandKeypoints, Operator, OperatorConfig, HAND_KEYPOINT_COUNT,
};

const HEADSET_HZ: f64 = 60.0;
const RUN_SECS: u64 = 3;

fn main() {
    env_logger::init();

    let config = match std::env::args().nth(1) {
        Some(path) => OperatorConfig::from_json_file(&path).unwrap_or_else(|e| {
            eprintln!("Failed to load {}: {}", path, e);
            std::process::exit(1);
        }),
        None => OperatorConfig::default(),
    };
    match config.to_json_string() {
        Ok(json) => log::info!("Effective config:\n{}", json),
        Err(e) => log::warn!("Could not render config: {}", e),
    }

    let (frame_tx, frame_rx) = topic::<HandFrame>("transformed_hand_frame", DEFAULT_CAPACITY);
    let (coords_tx, coords_rx) = topic::<HandKeypoints>("transformed_hand_coords", DEFAULT_CAPACITY);
    let (button_tx, button_rx) = topic::<f64>("button", DEFAULT_CAPACITY);
    let (gripper_tx, gripper_rx) = topic::<f64>("gripper_right", DEFAULT_CAPACITY);
    let (command_tx, command_rx) = topic::<[f64; 6]>("cartesian", DEFAULT_CAPACITY);

    let inputs = EngineInputs {
        hand_frame: Box::new(frame_rx),
        hand_keypoints: Box::new(coords_rx),
        resolution: Box::new(button_rx),
    };
    let telemetry = Telemetry {
        gripper: Box::new(gripper_tx),
        cartesian: Box::new(topic::<[f64; 6]>("cartesian", 1).0),
        joint: Box::new(topic::<Vec<f64>>("joint", 1).0),
        cartesian_command: Box::new(command_tx),
    };

    let operator = Operator::new(config, Box::new(LoopbackArm::default()), inputs, telemetry)
        .unwrap_or_else(|e| {
            eprintln!("Failed to start operator: {}", e);
            std::process::exit(1);
        });
    let handle = operator.spawn().expect("Failed to spawn operator");

    let headset_running = Arc::new(AtomicBool::new(true));
    let headset_stop = headset_running.clone();
    let headset = std::thread::Builder::new()
        .name("sim-headset".into())
        .spawn(move || {
            let mut tick = 0u64;
            while headset_stop.load(Ordering::Relaxed) {
                let t = tick as f64 / HEADSET_HZ;
                let pinch = (1.0..1.2).contains(&t);

                match wire::parse_hand_token(hand_token(t, pinch).as_bytes()) {
                    Ok(token) => coords_tx.publish(token.keypoints),
                    Err(e) => log::warn!("Bad hand token: {}", e),
                }
                let circle = [0.05 * t.cos(), 0.05 * t.sin(), 0.0];
                frame_tx.publish(HandFrame::from_translation(circle));

                let button: &[u8] = if t < RUN_SECS as f64 / 2.0 { b"High" } else { b"Low" };
                button_tx.publish(wire::parse_button_token(button).signal());

                tick += 1;
                std::thread::sleep(Duration::from_secs_f64(1.0 / HEADSET_HZ));
            }
        })
        .expect("Failed to spawn headset thread");

    let mut last_command = None;
    let mut gripper = None;
    for _ in 0..RUN_SECS * 10 {
        std::thread::sleep(Duration::from_millis(100));
        while let Ok(Some(pose)) = command_rx.try_recv() {
            last_command = Some(pose);
        }
        while let Ok(Some(value)) = gripper_rx.try_recv() {
            gripper = Some(value);
        }
        if let Some(pose) = last_command {
            println!(
                "cmd: pos=[{:8.2}, {:8.2}, {:8.2}] mm  rot=[{:6.3}, {:6.3}, {:6.3}]  gripper={:?}",
                pose[0], pose[1], pose[2], pose[3], pose[4], pose[5], gripper
            );
        }
    }

    // Stop the operator first so it never blocks on a headset that is gone.
    let stats = handle.stop();
    headset_running.store(false, Ordering::Relaxed);
    let _ = headset.join();

    match stats {
        Ok(stats) => println!(
            "{} ticks, {} skipped, {} failed, {} overruns",
            stats.ticks, stats.skipped, stats.failed, stats.overruns
        ),
        Err(e) => eprintln!("Operator stopped with error: {}", e),
    }
}

/// Raw right-hand token with every fingertip spread apart, or the pinky on
/// the thumb when `pinch` is set.
fn hand_token(t: f64, pinch: bool) -> String {
    let mut points = vec![[0.0, 0.0, 0.0]; HAND_KEYPOINT_COUNT];
    for (i, finger) in [Finger::Index, Finger::Middle, Finger::Ring, Finger::Pinky]
        .into_iter()
        .enumerate()
    {
        points[finger.tip_index()] = [0.08, 0.02 * i as f64, 0.01 * t.sin()];
    }
    if pinch {
        points[Finger::Pinky.tip_index()] = [0.005, 0.0, 0.0];
    }
    let body: Vec<String> = points
        .iter()
        .map(|p| format!("{:.5},{:.5},{:.5}", p[0], p[1], p[2]))
        .collect();
    format!("absolute:{}", body.join("|"))
}
