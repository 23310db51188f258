//! Teleop telemetry server: simulated operator → WebSocket → browser.
//!
//!   - Runs the operator against the loopback arm with a scripted hand
//!   - Broadcasts the live pose, the commanded pose, joints and gripper as
//!     JSON over WebSocket to all connected clients
//!
//! Usage:
//!   cargo run --example telemetry_server
//!   Connect a WebSocket client to ws://localhost:8765

use serde_json::json;
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use teleop_core::actuator::LoopbackArm;
use teleop_core::channel::{topic, Publisher, Subscriber, TopicSubscriber, DEFAULT_CAPACITY};
use teleop_core::engine::{EngineInputs, Telemetry};
use teleop_core::{HandFrame, HandKeypoints, Operator, OperatorConfig, HAND_KEYPOINT_COUNT};
use tungstenite::Message;

const PORT: u16 = 8765;
const HAND_HZ: f64 = 60.0;

type WsClient = tungstenite::WebSocket<TcpStream>;

struct TelemetryFeed {
    cartesian: TopicSubscriber<[f64; 6]>,
    command: TopicSubscriber<[f64; 6]>,
    joint: TopicSubscriber<Vec<f64>>,
    gripper: TopicSubscriber<f64>,
}

fn main() {
    env_logger::init();

    let (frame_tx, frame_rx) = topic::<HandFrame>("transformed_hand_frame", DEFAULT_CAPACITY);
    let (coords_tx, coords_rx) = topic::<HandKeypoints>("transformed_hand_coords", DEFAULT_CAPACITY);
    let (button_tx, button_rx) = topic::<f64>("button", DEFAULT_CAPACITY);
    let (cartesian_tx, cartesian_rx) = topic("cartesian", DEFAULT_CAPACITY);
    let (command_tx, command_rx) = topic("cartesian", DEFAULT_CAPACITY);
    let (joint_tx, joint_rx) = topic("joint", DEFAULT_CAPACITY);
    let (gripper_tx, gripper_rx) = topic("gripper_right", DEFAULT_CAPACITY);

    let operator = Operator::new(
        OperatorConfig::default(),
        Box::new(LoopbackArm::default()),
        EngineInputs {
            hand_frame: Box::new(frame_rx),
            hand_keypoints: Box::new(coords_rx),
            resolution: Box::new(button_rx),
        },
        Telemetry {
            gripper: Box::new(gripper_tx),
            cartesian: Box::new(cartesian_tx),
            joint: Box::new(joint_tx),
            cartesian_command: Box::new(command_tx),
        },
    )
    .unwrap_or_else(|e| {
        eprintln!("Failed to start operator: {}", e);
        std::process::exit(1);
    });
    let _operator = operator.spawn().expect("Failed to spawn operator");

    // Scripted hand: a slow figure-eight with the fingers spread.
    let running = Arc::new(AtomicBool::new(true));
    let hand_running = running.clone();
    std::thread::Builder::new()
        .name("scripted-hand".into())
        .spawn(move || {
            let mut points = vec![[0.0; 3]; HAND_KEYPOINT_COUNT];
            for tip in points.iter_mut().skip(20) {
                *tip = [0.1, 0.0, 0.0];
            }
            let mut tick = 0u64;
            while hand_running.load(Ordering::Relaxed) {
                let t = tick as f64 / HAND_HZ;
                let pos = [0.05 * t.sin(), 0.03 * (2.0 * t).sin(), 0.0];
                frame_tx.publish(HandFrame::from_translation(pos));
                coords_tx.publish(HandKeypoints(points.clone()));
                button_tx.publish(1.0);
                tick += 1;
                std::thread::sleep(Duration::from_secs_f64(1.0 / HAND_HZ));
            }
        })
        .expect("Failed to spawn hand thread");

    let clients: Arc<Mutex<Vec<WsClient>>> = Arc::new(Mutex::new(Vec::new()));
    let feed = TelemetryFeed {
        cartesian: cartesian_rx,
        command: command_rx,
        joint: joint_rx,
        gripper: gripper_rx,
    };
    let broadcast_clients = clients.clone();
    std::thread::Builder::new()
        .name("telemetry-broadcast".into())
        .spawn(move || broadcast_loop(feed, broadcast_clients))
        .expect("Failed to spawn broadcast thread");

    let listener = TcpListener::bind(format!("0.0.0.0:{}", PORT)).unwrap_or_else(|e| {
        eprintln!("Failed to bind port {}: {}", PORT, e);
        std::process::exit(1);
    });
    eprintln!("[WS] Telemetry on ws://localhost:{}", PORT);

    for stream in listener.incoming() {
        let stream = match stream {
            Ok(s) => s,
            Err(e) => {
                eprintln!("[TCP] accept error: {}", e);
                continue;
            }
        };
        // Write timeout keeps one slow client from stalling the broadcast.
        stream.set_write_timeout(Some(Duration::from_secs(2))).ok();
        stream.set_nodelay(true).ok();
        match tungstenite::accept(stream) {
            Ok(ws) => {
                let mut list = clients.lock().unwrap();
                list.push(ws);
                eprintln!("[WS] Client connected ({} total)", list.len());
            }
            Err(e) => eprintln!("[WS] handshake error: {}", e),
        }
    }

    running.store(false, Ordering::Relaxed);
}

/// Wait for each commanded pose and fan the latest telemetry out to clients.
fn broadcast_loop(feed: TelemetryFeed, clients: Arc<Mutex<Vec<WsClient>>>) {
    let mut joint = Vec::new();
    let mut cartesian = [0.0; 6];
    let mut gripper = 0.0;
    let mut frames = 0u64;

    while let Ok(command) = feed.command.recv() {
        while let Ok(Some(v)) = feed.cartesian.try_recv() {
            cartesian = v;
        }
        while let Ok(Some(v)) = feed.joint.try_recv() {
            joint = v;
        }
        while let Ok(Some(v)) = feed.gripper.try_recv() {
            gripper = v;
        }
        frames += 1;

        let msg = json!({
            "frame": frames,
            "cartesian": cartesian,
            "command": command,
            "joint": joint,
            "gripper": gripper,
        })
        .to_string();

        let mut list = clients.lock().unwrap();
        list.retain_mut(|ws| ws.send(Message::Text(msg.clone())).is_ok());
    }
    eprintln!("[WS] Telemetry channel closed after {} frames", frames);
}
