use crate::actuator::Actuator;
use crate::config::OperatorConfig;
use crate::engine::{EngineInputs, RetargetingEngine, Telemetry};
use crate::timer::FrequencyTimer;
use crate::types::{LoopStats, TickFlags};
use crate::{Result, TeleopError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Fixed-rate control loop around a [`RetargetingEngine`].
///
/// Owns the actuator, the input subscribers and the telemetry publishers.
/// Dropping the operator releases all of them.
pub struct Operator {
    engine: RetargetingEngine,
    actuator: Box<dyn Actuator>,
    inputs: EngineInputs,
    telemetry: Telemetry,
    timer: FrequencyTimer,
    stats: LoopStats,
}

impl Operator {
    /// Reset the arm and build an operator paced at `config.frequency_hz`.
    pub fn new(
        config: OperatorConfig,
        mut actuator: Box<dyn Actuator>,
        inputs: EngineInputs,
        telemetry: Telemetry,
    ) -> Result<Self> {
        let engine = RetargetingEngine::new(config)?;
        let timer = FrequencyTimer::new(engine.config().frequency_hz)?;
        actuator.reset()?;
        log::info!(
            "Arm operator started ({:.1} Hz, filter {})",
            engine.config().frequency_hz,
            if engine.config().use_filter { "on" } else { "off" }
        );
        Ok(Self {
            engine,
            actuator,
            inputs,
            telemetry,
            timer,
            stats: LoopStats::default(),
        })
    }

    /// Override the loop period (mainly for tests and simulation).
    pub fn with_period(mut self, period: Duration) -> Self {
        self.timer = FrequencyTimer::from_period(period);
        self
    }

    pub fn engine(&self) -> &RetargetingEngine {
        &self.engine
    }

    pub fn stats(&self) -> LoopStats {
        self.stats
    }

    /// Run one tick and classify its outcome.
    ///
    /// Recoverable failures (bad geometry, bad button value, actuator errors)
    /// drop the tick and are logged; only fatal errors are returned.
    pub fn step(&mut self) -> Result<TickFlags> {
        self.stats.ticks += 1;
        match self
            .engine
            .tick(self.actuator.as_mut(), &self.inputs, &self.telemetry)
        {
            Ok(flags) => {
                if flags.contains(TickFlags::SKIPPED) {
                    self.stats.skipped += 1;
                }
                Ok(flags)
            }
            Err(e) if e.is_fatal() => Err(e),
            Err(e) => {
                log::warn!("Dropping tick {}: {}", self.stats.ticks, e);
                self.stats.failed += 1;
                Ok(TickFlags::empty())
            }
        }
    }

    /// Loop until `stop` is set. The flag is checked between ticks only.
    pub fn run(&mut self, stop: &AtomicBool) -> Result<LoopStats> {
        while !stop.load(Ordering::Relaxed) {
            self.timer.start_loop();
            if let Err(e) = self.step() {
                log::error!("Arm operator stopping: {}", e);
                return Err(e);
            }
            if !self.timer.end_loop() {
                self.stats.overruns += 1;
            }
        }
        log::info!(
            "Arm operator stopped after {} ticks ({} skipped, {} failed, {} overruns)",
            self.stats.ticks,
            self.stats.skipped,
            self.stats.failed,
            self.stats.overruns
        );
        Ok(self.stats)
    }

    /// Move the loop onto its own thread.
    pub fn spawn(mut self) -> Result<OperatorHandle> {
        let stop_flag = Arc::new(AtomicBool::new(false));
        let stop_clone = stop_flag.clone();

        let thread = std::thread::Builder::new()
            .name("teleop-operator".into())
            .spawn(move || self.run(&stop_clone))
            .map_err(|e| TeleopError::Spawn(e.to_string()))?;

        Ok(OperatorHandle {
            stop_flag,
            thread: Some(thread),
        })
    }
}

/// Handle to an operator running on a background thread.
pub struct OperatorHandle {
    stop_flag: Arc<AtomicBool>,
    thread: Option<std::thread::JoinHandle<Result<LoopStats>>>,
}

impl OperatorHandle {
    /// Flag that stops the loop after the current tick when set.
    pub fn stop_flag(&self) -> Arc<AtomicBool> {
        self.stop_flag.clone()
    }

    pub fn is_running(&self) -> bool {
        self.thread.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Stop the loop and wait for the thread. Returns the loop's final result.
    pub fn stop(mut self) -> Result<LoopStats> {
        self.shutdown()
            .unwrap_or_else(|| Err(TeleopError::Spawn("operator already joined".into())))
    }

    fn shutdown(&mut self) -> Option<Result<LoopStats>> {
        self.stop_flag.store(true, Ordering::Relaxed);
        let thread = self.thread.take()?;
        Some(
            thread
                .join()
                .unwrap_or_else(|_| Err(TeleopError::Spawn("operator thread panicked".into()))),
        )
    }
}

impl Drop for OperatorHandle {
    fn drop(&mut self) {
        let _ = self.shutdown();
    }
}
