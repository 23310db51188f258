use crate::{Result, TeleopError};
use std::time::{Duration, Instant};

/// Fraction of the nominal period used as the tick budget, leaving headroom
/// for wake-up latency after the sleep.
const FRAME_TIME_MARGIN: f64 = 0.99;

/// Paces a loop to a fixed period.
///
/// Overruns are not carried over: a late tick simply starts the next one
/// immediately.
#[derive(Debug, Clone)]
pub struct FrequencyTimer {
    period: Duration,
    start: Option<Instant>,
}

impl FrequencyTimer {
    /// Budget of `0.99 / hz` per tick. Fails if the rate gives no
    /// representable period.
    pub fn new(frequency_hz: f64) -> Result<Self> {
        Duration::try_from_secs_f64(FRAME_TIME_MARGIN / frequency_hz)
            .map(Self::from_period)
            .map_err(|e| {
                TeleopError::InvalidConfig(format!("frequency_hz {}: {}", frequency_hz, e))
            })
    }

    pub fn from_period(period: Duration) -> Self {
        Self { period, start: None }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn start_loop(&mut self) {
        self.start = Some(Instant::now());
    }

    /// Sleep out the rest of the period. Returns `false` when the tick overran.
    pub fn end_loop(&mut self) -> bool {
        let Some(start) = self.start.take() else {
            return true;
        };
        match self.period.checked_sub(start.elapsed()) {
            Some(remaining) if !remaining.is_zero() => {
                std::thread::sleep(remaining);
                true
            }
            _ => false,
        }
    }
}
