use std::time::Duration;

use crate::config::PacingConfig;

/// The scheduler's adaptive sleep interval
///
/// Always within `[floor, ceiling]` of its pacing configuration.
#[derive(Debug, Clone)]
pub struct ScanInterval {
    pacing: PacingConfig,
    current: Duration,
}

impl ScanInterval {
    pub fn new(pacing: PacingConfig) -> Self {
        let current = clamp(pacing.initial.as_duration(), &pacing);
        Self { pacing, current }
    }

    pub fn current(&self) -> Duration {
        self.current
    }

    pub fn pacing(&self) -> &PacingConfig {
        &self.pacing
    }

    /// Shrink toward the floor after a productive cycle
    pub fn speed_up(&mut self) -> Duration {
        self.current = clamp(self.current.mul_f64(self.pacing.speedup_factor), &self.pacing);
        self.current
    }

    /// Grow toward the ceiling after a quiet cycle
    pub fn back_off(&mut self) -> Duration {
        self.current = clamp(self.current.mul_f64(self.pacing.backoff_factor), &self.pacing);
        self.current
    }
}

fn clamp(value: Duration, pacing: &PacingConfig) -> Duration {
    value.clamp(pacing.floor.as_duration(), pacing.ceiling.as_duration())
}
