use serde::{Deserialize, Serialize};

use crate::config::TrainerDefaults;
use crate::error::TrainerError;

/// Parameters of one speed-training session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainerConfig {
    pub start_tempo: u32,
    pub target_tempo: u32,
    /// Signed, nonzero; its sign must point from start towards target
    pub increment_bpm: i32,
    /// Seconds each step holds its tempo
    pub interval_seconds: u32,
    /// Steps played at each tempo before moving on
    pub repetitions_per_tempo: u32,
    /// Silence between tempos, 0 for none
    pub pause_between_seconds: u32,
}

impl From<&TrainerDefaults> for TrainerConfig {
    fn from(defaults: &TrainerDefaults) -> Self {
        Self {
            start_tempo: defaults.start_tempo,
            target_tempo: defaults.target_tempo,
            increment_bpm: defaults.increment_bpm,
            interval_seconds: defaults.interval_seconds,
            repetitions_per_tempo: defaults.repetitions_per_tempo,
            pause_between_seconds: defaults.pause_between_seconds,
        }
    }
}

impl TrainerConfig {
    pub fn validate(&self) -> Result<(), TrainerError> {
        if self.increment_bpm == 0 {
            return Err(TrainerError::InvalidConfig {
                reason: "increment must not be zero".to_string(),
            });
        }
        if self.start_tempo == 0 || self.target_tempo == 0 {
            return Err(TrainerError::InvalidConfig {
                reason: "tempos must be greater than zero".to_string(),
            });
        }
        if self.interval_seconds == 0 {
            return Err(TrainerError::InvalidConfig {
                reason: "interval must be at least one second".to_string(),
            });
        }
        if self.repetitions_per_tempo == 0 {
            return Err(TrainerError::InvalidConfig {
                reason: "repetitions per tempo must be at least one".to_string(),
            });
        }

        let rising = self.increment_bpm > 0;
        let consistent = if rising {
            self.start_tempo < self.target_tempo
        } else {
            self.start_tempo > self.target_tempo
        };
        if !consistent {
            return Err(TrainerError::DirectionMismatch {
                start: self.start_tempo,
                target: self.target_tempo,
                increment: self.increment_bpm,
            });
        }
        Ok(())
    }

    /// ceil(|target − start| / |increment| + 1) × repetitions.
    pub fn total_steps(&self) -> u32 {
        let span = f64::from(self.target_tempo.abs_diff(self.start_tempo));
        let per_increment = f64::from(self.increment_bpm.unsigned_abs().max(1));
        let tempos = (span / per_increment + 1.0).ceil() as u32;
        tempos * self.repetitions_per_tempo
    }

    /// Tempo cycle a 1-based step belongs to.
    pub fn cycle_for_step(&self, step: u32) -> u32 {
        step.div_ceil(self.repetitions_per_tempo.max(1))
    }

    /// Unclamped tempo a 1-based step would play.
    pub fn candidate_tempo(&self, step: u32) -> i64 {
        let cycle = i64::from(self.cycle_for_step(step));
        i64::from(self.start_tempo) + (cycle - 1) * i64::from(self.increment_bpm)
    }

    /// Whether `tempo` lies beyond the target in the direction of travel.
    pub fn overshoots(&self, tempo: i64) -> bool {
        let target = i64::from(self.target_tempo);
        if self.increment_bpm > 0 {
            tempo > target
        } else {
            tempo < target
        }
    }
}
