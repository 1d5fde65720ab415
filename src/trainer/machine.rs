//! SpeedTrainer state machine
//!
//! Pure transitions with no timers or I/O. The driver feeds it one call per
//! elapsed second and carries out the returned effects against the beat
//! scheduler, which keeps every step and pause deterministic under test.

use serde::Serialize;

use super::config::TrainerConfig;
use crate::error::TrainerError;
use crate::metronome::clamp_bpm;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TrainerPhase {
    Idle,
    Running,
    Paused,
}

/// Completion report of a session that reached its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TrainerSummary {
    pub start_tempo: u32,
    pub final_tempo: u32,
    pub steps_taken: u32,
}

/// Work the driver must carry out after a transition, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrainerEffect {
    /// Set the live tempo to `bpm` and restart the beat scheduler
    ApplyTempo { bpm: u32, step: u32 },
    /// Silence the beat scheduler for a pause
    StopScheduler { pause_seconds: u32 },
    /// Start the beat scheduler again at the live tempo after a pause
    ResumeScheduler,
    /// Countdown ticked without a transition
    Countdown { time_remaining: u32 },
    /// Target reached; the scheduler keeps playing the final tempo
    Finished(TrainerSummary),
}

/// Read-only view of the trainer for rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TrainerSession {
    pub active: bool,
    pub phase: TrainerPhase,
    pub current_step: u32,
    pub total_steps: u32,
    pub time_remaining: u32,
    pub current_tempo: Option<u32>,
}

pub struct TrainerMachine {
    config: Option<TrainerConfig>,
    phase: TrainerPhase,
    current_step: u32,
    time_remaining: u32,
    current_tempo: Option<u32>,
    resume_after_pause: bool,
}

impl Default for TrainerMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl TrainerMachine {
    pub fn new() -> Self {
        Self {
            config: None,
            phase: TrainerPhase::Idle,
            current_step: 0,
            time_remaining: 0,
            current_tempo: None,
            resume_after_pause: false,
        }
    }

    pub fn is_active(&self) -> bool {
        self.phase != TrainerPhase::Idle
    }

    pub fn phase(&self) -> TrainerPhase {
        self.phase
    }

    pub fn session(&self) -> TrainerSession {
        TrainerSession {
            active: self.is_active(),
            phase: self.phase,
            current_step: self.current_step,
            total_steps: self.config.map(|c| c.total_steps()).unwrap_or(0),
            time_remaining: self.time_remaining,
            current_tempo: self.current_tempo,
        }
    }

    /// Validate `config` and execute step 1.
    ///
    /// On error nothing changes.
    pub fn start(&mut self, config: TrainerConfig) -> Result<Vec<TrainerEffect>, TrainerError> {
        if self.is_active() {
            return Err(TrainerError::AlreadyRunning);
        }
        config.validate()?;

        self.config = Some(config);
        self.phase = TrainerPhase::Running;
        self.current_step = 0;
        self.current_tempo = None;
        self.resume_after_pause = false;
        Ok(self.execute_next_step())
    }

    /// One second elapsed.
    ///
    /// `scheduler_running` is consulted when a pause begins, to decide whether
    /// the pause ends by resuming playback.
    pub fn tick_second(&mut self, scheduler_running: bool) -> Vec<TrainerEffect> {
        match self.phase {
            TrainerPhase::Idle => Vec::new(),
            TrainerPhase::Running => {
                self.time_remaining = self.time_remaining.saturating_sub(1);
                if self.time_remaining > 0 {
                    return vec![TrainerEffect::Countdown {
                        time_remaining: self.time_remaining,
                    }];
                }
                self.on_countdown_expired(scheduler_running)
            }
            TrainerPhase::Paused => {
                self.time_remaining = self.time_remaining.saturating_sub(1);
                if self.time_remaining > 0 {
                    return vec![TrainerEffect::Countdown {
                        time_remaining: self.time_remaining,
                    }];
                }
                self.phase = TrainerPhase::Running;
                let resume = std::mem::take(&mut self.resume_after_pause);
                let mut effects = self.execute_next_step();
                // A new tempo restarts the scheduler anyway; only a finish needs an explicit resume
                let restarts = effects
                    .iter()
                    .any(|e| matches!(e, TrainerEffect::ApplyTempo { .. }));
                if resume && !restarts {
                    effects.insert(0, TrainerEffect::ResumeScheduler);
                }
                effects
            }
        }
    }

    /// Cancel the session, discarding progress.
    pub fn stop(&mut self) -> Result<(), TrainerError> {
        if !self.is_active() {
            return Err(TrainerError::NotRunning);
        }
        *self = Self::new();
        Ok(())
    }

    fn on_countdown_expired(&mut self, scheduler_running: bool) -> Vec<TrainerEffect> {
        let Some(config) = self.config else {
            return Vec::new();
        };
        let last_repetition = self.current_step % config.repetitions_per_tempo.max(1) == 0;
        if last_repetition && config.pause_between_seconds > 0 {
            self.phase = TrainerPhase::Paused;
            self.time_remaining = config.pause_between_seconds;
            self.resume_after_pause = scheduler_running;
            return vec![TrainerEffect::StopScheduler {
                pause_seconds: config.pause_between_seconds,
            }];
        }
        self.execute_next_step()
    }

    fn execute_next_step(&mut self) -> Vec<TrainerEffect> {
        let Some(config) = self.config else {
            return Vec::new();
        };
        self.current_step += 1;
        let candidate = config.candidate_tempo(self.current_step);
        if config.overshoots(candidate) {
            return vec![self.finish(config)];
        }

        let bpm = clamp_bpm(candidate);
        self.current_tempo = Some(bpm);
        self.time_remaining = config.interval_seconds;
        vec![TrainerEffect::ApplyTempo {
            bpm,
            step: self.current_step,
        }]
    }

    fn finish(&mut self, config: TrainerConfig) -> TrainerEffect {
        let summary = TrainerSummary {
            start_tempo: config.start_tempo,
            final_tempo: self.current_tempo.unwrap_or(config.start_tempo),
            steps_taken: self.current_step - 1,
        };
        *self = Self::new();
        TrainerEffect::Finished(summary)
    }
}
