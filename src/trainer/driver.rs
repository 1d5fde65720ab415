//! SpeedTrainer - drives the trainer state machine from a one-second countdown
//!
//! The countdown is a tokio task holding a generation number. `stop` bumps the
//! generation and aborts the task, so a tick already in flight finds itself
//! stale under the lock and exits without touching the session.
//!
//! The driver lock is also the transport lock: trainer steps and manual
//! transport intents (`SpeedTrainer::manual`) both run while holding it.

use std::sync::{Arc, Mutex, MutexGuard, RwLock};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant};

use super::config::TrainerConfig;
use super::machine::{TrainerEffect, TrainerMachine, TrainerSession};
use crate::error::{log_audio_error, log_trainer_error, AudioError, TrainerError};
use crate::events::{EventBus, SessionEvent, TrainerUpdate};
use crate::metronome::{BeatScheduler, TempoConfig};

/// What the trainer acts on: the live tempo and the beat scheduler.
#[derive(Clone)]
struct Transport {
    scheduler: Arc<BeatScheduler>,
    tempo: Arc<RwLock<TempoConfig>>,
    events: Arc<EventBus>,
}

impl Transport {
    fn live_tempo(&self) -> Option<TempoConfig> {
        self.tempo.read().ok().map(|t| *t)
    }

    fn apply(&self, effects: &[TrainerEffect], time_remaining: u32) {
        for effect in effects {
            match *effect {
                TrainerEffect::ApplyTempo { bpm, step } => {
                    let Ok(mut tempo) = self.tempo.write() else {
                        log::error!("[SpeedTrainer] Tempo lock poisoned, step {} skipped", step);
                        continue;
                    };
                    tempo.set_bpm(i64::from(bpm));
                    let config = *tempo;
                    drop(tempo);

                    if let Err(err) = self.scheduler.restart(&config) {
                        log_audio_error(&err, "SpeedTrainer::apply_tempo");
                    }
                    log::info!("[SpeedTrainer] Step {} at {} BPM", step, bpm);
                    self.events.publish(SessionEvent::TempoChanged(config));
                    self.events.publish(SessionEvent::Trainer(TrainerUpdate::Step {
                        step,
                        tempo: bpm,
                        time_remaining,
                    }));
                }
                TrainerEffect::StopScheduler { pause_seconds } => {
                    if let Err(err) = self.scheduler.stop() {
                        log_audio_error(&err, "SpeedTrainer::pause");
                    }
                    log::info!("[SpeedTrainer] Pausing for {}s", pause_seconds);
                    self.events.publish(SessionEvent::TransportStopped);
                    self.events
                        .publish(SessionEvent::Trainer(TrainerUpdate::Paused {
                            seconds: pause_seconds,
                        }));
                }
                TrainerEffect::ResumeScheduler => {
                    if let Some(config) = self.live_tempo() {
                        if !self.scheduler.is_running() {
                            if let Err(err) = self.scheduler.start(&config) {
                                log_audio_error(&err, "SpeedTrainer::resume");
                            }
                            self.events
                                .publish(SessionEvent::TransportStarted { bpm: config.bpm() });
                        }
                    }
                }
                TrainerEffect::Countdown { time_remaining } => {
                    self.events
                        .publish(SessionEvent::Trainer(TrainerUpdate::Countdown {
                            time_remaining,
                        }));
                }
                TrainerEffect::Finished(summary) => {
                    log::info!(
                        "[SpeedTrainer] Finished: {} -> {} BPM in {} steps",
                        summary.start_tempo,
                        summary.final_tempo,
                        summary.steps_taken
                    );
                    self.events
                        .publish(SessionEvent::Trainer(TrainerUpdate::Finished(summary)));
                }
            }
        }
    }
}

struct DriverState {
    machine: TrainerMachine,
    generation: u64,
    countdown: Option<JoinHandle<()>>,
}

pub struct SpeedTrainer {
    runtime: Handle,
    transport: Transport,
    state: Arc<Mutex<DriverState>>,
}

impl SpeedTrainer {
    pub fn new(
        runtime: Handle,
        scheduler: Arc<BeatScheduler>,
        tempo: Arc<RwLock<TempoConfig>>,
        events: Arc<EventBus>,
    ) -> Self {
        Self {
            runtime,
            transport: Transport {
                scheduler,
                tempo,
                events,
            },
            state: Arc::new(Mutex::new(DriverState {
                machine: TrainerMachine::new(),
                generation: 0,
                countdown: None,
            })),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, DriverState>, TrainerError> {
        self.state.lock().map_err(|_| TrainerError::StatePoisoned)
    }

    /// Validate `config`, take over the transport and play step 1.
    ///
    /// # Errors
    /// `DirectionMismatch` / `InvalidConfig` / `AlreadyRunning`; nothing
    /// changes when an error is returned.
    pub fn start(&self, config: TrainerConfig) -> Result<(), TrainerError> {
        let mut state = self.lock()?;
        let effects = state
            .machine
            .start(config)
            .inspect_err(|err| log_trainer_error(err, "SpeedTrainer::start"))?;

        state.generation += 1;
        let generation = state.generation;
        let session = state.machine.session();
        log::info!(
            "[SpeedTrainer] Started {} -> {} BPM by {}, {} steps",
            config.start_tempo,
            config.target_tempo,
            config.increment_bpm,
            session.total_steps
        );
        self.transport
            .events
            .publish(SessionEvent::Trainer(TrainerUpdate::Started {
                total_steps: session.total_steps,
            }));
        self.transport.apply(&effects, session.time_remaining);

        let shared = Arc::clone(&self.state);
        let transport = self.transport.clone();
        state.countdown = Some(self.runtime.spawn(async move {
            let second = Duration::from_secs(1);
            let mut ticker = interval_at(Instant::now() + second, second);
            loop {
                ticker.tick().await;
                let Ok(mut state) = shared.lock() else {
                    break;
                };
                if state.generation != generation {
                    break;
                }
                let scheduler_running = transport.scheduler.is_running();
                let effects = state.machine.tick_second(scheduler_running);
                let time_remaining = state.machine.session().time_remaining;
                transport.apply(&effects, time_remaining);
                if !state.machine.is_active() {
                    state.countdown = None;
                    break;
                }
            }
            tracing::debug!("[SpeedTrainer] Countdown generation {} exited", generation);
        }));
        Ok(())
    }

    /// Cancel the session: countdown and scheduler stop, progress is discarded.
    pub fn stop(&self) -> Result<(), TrainerError> {
        let mut state = self.lock()?;
        state
            .machine
            .stop()
            .inspect_err(|err| log_trainer_error(err, "SpeedTrainer::stop"))?;

        state.generation += 1;
        if let Some(countdown) = state.countdown.take() {
            countdown.abort();
        }
        if let Err(err) = self.transport.scheduler.stop() {
            log_audio_error(&err, "SpeedTrainer::stop");
        }

        log::info!("[SpeedTrainer] Stopped by user");
        self.transport.events.publish(SessionEvent::TransportStopped);
        self.transport
            .events
            .publish(SessionEvent::Trainer(TrainerUpdate::Stopped));
        Ok(())
    }

    /// Run a manual transport intent unless the trainer owns the transport.
    ///
    /// The ownership check and `intent` run under the driver lock, so a
    /// concurrent `start` cannot slip in between them, and concurrent intents
    /// reach the scheduler in the order they wrote the tempo.
    ///
    /// # Errors
    /// `AudioError::TransportLocked` while a session is active; otherwise
    /// whatever `intent` returns.
    pub fn manual<R, E, F>(&self, context: &str, intent: F) -> Result<R, E>
    where
        F: FnOnce() -> Result<R, E>,
        E: From<AudioError>,
    {
        let state = self.state.lock().map_err(|_| AudioError::LockPoisoned {
            component: "trainer".to_string(),
        })?;
        if state.machine.is_active() {
            let err = AudioError::TransportLocked;
            log_audio_error(&err, context);
            return Err(err.into());
        }
        let result = intent();
        drop(state);
        result
    }

    /// Whether the trainer currently owns the transport.
    pub fn is_active(&self) -> bool {
        self.lock().map(|s| s.machine.is_active()).unwrap_or(false)
    }

    pub fn session(&self) -> Result<TrainerSession, TrainerError> {
        Ok(self.lock()?.machine.session())
    }
}

impl Drop for SpeedTrainer {
    fn drop(&mut self) {
        if let Ok(mut state) = self.state.lock() {
            state.generation += 1;
            if let Some(countdown) = state.countdown.take() {
                countdown.abort();
            }
        }
    }
}
