//! Tuner - live pitch monitoring
//!
//! While listening, one tokio task pulls a frame from the input stream at the
//! display refresh rate and runs it through the [`PitchDetector`]. The open
//! stream lives in the tuner state, not in the task, so `stop` drops it (and
//! releases the microphone) before returning.

use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard, RwLock};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};

use super::calibration::CalibrationState;
use super::detector::{FrameAnalysis, PitchDetector, TunerReading};
use crate::audio::{AudioInput, InputStream};
use crate::config::TunerConfig;
use crate::error::{log_audio_error, AudioError, ErrorCode};
use crate::events::{EventBus, SessionEvent, TunerUpdate};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "message", rename_all = "snake_case")]
pub enum TunerStatus {
    Inactive,
    Listening,
    /// Opening the microphone failed; the tuner is inactive and may be retried
    Error(String),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TunerSnapshot {
    pub status: TunerStatus,
    pub latest: Option<TunerReading>,
    pub history: Vec<f32>,
    pub a4_hz: f32,
}

struct TunerState {
    status: TunerStatus,
    generation: u64,
    task: Option<JoinHandle<()>>,
    stream: Option<Box<dyn InputStream>>,
    detector: PitchDetector,
    latest: Option<TunerReading>,
    frame: Vec<f32>,
}

pub struct Tuner {
    runtime: Handle,
    input: Arc<dyn AudioInput>,
    frame_period: Duration,
    calibration: Arc<RwLock<CalibrationState>>,
    events: Arc<EventBus>,
    state: Arc<Mutex<TunerState>>,
}

impl Tuner {
    pub fn new(
        runtime: Handle,
        input: Arc<dyn AudioInput>,
        config: TunerConfig,
        calibration: Arc<RwLock<CalibrationState>>,
        events: Arc<EventBus>,
    ) -> Self {
        let frame_period = Duration::from_secs_f64(1.0 / f64::from(config.analysis_fps.max(1)));
        let frame = vec![0.0; config.frame_size.max(1)];
        Self {
            runtime,
            input,
            frame_period,
            calibration,
            events,
            state: Arc::new(Mutex::new(TunerState {
                status: TunerStatus::Inactive,
                generation: 0,
                task: None,
                stream: None,
                detector: PitchDetector::new(config),
                latest: None,
                frame,
            })),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, TunerState>, AudioError> {
        self.state.lock().map_err(|_| AudioError::LockPoisoned {
            component: "tuner".to_string(),
        })
    }

    /// Open the microphone and start the analysis loop.
    ///
    /// # Errors
    /// - `AlreadyRunning` if already listening
    /// - `PermissionDenied` / `StreamOpenFailed` from the input device; the
    ///   status becomes `Error` and no loop is started
    pub fn start(&self) -> Result<(), AudioError> {
        let mut state = self.lock()?;
        if state.status == TunerStatus::Listening {
            return Err(AudioError::AlreadyRunning);
        }

        let stream = match self.input.open() {
            Ok(stream) => stream,
            Err(err) => {
                log_audio_error(&err, "Tuner::start");
                state.status = TunerStatus::Error(err.message());
                self.events.publish(SessionEvent::Tuner(TunerUpdate::Error {
                    message: err.message(),
                }));
                return Err(err);
            }
        };

        let sample_rate = stream.sample_rate();
        state.generation += 1;
        state.stream = Some(stream);
        state.status = TunerStatus::Listening;
        state.latest = None;
        state.detector.reset();

        let generation = state.generation;
        let shared = Arc::clone(&self.state);
        let calibration = Arc::clone(&self.calibration);
        let events = Arc::clone(&self.events);
        let period = self.frame_period;

        state.task = Some(self.runtime.spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                let a4_hz = match calibration.read() {
                    Ok(c) => c.a4_hz(),
                    Err(_) => break,
                };
                let Ok(mut guard) = shared.lock() else {
                    break;
                };
                if guard.generation != generation {
                    break;
                }
                let state = &mut *guard;
                let Some(stream) = state.stream.as_mut() else {
                    break;
                };
                if !stream.read_frame(&mut state.frame) {
                    continue;
                }
                let rate = stream.sample_rate();
                let update = match state.detector.analyze(&state.frame, rate, a4_hz) {
                    FrameAnalysis::Pitched(reading) => {
                        state.latest = Some(reading);
                        TunerUpdate::Reading(reading)
                    }
                    FrameAnalysis::Silent { .. } | FrameAnalysis::Unpitched { .. } => {
                        state.latest = None;
                        TunerUpdate::Idle
                    }
                };
                events.publish(SessionEvent::Tuner(update));
            }
            tracing::debug!("[Tuner] Analysis loop generation {} exited", generation);
        }));

        log::info!("[Tuner] Listening at {} Hz", sample_rate);
        self.events
            .publish(SessionEvent::Tuner(TunerUpdate::Listening { sample_rate }));
        Ok(())
    }

    /// Cancel the analysis loop and release the input stream. Safe when inactive.
    pub fn stop(&self) -> Result<(), AudioError> {
        let mut state = self.lock()?;
        state.generation += 1;
        if let Some(task) = state.task.take() {
            task.abort();
        }
        let was_listening = state.stream.take().is_some();
        state.status = TunerStatus::Inactive;
        state.latest = None;
        if was_listening {
            log::info!("[Tuner] Stopped, input released");
            self.events.publish(SessionEvent::Tuner(TunerUpdate::Stopped));
        }
        Ok(())
    }

    pub fn status(&self) -> TunerStatus {
        self.lock()
            .map(|s| s.status.clone())
            .unwrap_or_else(|e| TunerStatus::Error(e.message()))
    }

    pub fn snapshot(&self) -> Result<TunerSnapshot, AudioError> {
        let a4_hz = self
            .calibration
            .read()
            .map_err(|_| AudioError::LockPoisoned {
                component: "calibration".to_string(),
            })?
            .a4_hz();
        let state = self.lock()?;
        Ok(TunerSnapshot {
            status: state.status.clone(),
            latest: state.latest,
            history: state.detector.history().to_vec(),
            a4_hz,
        })
    }
}

impl Drop for Tuner {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}
