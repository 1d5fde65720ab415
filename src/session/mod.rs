// PracticeSession: the single live practice context
// Owns the tempo, beat scheduler, trainer, tuner and preset store of one session

use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard, RwLock};
use tokio::runtime::Handle;
use tokio::sync::broadcast;

use crate::audio::{AudioInput, AudioOutput, Timbre, ToneSynthesizer};
use crate::config::AppConfig;
use crate::error::{
    log_preset_error, AudioError, PracticeError, PresetError, TrainerError,
};
use crate::events::{EventBus, SessionEvent};
use crate::metronome::{
    BeatScheduler, BeatSnapshot, TapTempo, TempoConfig, TempoMarking, TimeSignature,
};
use crate::presets::{
    Playlist, PlaylistPlayback, PlaylistPosition, Preset, PresetStore, WallClock,
};
use crate::storage::KeyValueStore;
use crate::trainer::{SpeedTrainer, TrainerConfig, TrainerSession};
use crate::tuner::{CalibrationState, Tuner, TunerSnapshot, TunerStatus};

/// Platform capabilities a session runs on
pub struct SessionDeps {
    /// Runtime the beat ticker, trainer countdown and tuner loop are spawned on
    pub runtime: Handle,
    pub output: Arc<dyn AudioOutput>,
    pub input: Arc<dyn AudioInput>,
    pub storage: Arc<dyn KeyValueStore>,
    pub clock: Arc<dyn WallClock>,
}

/// Everything the rendering layer draws, read in one call
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSnapshot {
    pub tempo: TempoConfig,
    pub beat: BeatSnapshot,
    pub trainer: TrainerSession,
    pub tuner: TunerSnapshot,
    pub playlist: Option<PlaylistPosition>,
}

/// PracticeSession: one explicit context instead of process-wide globals
///
/// Transport ownership: while the speed trainer is active it is the only
/// writer of the tempo and the beat transport. Manual transport and tempo
/// intents are rejected with `AudioError::TransportLocked`; timbre and volume
/// stay live. Manual intents run inside `SpeedTrainer::manual`, which holds
/// the trainer lock across the check, the tempo write and the restart.
///
/// Lock order: trainer state, then presets or playback, then tempo, then
/// scheduler state.
pub struct PracticeSession {
    events: Arc<EventBus>,
    tempo: Arc<RwLock<TempoConfig>>,
    scheduler: Arc<BeatScheduler>,
    trainer: SpeedTrainer,
    tuner: Tuner,
    calibration: Arc<RwLock<CalibrationState>>,
    storage: Arc<dyn KeyValueStore>,
    presets: Mutex<PresetStore>,
    playback: Mutex<Option<PlaylistPlayback>>,
    tap: Mutex<TapTempo>,
}

impl PracticeSession {
    /// Build a session from configuration, reading persisted presets,
    /// playlists and calibration from `deps.storage`
    pub fn new(config: AppConfig, deps: SessionDeps) -> Self {
        let events = Arc::new(EventBus::default());
        let tempo = Arc::new(RwLock::new(TempoConfig::from_config(&config.metronome)));
        let synth = Arc::new(ToneSynthesizer::new(deps.output));
        let scheduler = Arc::new(BeatScheduler::new(
            deps.runtime.clone(),
            synth,
            Arc::clone(&events),
        ));
        let trainer = SpeedTrainer::new(
            deps.runtime.clone(),
            Arc::clone(&scheduler),
            Arc::clone(&tempo),
            Arc::clone(&events),
        );
        let calibration = Arc::new(RwLock::new(CalibrationState::load(
            deps.storage.as_ref(),
        )));
        let tuner = Tuner::new(
            deps.runtime,
            deps.input,
            config.tuner.clone(),
            Arc::clone(&calibration),
            Arc::clone(&events),
        );
        let presets = PresetStore::load(Arc::clone(&deps.storage), deps.clock);

        log::info!("[PracticeSession] Created");
        Self {
            events,
            tempo,
            scheduler,
            trainer,
            tuner,
            calibration,
            storage: deps.storage,
            presets: Mutex::new(presets),
            playback: Mutex::new(None),
            tap: Mutex::new(TapTempo::from_config(&config.metronome)),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    // ========================================================================
    // LOCK HELPER METHODS
    // Safe lock acquisition with typed error handling (no unwrap/expect)
    // ========================================================================

    fn read_tempo(&self) -> Result<TempoConfig, AudioError> {
        self.tempo
            .read()
            .map(|t| *t)
            .map_err(|_| AudioError::LockPoisoned {
                component: "tempo".to_string(),
            })
    }

    fn lock_presets(&self) -> Result<MutexGuard<'_, PresetStore>, PracticeError> {
        self.presets.lock().map_err(|_| {
            PracticeError::Audio(AudioError::LockPoisoned {
                component: "preset_store".to_string(),
            })
        })
    }

    fn lock_playback(&self) -> Result<MutexGuard<'_, Option<PlaylistPlayback>>, AudioError> {
        self.playback.lock().map_err(|_| AudioError::LockPoisoned {
            component: "playlist_playback".to_string(),
        })
    }

    // ========================================================================
    // TRANSPORT
    // ========================================================================

    /// Change tempo or time signature, restarting the ticker if it is playing.
    /// Callers hold the transport through `SpeedTrainer::manual`.
    fn retime<F>(&self, change: F) -> Result<TempoConfig, AudioError>
    where
        F: FnOnce(&mut TempoConfig),
    {
        let mut tempo = self.tempo.write().map_err(|_| AudioError::LockPoisoned {
            component: "tempo".to_string(),
        })?;
        let before = *tempo;
        change(&mut tempo);
        let after = *tempo;

        if after == before {
            return Ok(after);
        }
        if self.scheduler.is_running() {
            self.scheduler.restart(&after)?;
        }
        drop(tempo);

        self.events.publish(SessionEvent::TempoChanged(after));
        Ok(after)
    }

    /// Change timbre or volume; a playing ticker picks it up on its next beat
    fn revoice<F>(&self, change: F) -> Result<TempoConfig, AudioError>
    where
        F: FnOnce(&mut TempoConfig),
    {
        let mut tempo = self.tempo.write().map_err(|_| AudioError::LockPoisoned {
            component: "tempo".to_string(),
        })?;
        change(&mut tempo);
        let after = *tempo;
        self.scheduler.set_voice(after.timbre, after.volume)?;
        drop(tempo);

        self.events.publish(SessionEvent::TempoChanged(after));
        Ok(after)
    }

    fn start_transport(&self) -> Result<(), AudioError> {
        let tempo = self.read_tempo()?;
        self.scheduler.start(&tempo)?;
        self.events
            .publish(SessionEvent::TransportStarted { bpm: tempo.bpm() });
        Ok(())
    }

    fn stop_transport(&self) -> Result<(), AudioError> {
        let was_playing = self.scheduler.is_running();
        self.scheduler.stop()?;
        if was_playing {
            self.events.publish(SessionEvent::TransportStopped);
        }
        Ok(())
    }

    pub fn play(&self) -> Result<(), AudioError> {
        self.trainer
            .manual("PracticeSession::play", || self.start_transport())
    }

    /// Stop the beat transport. Safe when already stopped.
    pub fn stop(&self) -> Result<(), AudioError> {
        self.trainer
            .manual("PracticeSession::stop", || self.stop_transport())
    }

    /// Returns whether the transport is playing afterwards
    pub fn toggle_play(&self) -> Result<bool, AudioError> {
        self.trainer.manual("PracticeSession::toggle_play", || {
            let playing = self.scheduler.is_running();
            if playing {
                self.stop_transport()?;
            } else {
                self.start_transport()?;
            }
            Ok::<_, AudioError>(!playing)
        })
    }

    pub fn is_playing(&self) -> bool {
        self.scheduler.is_running()
    }

    pub fn tempo(&self) -> Result<TempoConfig, AudioError> {
        self.read_tempo()
    }

    /// Returns the tempo actually applied after clamping to 40..=200
    pub fn set_bpm(&self, bpm: i64) -> Result<u32, AudioError> {
        self.nudge_bpm("PracticeSession::set_bpm", |_| bpm)
    }

    pub fn increment_bpm(&self) -> Result<u32, AudioError> {
        self.nudge_bpm("PracticeSession::increment_bpm", |current| current + 1)
    }

    pub fn decrement_bpm(&self) -> Result<u32, AudioError> {
        self.nudge_bpm("PracticeSession::decrement_bpm", |current| current - 1)
    }

    /// Read-modify-write of the bpm under the transport lock
    fn nudge_bpm<F>(&self, context: &str, target: F) -> Result<u32, AudioError>
    where
        F: FnOnce(i64) -> i64,
    {
        self.trainer.manual(context, || -> Result<u32, AudioError> {
            let applied = self.retime(|tempo| {
                let next = target(i64::from(tempo.bpm()));
                tempo.set_bpm(next);
            })?;
            Ok(applied.bpm())
        })
    }

    pub fn apply_marking(&self, marking: TempoMarking) -> Result<u32, AudioError> {
        self.set_bpm(i64::from(marking.bpm()))
    }

    /// Register a tap. Returns the new tempo once the taps give a usable one.
    pub fn tap(&self) -> Result<Option<u32>, AudioError> {
        let context = "PracticeSession::tap";
        self.trainer.manual(context, || -> Result<Option<u32>, AudioError> {
            let now = tokio::time::Instant::now().into_std();
            let tapped = self
                .tap
                .lock()
                .map_err(|_| AudioError::LockPoisoned {
                    component: "tap_tempo".to_string(),
                })?
                .tap(now);
            match tapped {
                Some(bpm) => {
                    let applied = self.retime(|tempo| {
                        tempo.set_bpm(i64::from(bpm));
                    })?;
                    Ok(Some(applied.bpm()))
                }
                None => Ok(None),
            }
        })
    }

    pub fn set_time_signature(&self, signature: TimeSignature) -> Result<(), AudioError> {
        self.trainer
            .manual("PracticeSession::set_time_signature", || {
                self.retime(|tempo| tempo.time_signature = signature)
            })?;
        Ok(())
    }

    pub fn set_timbre(&self, timbre: Timbre) -> Result<(), AudioError> {
        self.revoice(|tempo| tempo.timbre = timbre)?;
        Ok(())
    }

    /// Returns the volume actually applied after clamping to 0..=100
    pub fn set_volume(&self, volume: i64) -> Result<u8, AudioError> {
        Ok(self
            .revoice(|tempo| {
                tempo.set_volume(volume);
            })?
            .volume)
    }

    // ========================================================================
    // SPEED TRAINER
    // ========================================================================

    /// Hand the transport to the speed trainer. A playing playlist is exited.
    pub fn start_trainer(&self, config: TrainerConfig) -> Result<(), TrainerError> {
        self.trainer.start(config)?;
        self.exit_playlist();
        Ok(())
    }

    pub fn stop_trainer(&self) -> Result<(), TrainerError> {
        self.trainer.stop()
    }

    pub fn trainer_session(&self) -> Result<TrainerSession, TrainerError> {
        self.trainer.session()
    }

    // ========================================================================
    // TUNER
    // ========================================================================

    pub fn start_tuner(&self) -> Result<(), AudioError> {
        self.tuner.start()
    }

    pub fn stop_tuner(&self) -> Result<(), AudioError> {
        self.tuner.stop()
    }

    pub fn tuner_status(&self) -> TunerStatus {
        self.tuner.status()
    }

    pub fn tuner_snapshot(&self) -> Result<TunerSnapshot, AudioError> {
        self.tuner.snapshot()
    }

    /// Set and persist the A4 reference. Returns the clamped value in use.
    pub fn set_a4_hz(&self, a4_hz: f32) -> Result<f32, PracticeError> {
        let mut calibration = self
            .calibration
            .write()
            .map_err(|_| AudioError::LockPoisoned {
                component: "calibration".to_string(),
            })?;
        let applied = calibration.set_a4_hz(a4_hz);
        let saved = *calibration;
        drop(calibration);

        log::info!("[PracticeSession] A4 reference set to {:.1} Hz", applied);
        saved.save(self.storage.as_ref()).map_err(|err| {
            let err = PresetError::from(err);
            log_preset_error(&err, "PracticeSession::set_a4_hz");
            PracticeError::Preset(err)
        })?;
        Ok(applied)
    }

    pub fn a4_hz(&self) -> Result<f32, AudioError> {
        self.calibration
            .read()
            .map(|c| c.a4_hz())
            .map_err(|_| AudioError::LockPoisoned {
                component: "calibration".to_string(),
            })
    }

    // ========================================================================
    // PRESETS AND PLAYLISTS
    // ========================================================================

    /// Snapshot the live tempo settings under `name`
    pub fn save_preset(&self, name: &str) -> Result<Preset, PracticeError> {
        let tempo = self.read_tempo()?;
        Ok(self.lock_presets()?.save_preset(name, &tempo)?)
    }

    pub fn delete_preset(&self, id: u64) -> Result<(), PracticeError> {
        Ok(self.lock_presets()?.delete_preset(id)?)
    }

    pub fn clear_presets(&self) -> Result<(), PracticeError> {
        Ok(self.lock_presets()?.clear_presets()?)
    }

    pub fn presets(&self) -> Result<Vec<Preset>, PracticeError> {
        Ok(self.lock_presets()?.presets().to_vec())
    }

    pub fn create_playlist(
        &self,
        name: &str,
        preset_ids: &[u64],
    ) -> Result<Playlist, PracticeError> {
        Ok(self.lock_presets()?.create_playlist(name, preset_ids)?)
    }

    pub fn delete_playlist(&self, id: u64) -> Result<(), PracticeError> {
        Ok(self.lock_presets()?.delete_playlist(id)?)
    }

    pub fn clear_playlists(&self) -> Result<(), PracticeError> {
        Ok(self.lock_presets()?.clear_playlists()?)
    }

    pub fn playlists(&self) -> Result<Vec<Playlist>, PracticeError> {
        Ok(self.lock_presets()?.playlists().to_vec())
    }

    /// Copy `preset` into the live tempo, restarting the ticker if it is playing
    fn load_preset(&self, preset: &Preset) -> Result<TempoConfig, AudioError> {
        let restored = preset.tempo_config();
        let applied = self.retime(|tempo| *tempo = restored)?;
        self.scheduler.set_voice(applied.timbre, applied.volume)?;
        log::info!(
            "[PracticeSession] Applied preset {} '{}'",
            preset.id,
            preset.name
        );
        self.events.publish(SessionEvent::PresetApplied {
            preset_id: preset.id,
            name: preset.name.clone(),
        });
        Ok(applied)
    }

    pub fn apply_preset(&self, id: u64) -> Result<TempoConfig, PracticeError> {
        let context = "PracticeSession::apply_preset";
        self.trainer.manual(context, || -> Result<TempoConfig, PracticeError> {
            let preset = self
                .lock_presets()?
                .preset(id)
                .cloned()
                .ok_or(PresetError::PresetNotFound { id })?;
            Ok(self.load_preset(&preset)?)
        })
    }

    /// Start playing a playlist from its first preset
    pub fn play_playlist(&self, id: u64) -> Result<Preset, PracticeError> {
        let context = "PracticeSession::play_playlist";
        self.trainer.manual(context, || -> Result<Preset, PracticeError> {
            let playlist = self
                .lock_presets()?
                .playlist(id)
                .cloned()
                .ok_or(PresetError::PlaylistNotFound { id })?;
            let playback =
                PlaylistPlayback::start(playlist).ok_or(PresetError::EmptySelection)?;
            let first = playback.current().clone();

            self.load_preset(&first)?;
            *self.lock_playback()? = Some(playback);
            Ok(first)
        })
    }

    /// Apply the next preset. `Ok(None)` at the end of the playlist.
    pub fn next_preset(&self) -> Result<Option<Preset>, PracticeError> {
        self.navigate("PracticeSession::next_preset", PlaylistPlayback::advance)
    }

    /// Apply the previous preset. `Ok(None)` at the start of the playlist.
    pub fn previous_preset(&self) -> Result<Option<Preset>, PracticeError> {
        self.navigate("PracticeSession::previous_preset", PlaylistPlayback::retreat)
    }

    fn navigate(
        &self,
        context: &str,
        step: fn(&mut PlaylistPlayback) -> Option<&Preset>,
    ) -> Result<Option<Preset>, PracticeError> {
        self.trainer.manual(context, || -> Result<Option<Preset>, PracticeError> {
            let mut playback = self.lock_playback()?;
            let Some(active) = playback.as_mut() else {
                let err = PresetError::NoActivePlaylist;
                log_preset_error(&err, context);
                return Err(err.into());
            };
            let Some(preset) = step(active).cloned() else {
                return Ok(None);
            };
            drop(playback);

            self.load_preset(&preset)?;
            Ok(Some(preset))
        })
    }

    /// Leave playlist playback. Stored data and the live tempo are untouched.
    pub fn exit_playlist(&self) -> bool {
        let exited = self
            .playback
            .lock()
            .map(|mut p| p.take().is_some())
            .unwrap_or(false);
        if exited {
            self.events.publish(SessionEvent::PlaylistExited);
        }
        exited
    }

    pub fn playlist_position(&self) -> Option<PlaylistPosition> {
        self.playback
            .lock()
            .ok()
            .and_then(|p| p.as_ref().map(PlaylistPlayback::position))
    }

    pub fn snapshot(&self) -> Result<SessionSnapshot, PracticeError> {
        Ok(SessionSnapshot {
            trainer: self.trainer.session()?,
            tempo: self.read_tempo()?,
            beat: self.scheduler.snapshot()?,
            tuner: self.tuner.snapshot()?,
            playlist: self.playlist_position(),
        })
    }
}

impl Drop for PracticeSession {
    fn drop(&mut self) {
        let _ = self.tuner.stop();
        let _ = self.scheduler.stop();
        log::info!("[PracticeSession] Closed");
    }
}
