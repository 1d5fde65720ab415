//! BeatScheduler - periodic beat ticker
//!
//! One tokio task per run. The task ticks on a `tokio::time::interval`, whose
//! deadlines are absolute, so a late tick does not shift the beats after it.
//! Each run carries a generation number; the task re-checks it under the
//! scheduler lock before every tick, and `stop` bumps it and aborts the task.
//! A tick that lost the race with `stop` therefore never sounds.

use std::sync::{Arc, Mutex, MutexGuard};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};

use super::beat::{beat_interval, BeatEvent, BeatState};
use super::tempo::TempoConfig;
use crate::audio::{Timbre, ToneSynthesizer};
use crate::error::{log_audio_error, AudioError};
use crate::events::{EventBus, SessionEvent};

struct TickerState {
    beat: BeatState,
    generation: u64,
    ticker: Option<JoinHandle<()>>,
    bpm: u32,
    timbre: Timbre,
    volume: u8,
}

/// Snapshot of the beat transport for rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct BeatSnapshot {
    pub playing: bool,
    pub bpm: u32,
    /// Index the next beat will carry
    pub beat_index: u64,
    pub beat_in_measure: u8,
    pub beats_per_measure: u8,
}

pub struct BeatScheduler {
    runtime: Handle,
    synth: Arc<ToneSynthesizer>,
    events: Arc<EventBus>,
    state: Arc<Mutex<TickerState>>,
}

impl BeatScheduler {
    pub fn new(runtime: Handle, synth: Arc<ToneSynthesizer>, events: Arc<EventBus>) -> Self {
        let defaults = TempoConfig::default();
        Self {
            runtime,
            synth,
            events,
            state: Arc::new(Mutex::new(TickerState {
                beat: BeatState::new(defaults.time_signature.beats_per_measure),
                generation: 0,
                ticker: None,
                bpm: defaults.bpm(),
                timbre: defaults.timbre,
                volume: defaults.volume,
            })),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, TickerState>, AudioError> {
        self.state.lock().map_err(|_| AudioError::LockPoisoned {
            component: "beat_scheduler".to_string(),
        })
    }

    /// Start ticking at `config.bpm()`. The first beat sounds immediately.
    ///
    /// # Errors
    /// - `BpmInvalid` for a zero tempo
    /// - `AlreadyRunning` if a run is in progress; use [`restart`](Self::restart)
    pub fn start(&self, config: &TempoConfig) -> Result<(), AudioError> {
        let period = beat_interval(config.bpm()).inspect_err(|err| {
            log_audio_error(err, "BeatScheduler::start");
        })?;

        let mut state = self.lock()?;
        if state.ticker.is_some() {
            let err = AudioError::AlreadyRunning;
            log_audio_error(&err, "BeatScheduler::start");
            return Err(err);
        }

        state.generation += 1;
        state.beat = BeatState::new(config.time_signature.beats_per_measure);
        state.bpm = config.bpm();
        state.timbre = config.timbre;
        state.volume = config.volume;

        let generation = state.generation;
        let shared = Arc::clone(&self.state);
        let synth = Arc::clone(&self.synth);
        let events = Arc::clone(&self.events);

        state.ticker = Some(self.runtime.spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                let Ok(mut state) = shared.lock() else {
                    break;
                };
                if state.generation != generation {
                    break;
                }
                let bpm = state.bpm;
                let event = state.beat.advance(bpm);
                // Played under the lock so stop() cannot interleave with a tick
                synth.play(state.timbre, state.volume, event.accent);
                events.publish(SessionEvent::Beat(event));
            }
            tracing::debug!("[BeatScheduler] Ticker generation {} exited", generation);
        }));

        log::info!(
            "[BeatScheduler] Started at {} BPM, {}",
            config.bpm(),
            config.time_signature
        );
        Ok(())
    }

    /// Cancel the ticker and reset the beat counter. Safe when not running.
    pub fn stop(&self) -> Result<(), AudioError> {
        let mut state = self.lock()?;
        state.generation += 1;
        state.beat.reset();
        if let Some(ticker) = state.ticker.take() {
            ticker.abort();
            log::info!("[BeatScheduler] Stopped");
        }
        Ok(())
    }

    /// Stop then start. The only way to change tempo or time signature while running.
    pub fn restart(&self, config: &TempoConfig) -> Result<(), AudioError> {
        self.stop()?;
        self.start(config)
    }

    /// Change the click sound or volume of a running ticker without a restart.
    pub fn set_voice(&self, timbre: Timbre, volume: u8) -> Result<(), AudioError> {
        let mut state = self.lock()?;
        state.timbre = timbre;
        state.volume = volume;
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.lock().map(|s| s.ticker.is_some()).unwrap_or(false)
    }

    pub fn snapshot(&self) -> Result<BeatSnapshot, AudioError> {
        let state = self.lock()?;
        Ok(BeatSnapshot {
            playing: state.ticker.is_some(),
            bpm: state.bpm,
            beat_index: state.beat.beat_index(),
            beat_in_measure: state.beat.beat_in_measure(),
            beats_per_measure: state.beat.beats_per_measure(),
        })
    }
}

impl Drop for BeatScheduler {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metronome::TimeSignature;
    use crate::testing::RecordingOutput;
    use std::time::Duration;
    use tokio::sync::broadcast;

    fn scheduler() -> (BeatScheduler, Arc<RecordingOutput>, Arc<EventBus>) {
        let output = Arc::new(RecordingOutput::new(8000));
        let synth = Arc::new(ToneSynthesizer::new(output.clone()));
        let events = Arc::new(EventBus::default());
        (
            BeatScheduler::new(Handle::current(), synth, events.clone()),
            output,
            events,
        )
    }

    fn tempo(bpm: i64, beats: u8) -> TempoConfig {
        let mut config = TempoConfig::default();
        config.set_bpm(bpm);
        config.time_signature = TimeSignature::new(beats, 4).unwrap();
        config
    }

    fn drain_beats(rx: &mut broadcast::Receiver<SessionEvent>) -> Vec<BeatEvent> {
        let mut beats = Vec::new();
        while let Ok(event) = rx.try_recv() {
            if let SessionEvent::Beat(beat) = event {
                beats.push(beat);
            }
        }
        beats
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_beat_fires_immediately() {
        let (scheduler, output, events) = scheduler();
        let mut rx = events.subscribe();

        scheduler.start(&tempo(120, 4)).unwrap();
        tokio::time::sleep(Duration::from_millis(1)).await;

        let beats = drain_beats(&mut rx);
        assert_eq!(beats.len(), 1, "Exactly one beat at t=0");
        assert!(beats[0].accent);
        assert_eq!(output.bursts().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_interval_follows_bpm() {
        let (scheduler, _output, events) = scheduler();
        let mut rx = events.subscribe();

        // 120 BPM: beats at 0, 500, 1000, 1500, 2000 ms
        scheduler.start(&tempo(120, 4)).unwrap();
        tokio::time::sleep(Duration::from_millis(2250)).await;

        let beats = drain_beats(&mut rx);
        assert_eq!(beats.len(), 5, "Expected 5 beats in 2.25s at 120 BPM");
        let positions: Vec<u8> = beats.iter().map(|b| b.beat_in_measure).collect();
        assert_eq!(positions, vec![0, 1, 2, 3, 0]);
        assert!(beats[4].accent);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_silences_and_resets() {
        let (scheduler, _output, events) = scheduler();
        let mut rx = events.subscribe();

        scheduler.start(&tempo(60, 3)).unwrap();
        tokio::time::sleep(Duration::from_millis(1500)).await;
        scheduler.stop().unwrap();
        assert!(!scheduler.is_running());
        assert_eq!(scheduler.snapshot().unwrap().beat_index, 0);

        drain_beats(&mut rx);
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(drain_beats(&mut rx).is_empty(), "No beats after stop");
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_twice_is_rejected() {
        let (scheduler, _output, _events) = scheduler();
        scheduler.start(&tempo(100, 4)).unwrap();
        assert_eq!(
            scheduler.start(&tempo(100, 4)),
            Err(AudioError::AlreadyRunning)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_bpm_is_rejected() {
        let (scheduler, _output, _events) = scheduler();
        let config: TempoConfig = serde_json::from_str(
            r#"{"bpm":0,"time_signature":{"beats_per_measure":4,"beat_unit":4},"timbre":"dry-click","volume":50}"#,
        )
        .unwrap();

        assert_eq!(
            scheduler.start(&config),
            Err(AudioError::BpmInvalid { bpm: 0 })
        );
        assert!(!scheduler.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_never_doubles_ticks() {
        let (scheduler, _output, events) = scheduler();
        let mut rx = events.subscribe();

        scheduler.start(&tempo(60, 4)).unwrap();
        tokio::time::sleep(Duration::from_millis(300)).await;
        for bpm in [80, 100, 120] {
            scheduler.restart(&tempo(bpm, 4)).unwrap();
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        drain_beats(&mut rx);

        // Only the 120 BPM ticker survives: 1s window holds exactly 2 beats
        tokio::time::sleep(Duration::from_millis(1000)).await;
        let beats = drain_beats(&mut rx);
        assert_eq!(beats.len(), 2, "Expected 2 beats, got {:?}", beats);
        assert!(beats.iter().all(|b| b.bpm == 120));
        assert_eq!(beats[0].beat_index + 1, beats[1].beat_index);
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_resets_to_downbeat() {
        let (scheduler, _output, events) = scheduler();
        let mut rx = events.subscribe();

        scheduler.start(&tempo(120, 4)).unwrap();
        tokio::time::sleep(Duration::from_millis(1100)).await;
        drain_beats(&mut rx);

        scheduler.restart(&tempo(90, 3)).unwrap();
        tokio::time::sleep(Duration::from_millis(1)).await;
        let beats = drain_beats(&mut rx);
        assert_eq!(beats.len(), 1);
        assert_eq!(beats[0].beat_index, 0);
        assert_eq!(beats[0].beats_per_measure, 3);
        assert!(beats[0].accent);
    }

    #[tokio::test(start_paused = true)]
    async fn test_set_voice_applies_to_next_beat() {
        let (scheduler, output, _events) = scheduler();
        scheduler.start(&tempo(60, 4)).unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;

        scheduler.set_voice(Timbre::StudioClick, 0).unwrap();
        tokio::time::sleep(Duration::from_millis(1000)).await;

        let bursts = output.bursts();
        assert_eq!(bursts.len(), 2);
        assert!(bursts[1].iter().all(|s| *s == 0.0), "Volume 0 renders silence");
    }
}
