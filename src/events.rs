//! Live session events published to the rendering layer.
//!
//! Components publish into one [`EventBus`]; every subscriber gets its own
//! broadcast receiver. Slow subscribers lag and lose the oldest events rather
//! than stalling the beat ticker.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::broadcast;

use crate::metronome::{BeatEvent, TempoConfig};
use crate::trainer::TrainerSummary;
use crate::tuner::TunerReading;

/// Everything the session reports while it runs.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum SessionEvent {
    Beat(BeatEvent),
    TransportStarted {
        bpm: u32,
    },
    TransportStopped,
    TempoChanged(TempoConfig),
    Trainer(TrainerUpdate),
    Tuner(TunerUpdate),
    PresetApplied {
        preset_id: u64,
        name: String,
    },
    PlaylistExited,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TrainerUpdate {
    Started { total_steps: u32 },
    Step { step: u32, tempo: u32, time_remaining: u32 },
    Countdown { time_remaining: u32 },
    Paused { seconds: u32 },
    Finished(TrainerSummary),
    Stopped,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TunerUpdate {
    Listening { sample_rate: u32 },
    Reading(TunerReading),
    /// Frame below the silence threshold or without a usable pitch
    Idle,
    Stopped,
    Error { message: String },
}

/// Broadcast hub shared by every component of a session.
pub struct EventBus {
    tx: broadcast::Sender<SessionEvent>,
    published: AtomicU64,
}

impl EventBus {
    pub fn new(buffer: usize) -> Self {
        let (tx, _) = broadcast::channel(buffer.max(1));
        Self {
            tx,
            published: AtomicU64::new(0),
        }
    }

    pub fn publish(&self, event: SessionEvent) {
        self.published.fetch_add(1, Ordering::Relaxed);
        // No subscribers is not an error
        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.tx.subscribe()
    }

    pub fn published(&self) -> u64 {
        self.published.load(Ordering::Relaxed)
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
