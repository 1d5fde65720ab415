use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::audio::Timbre;
use crate::metronome::{TempoConfig, TimeSignature};

/// A named snapshot of the live tempo settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preset {
    /// Creation time in milliseconds, bumped on collision
    pub id: u64,
    pub name: String,
    pub tempo: u32,
    pub time_signature: TimeSignature,
    pub sound_type: Timbre,
    pub volume: u8,
    pub created_at_ms: u64,
}

impl Preset {
    pub fn from_tempo(id: u64, name: String, tempo: &TempoConfig, created_at_ms: u64) -> Self {
        Self {
            id,
            name,
            tempo: tempo.bpm(),
            time_signature: tempo.time_signature,
            sound_type: tempo.timbre,
            volume: tempo.volume,
            created_at_ms,
        }
    }

    /// The live settings this preset restores. Stored values are clamped.
    pub fn tempo_config(&self) -> TempoConfig {
        let mut config = TempoConfig::default();
        config.set_bpm(i64::from(self.tempo));
        config.set_volume(i64::from(self.volume));
        config.time_signature = TimeSignature::new(
            self.time_signature.beats_per_measure,
            self.time_signature.beat_unit,
        )
        .unwrap_or_default();
        config.timbre = self.sound_type;
        config
    }
}

/// An ordered collection of presets, copied by value at creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Playlist {
    pub id: u64,
    pub name: String,
    pub presets: Vec<Preset>,
    pub created_at_ms: u64,
}

/// Source of creation timestamps.
pub trait WallClock: Send + Sync {
    fn now_ms(&self) -> u64;
}

pub struct SystemWallClock;

impl WallClock for SystemWallClock {
    fn now_ms(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0)
    }
}
