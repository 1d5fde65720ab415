//! Live tempo configuration: bpm, time signature, timbre and volume.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::audio::Timbre;
use crate::config::MetronomeConfig;

pub const MIN_BPM: u32 = 40;
pub const MAX_BPM: u32 = 200;
pub const MAX_VOLUME: u8 = 100;

/// Clamp any requested tempo into the supported range.
pub fn clamp_bpm(bpm: i64) -> u32 {
    bpm.clamp(i64::from(MIN_BPM), i64::from(MAX_BPM)) as u32
}

/// Beats per measure over beat unit, e.g. 6/8.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSignature {
    pub beats_per_measure: u8,
    pub beat_unit: u8,
}

impl TimeSignature {
    pub const COMMON: [TimeSignature; 6] = [
        TimeSignature {
            beats_per_measure: 2,
            beat_unit: 4,
        },
        TimeSignature {
            beats_per_measure: 3,
            beat_unit: 4,
        },
        TimeSignature {
            beats_per_measure: 4,
            beat_unit: 4,
        },
        TimeSignature {
            beats_per_measure: 6,
            beat_unit: 8,
        },
        TimeSignature {
            beats_per_measure: 9,
            beat_unit: 8,
        },
        TimeSignature {
            beats_per_measure: 12,
            beat_unit: 8,
        },
    ];

    /// `None` for a zero beat count or beat unit.
    pub fn new(beats_per_measure: u8, beat_unit: u8) -> Option<Self> {
        if beats_per_measure == 0 || beat_unit == 0 {
            return None;
        }
        Some(Self {
            beats_per_measure,
            beat_unit,
        })
    }
}

impl Default for TimeSignature {
    fn default() -> Self {
        Self {
            beats_per_measure: 4,
            beat_unit: 4,
        }
    }
}

impl fmt::Display for TimeSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.beats_per_measure, self.beat_unit)
    }
}

impl FromStr for TimeSignature {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (beats, unit) = s
            .trim()
            .split_once('/')
            .ok_or_else(|| format!("time signature '{}' must look like 3/4", s))?;
        let beats: u8 = beats
            .trim()
            .parse()
            .map_err(|_| format!("invalid beat count in '{}'", s))?;
        let unit: u8 = unit
            .trim()
            .parse()
            .map_err(|_| format!("invalid beat unit in '{}'", s))?;
        TimeSignature::new(beats, unit).ok_or_else(|| format!("unsupported time signature '{}'", s))
    }
}

/// Traditional tempo markings offered as shortcuts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TempoMarking {
    Largo,
    Adagio,
    Andante,
    Moderato,
    Allegro,
    Presto,
}

impl TempoMarking {
    pub const ALL: [TempoMarking; 6] = [
        TempoMarking::Largo,
        TempoMarking::Adagio,
        TempoMarking::Andante,
        TempoMarking::Moderato,
        TempoMarking::Allegro,
        TempoMarking::Presto,
    ];

    pub fn bpm(self) -> u32 {
        match self {
            TempoMarking::Largo => 60,
            TempoMarking::Adagio => 76,
            TempoMarking::Andante => 108,
            TempoMarking::Moderato => 120,
            TempoMarking::Allegro => 144,
            TempoMarking::Presto => 180,
        }
    }
}

impl FromStr for TempoMarking {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        TempoMarking::ALL
            .iter()
            .copied()
            .find(|m| format!("{:?}", m).to_lowercase() == wanted)
            .ok_or_else(|| format!("unknown tempo marking '{}'", s))
    }
}

/// The live metronome settings.
///
/// `bpm` is only reachable through [`TempoConfig::set_bpm`], which clamps to
/// 40..=200. A deserialized value is taken as-is; the beat scheduler rejects
/// a zero tempo when it is started.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TempoConfig {
    bpm: u32,
    pub time_signature: TimeSignature,
    pub timbre: Timbre,
    /// 0..=100
    pub volume: u8,
}

impl Default for TempoConfig {
    fn default() -> Self {
        Self {
            bpm: 120,
            time_signature: TimeSignature::default(),
            timbre: Timbre::default(),
            volume: 70,
        }
    }
}

impl TempoConfig {
    pub fn from_config(config: &MetronomeConfig) -> Self {
        let mut tempo = Self {
            bpm: MIN_BPM,
            time_signature: TimeSignature::new(
                config.default_beats_per_measure,
                config.default_beat_unit,
            )
            .unwrap_or_default(),
            timbre: config.default_timbre,
            volume: 0,
        };
        tempo.set_bpm(i64::from(config.default_bpm));
        tempo.set_volume(i64::from(config.default_volume));
        tempo
    }

    pub fn bpm(&self) -> u32 {
        self.bpm
    }

    /// Sets the tempo, clamped. Returns the value actually applied.
    pub fn set_bpm(&mut self, bpm: i64) -> u32 {
        self.bpm = clamp_bpm(bpm);
        self.bpm
    }

    /// Sets the volume, clamped to 0..=100. Returns the value actually applied.
    pub fn set_volume(&mut self, volume: i64) -> u8 {
        self.volume = volume.clamp(0, i64::from(MAX_VOLUME)) as u8;
        self.volume
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bpm_is_clamped() {
        let mut tempo = TempoConfig::default();
        assert_eq!(tempo.set_bpm(10), 40);
        assert_eq!(tempo.set_bpm(250), 200);
        assert_eq!(tempo.set_bpm(-3), 40);
        assert_eq!(tempo.set_bpm(96), 96);
        assert_eq!(tempo.bpm(), 96);
    }

    #[test]
    fn test_volume_is_clamped() {
        let mut tempo = TempoConfig::default();
        assert_eq!(tempo.set_volume(150), 100);
        assert_eq!(tempo.set_volume(-1), 0);
    }

    #[test]
    fn test_defaults() {
        let tempo = TempoConfig::from_config(&MetronomeConfig::default());
        assert_eq!(tempo.bpm(), 120);
        assert_eq!(tempo.time_signature.to_string(), "4/4");
        assert_eq!(tempo.timbre, Timbre::MetronomeBeats);
        assert_eq!(tempo.volume, 70);
    }

    #[test]
    fn test_time_signature_parse() {
        assert_eq!(
            "6/8".parse::<TimeSignature>(),
            Ok(TimeSignature {
                beats_per_measure: 6,
                beat_unit: 8
            })
        );
        assert!("0/4".parse::<TimeSignature>().is_err());
        assert!("4/0".parse::<TimeSignature>().is_err());
        assert!("waltz".parse::<TimeSignature>().is_err());
        for sig in TimeSignature::COMMON {
            assert_eq!(sig.to_string().parse::<TimeSignature>(), Ok(sig));
        }
    }

    #[test]
    fn test_tempo_markings() {
        assert_eq!(TempoMarking::Largo.bpm(), 60);
        assert_eq!(TempoMarking::Presto.bpm(), 180);
        assert_eq!("allegro".parse::<TempoMarking>(), Ok(TempoMarking::Allegro));
        for marking in TempoMarking::ALL {
            assert_eq!(clamp_bpm(i64::from(marking.bpm())), marking.bpm());
        }
    }
}
