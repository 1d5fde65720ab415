//! The eight selectable click timbres.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Click sound selected for the metronome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Timbre {
    /// Triangle plus square through a band-pass, wood-block like
    #[default]
    MetronomeBeats,
    /// Square wave, very short
    DryClick,
    /// High-passed decaying noise
    WoodTick,
    /// Square wave beep with a linear release
    DigitalBeep,
    /// Three stacked triangle partials
    Claves,
    /// Noise and sine under a fast decay
    WoodBlock,
    /// Low-passed sawtooth, mechanical metronome
    ClassicTick,
    /// Clean sine click
    StudioClick,
}

/// Base pitch and peak gain of one click, for a volume of 1.0.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClickVoice {
    pub frequency_hz: f32,
    pub peak_gain: f32,
}

impl Timbre {
    pub const ALL: [Timbre; 8] = [
        Timbre::MetronomeBeats,
        Timbre::DryClick,
        Timbre::WoodTick,
        Timbre::DigitalBeep,
        Timbre::Claves,
        Timbre::WoodBlock,
        Timbre::ClassicTick,
        Timbre::StudioClick,
    ];

    pub fn id(self) -> &'static str {
        match self {
            Timbre::MetronomeBeats => "metronome-beats",
            Timbre::DryClick => "dry-click",
            Timbre::WoodTick => "wood-tick",
            Timbre::DigitalBeep => "digital-beep",
            Timbre::Claves => "claves",
            Timbre::WoodBlock => "wood-block",
            Timbre::ClassicTick => "classic-tick",
            Timbre::StudioClick => "studio-click",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Timbre::MetronomeBeats => "MetronomeBeats Style",
            Timbre::DryClick => "Dry Click",
            Timbre::WoodTick => "Wood Tick",
            Timbre::DigitalBeep => "Digital Beep",
            Timbre::Claves => "Claves",
            Timbre::WoodBlock => "Wood Block",
            Timbre::ClassicTick => "Classic Tick",
            Timbre::StudioClick => "Studio Click",
        }
    }

    /// Burst length in seconds. Never above 100 ms.
    pub fn duration_secs(self) -> f32 {
        match self {
            Timbre::MetronomeBeats => 0.08,
            Timbre::DryClick => 0.02,
            Timbre::WoodTick => 0.05,
            Timbre::DigitalBeep => 0.01,
            Timbre::Claves => 0.03,
            Timbre::WoodBlock => 0.1,
            Timbre::ClassicTick => 0.05,
            Timbre::StudioClick => 0.03,
        }
    }

    /// Pitch and gain for an accented or regular beat.
    ///
    /// For the noise timbres the frequency is the filter cutoff (wood tick)
    /// or the tonal component (wood block).
    pub fn voice(self, accent: bool) -> ClickVoice {
        let (accent_hz, beat_hz, accent_gain, beat_gain) = match self {
            Timbre::MetronomeBeats => (1000.0, 800.0, 0.7, 0.7),
            Timbre::DryClick => (1200.0, 800.0, 0.8, 0.8),
            Timbre::WoodTick => (600.0, 400.0, 0.6 * 1.2, 0.6 * 0.8),
            Timbre::DigitalBeep => (2000.0, 1500.0, 0.7, 0.7),
            Timbre::Claves => (800.0, 600.0, 0.3, 0.3),
            Timbre::WoodBlock => (800.0, 600.0, 0.8 * 1.1, 0.8 * 0.9),
            Timbre::ClassicTick => (1200.0, 900.0, 0.6, 0.6),
            Timbre::StudioClick => (1500.0, 1000.0, 0.9, 0.9),
        };

        if accent {
            ClickVoice {
                frequency_hz: accent_hz,
                peak_gain: accent_gain,
            }
        } else {
            ClickVoice {
                frequency_hz: beat_hz,
                peak_gain: beat_gain,
            }
        }
    }
}

impl fmt::Display for Timbre {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for Timbre {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Timbre::ALL
            .iter()
            .copied()
            .find(|t| t.id() == s.trim())
            .ok_or_else(|| format!("unknown sound type '{}'", s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accent_is_never_lower_and_always_higher_pitched() {
        for timbre in Timbre::ALL {
            let accent = timbre.voice(true);
            let beat = timbre.voice(false);
            assert!(
                accent.frequency_hz > beat.frequency_hz,
                "{} accent should be higher pitched",
                timbre
            );
            assert!(
                accent.peak_gain >= beat.peak_gain,
                "{} accent should not be quieter",
                timbre
            );
        }
    }

    #[test]
    fn test_durations_within_100ms() {
        for timbre in Timbre::ALL {
            assert!(timbre.duration_secs() <= 0.1, "{} too long", timbre);
        }
    }

    #[test]
    fn test_ids_parse_back() {
        for timbre in Timbre::ALL {
            assert_eq!(timbre.id().parse::<Timbre>(), Ok(timbre));
        }
        assert!("cowbell".parse::<Timbre>().is_err());
    }

    #[test]
    fn test_serde_uses_kebab_ids() {
        let json = serde_json::to_string(&Timbre::WoodBlock).unwrap();
        assert_eq!(json, "\"wood-block\"");
    }
}
