//! Configuration management for the practice toolkit
//!
//! Runtime configuration is loaded from a JSON file so thresholds and
//! defaults can be adjusted without recompilation. Every field has a default,
//! and a missing or malformed file falls back to the defaults.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::audio::Timbre;

/// Complete application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub metronome: MetronomeConfig,
    pub tuner: TunerConfig,
    pub trainer: TrainerDefaults,
    pub audio: AudioConfig,
    pub storage: StorageConfig,
}

/// Live metronome defaults applied when a session is created
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetronomeConfig {
    pub default_bpm: u32,
    pub default_beats_per_measure: u8,
    pub default_beat_unit: u8,
    pub default_volume: u8,
    pub default_timbre: Timbre,
    /// Inactivity after which the tap tempo window is discarded
    pub tap_reset_ms: u64,
    /// Number of most recent taps averaged by tap tempo
    pub tap_window: usize,
}

impl Default for MetronomeConfig {
    fn default() -> Self {
        Self {
            default_bpm: 120,
            default_beats_per_measure: 4,
            default_beat_unit: 4,
            default_volume: 70,
            default_timbre: Timbre::MetronomeBeats,
            tap_reset_ms: 3000,
            tap_window: 4,
        }
    }
}

/// Pitch detection parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TunerConfig {
    /// Samples per analysis frame
    pub frame_size: usize,
    /// Frames quieter than this (dBFS) are treated as silence
    pub silence_threshold_db: f32,
    /// Lowest frequency searched by autocorrelation (sets the longest lag)
    pub min_search_hz: f32,
    /// Highest frequency searched by autocorrelation (sets the shortest lag)
    pub max_search_hz: f32,
    /// Detected frequencies outside [min_accept_hz, max_accept_hz] are dropped
    pub min_accept_hz: f32,
    pub max_accept_hz: f32,
    /// Trailing frequency history kept for charting
    pub history_len: usize,
    /// Analysis loop rate, one frame per display refresh
    pub analysis_fps: u32,
    /// |cents| below this is in tune
    pub in_tune_cents: i32,
    /// |cents| below this (and not in tune) is slightly off
    pub slightly_off_cents: i32,
}

impl Default for TunerConfig {
    fn default() -> Self {
        Self {
            frame_size: 4096,
            silence_threshold_db: -60.0,
            min_search_hz: 80.0,
            max_search_hz: 1000.0,
            min_accept_hz: 80.0,
            max_accept_hz: 2000.0,
            history_len: 50,
            analysis_fps: 60,
            in_tune_cents: 5,
            slightly_off_cents: 15,
        }
    }
}

/// Defaults pre-filled into the speed trainer form
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainerDefaults {
    pub start_tempo: u32,
    pub target_tempo: u32,
    pub increment_bpm: i32,
    pub interval_seconds: u32,
    pub repetitions_per_tempo: u32,
    pub pause_between_seconds: u32,
}

impl Default for TrainerDefaults {
    fn default() -> Self {
        Self {
            start_tempo: 60,
            target_tempo: 120,
            increment_bpm: 5,
            interval_seconds: 30,
            repetitions_per_tempo: 1,
            pause_between_seconds: 0,
        }
    }
}

/// Audio device configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Sample rate used to render clicks when no device is open
    pub sample_rate: u32,
    /// Capacity of the click queue feeding the output callback
    pub output_queue_len: usize,
    /// Capacity (in samples) of the ring feeding the tuner from the input callback
    pub input_ring_len: usize,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48000,
            output_queue_len: 32,
            input_ring_len: 48000,
        }
    }
}

/// Persistence location for presets, playlists and calibration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("practice_data"),
        }
    }
}

impl AppConfig {
    /// Load configuration from JSON file
    ///
    /// # Arguments
    /// * `path` - Path to JSON config file
    ///
    /// # Returns
    /// The loaded configuration, or the defaults if the file is missing or
    /// its JSON is invalid.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Self {
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(config) => {
                    log::info!("[Config] Loaded configuration from {:?}", path.as_ref());
                    config
                }
                Err(err) => {
                    log::warn!(
                        "[Config] Failed to parse JSON from {:?}: {}. Using defaults.",
                        path.as_ref(),
                        err
                    );
                    Self::default()
                }
            },
            Err(err) => {
                log::warn!(
                    "[Config] Failed to read config file {:?}: {}. Using defaults.",
                    path.as_ref(),
                    err
                );
                Self::default()
            }
        }
    }

    /// Load configuration from the default asset location
    pub fn load() -> Self {
        Self::load_from_file("assets/practice_config.json")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.metronome.default_bpm, 120);
        assert_eq!(config.metronome.default_volume, 70);
        assert_eq!(config.tuner.frame_size, 4096);
        assert_eq!(config.tuner.silence_threshold_db, -60.0);
        assert_eq!(config.tuner.history_len, 50);
        assert_eq!(config.audio.sample_rate, 48000);
    }

    #[test]
    fn test_json_roundtrip() {
        let config = AppConfig::default();
        let json = serde_json::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed.tuner.max_accept_hz, config.tuner.max_accept_hz);
        assert_eq!(parsed.metronome.default_timbre, config.metronome.default_timbre);
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let parsed: AppConfig =
            serde_json::from_str(r#"{ "tuner": { "frame_size": 2048 } }"#).unwrap();
        assert_eq!(parsed.tuner.frame_size, 2048);
        assert_eq!(parsed.tuner.history_len, 50);
        assert_eq!(parsed.metronome.default_bpm, 120);
    }

    #[test]
    fn test_shipped_asset_parses() {
        let config = AppConfig::load();
        assert_eq!(config.tuner.frame_size, 4096);
        assert_eq!(config.trainer.increment_bpm, 5);
        assert_eq!(config.metronome.default_timbre, Timbre::MetronomeBeats);
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let config = AppConfig::load_from_file("/definitely/not/here/practice_config.json");
        assert_eq!(config.metronome.default_bpm, 120);
    }
}
