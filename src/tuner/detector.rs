//! PitchDetector - per-frame analysis pipeline
//!
//! Loudness gate, autocorrelation, acceptance band, note mapping under the
//! current A4, tuning classification, then the frequency trace.

use serde::Serialize;

use super::autocorrelation::{detect_pitch, level_db};
use super::history::FrequencyHistory;
use super::note::{frequency_to_note, PitchSample, TuningStatus};
use crate::config::TunerConfig;

/// A pitched frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TunerReading {
    pub sample: PitchSample,
    pub status: TuningStatus,
    pub level_db: f32,
    pub a4_hz: f32,
}

/// Outcome of analysing one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FrameAnalysis {
    /// Below the silence threshold; indicators go idle
    Silent { level_db: f32 },
    /// Loud enough, but no frequency inside the acceptance band
    Unpitched { level_db: f32 },
    Pitched(TunerReading),
}

pub struct PitchDetector {
    config: TunerConfig,
    history: FrequencyHistory,
}

impl PitchDetector {
    pub fn new(config: TunerConfig) -> Self {
        let history = FrequencyHistory::new(config.history_len);
        Self { config, history }
    }

    pub fn history(&self) -> &FrequencyHistory {
        &self.history
    }

    pub fn frame_size(&self) -> usize {
        self.config.frame_size
    }

    pub fn reset(&mut self) {
        self.history.clear();
    }

    pub fn analyze(&mut self, frame: &[f32], sample_rate: u32, a4_hz: f32) -> FrameAnalysis {
        let level_db = level_db(frame);
        if level_db < self.config.silence_threshold_db {
            return FrameAnalysis::Silent { level_db };
        }

        let accepted = detect_pitch(
            frame,
            sample_rate,
            self.config.min_search_hz,
            self.config.max_search_hz,
        )
        .filter(|f| (self.config.min_accept_hz..=self.config.max_accept_hz).contains(f));

        let Some(sample) = accepted.and_then(|f| frequency_to_note(f, a4_hz)) else {
            return FrameAnalysis::Unpitched { level_db };
        };

        self.history.push(sample.frequency_hz);
        let status = TuningStatus::classify(
            sample.cents,
            self.config.in_tune_cents,
            self.config.slightly_off_cents,
        );
        tracing::debug!(
            "[PitchDetector] {:.1} Hz -> {}{} {:+} cents",
            sample.frequency_hz,
            sample.note,
            sample.octave,
            sample.cents
        );

        FrameAnalysis::Pitched(TunerReading {
            sample,
            status,
            level_db,
            a4_hz,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tuner::NoteName;
    use std::f32::consts::PI;

    fn sine(frequency: f32, amplitude: f32) -> Vec<f32> {
        (0..4096)
            .map(|i| amplitude * (2.0 * PI * frequency * i as f32 / 48000.0).sin())
            .collect()
    }

    #[test]
    fn test_quiet_frame_is_silent() {
        let mut detector = PitchDetector::new(TunerConfig::default());
        // 0.0005 peak is about -69 dBFS RMS
        let result = detector.analyze(&sine(440.0, 0.0005), 48000, 440.0);
        assert!(matches!(result, FrameAnalysis::Silent { .. }));
        assert!(detector.history().is_empty());
    }

    #[test]
    fn test_pitched_frame_maps_to_note() {
        let mut detector = PitchDetector::new(TunerConfig::default());
        let result = detector.analyze(&sine(196.0, 0.5), 48000, 440.0);
        match result {
            FrameAnalysis::Pitched(reading) => {
                assert_eq!(reading.sample.note, NoteName::G);
                assert_eq!(reading.sample.octave, 3);
                assert_eq!(reading.status, TuningStatus::InTune);
            }
            other => panic!("Expected pitched frame, got {:?}", other),
        }
        assert_eq!(detector.history().len(), 1);
    }

    #[test]
    fn test_reference_pitch_shifts_cents() {
        let mut detector = PitchDetector::new(TunerConfig::default());
        let frame = sine(440.0, 0.5);
        let FrameAnalysis::Pitched(at_440) = detector.analyze(&frame, 48000, 440.0) else {
            panic!("Expected pitched frame");
        };
        let FrameAnalysis::Pitched(at_432) = detector.analyze(&frame, 48000, 432.0) else {
            panic!("Expected pitched frame");
        };
        assert!(at_432.sample.cents > at_440.sample.cents + 25);
    }

    #[test]
    fn test_history_bounded() {
        let mut detector = PitchDetector::new(TunerConfig::default());
        let frame = sine(330.0, 0.5);
        for _ in 0..55 {
            detector.analyze(&frame, 48000, 440.0);
        }
        assert_eq!(detector.history().len(), 50);
    }

    #[test]
    fn test_noise_without_pitch_is_unpitched() {
        let mut detector = PitchDetector::new(TunerConfig::default());
        // Constant offset: loud but never decorrelates
        let result = detector.analyze(&[0.3; 4096], 48000, 440.0);
        assert!(matches!(result, FrameAnalysis::Unpitched { .. }));
    }
}
