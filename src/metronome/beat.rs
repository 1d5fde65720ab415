//! Beat grid arithmetic and the running beat counter.

use serde::Serialize;
use std::time::Duration;

use crate::error::AudioError;

/// Time between beats: 60000 / bpm milliseconds.
///
/// # Errors
/// `BpmInvalid` for a zero tempo.
pub fn beat_interval(bpm: u32) -> Result<Duration, AudioError> {
    if bpm == 0 {
        return Err(AudioError::BpmInvalid { bpm: 0 });
    }
    Ok(Duration::from_secs_f64(60.0 / f64::from(bpm)))
}

/// Converts BPM to samples per beat: (sample_rate × 60) / BPM.
///
/// ```
/// use string_practice::metronome::samples_per_beat;
/// assert_eq!(samples_per_beat(120, 48000), 24000);
/// ```
#[inline]
pub fn samples_per_beat(bpm: u32, sample_rate: u32) -> u64 {
    (sample_rate as u64 * 60) / bpm as u64
}

/// One emitted beat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BeatEvent {
    /// Beats since start, 0-based
    pub beat_index: u64,
    /// Position in the measure, 0-based
    pub beat_in_measure: u8,
    pub beats_per_measure: u8,
    /// First beat of each measure
    pub accent: bool,
    pub bpm: u32,
}

/// Counts beats since the scheduler was started.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BeatState {
    beat_index: u64,
    beats_per_measure: u8,
}

impl BeatState {
    pub fn new(beats_per_measure: u8) -> Self {
        Self {
            beat_index: 0,
            beats_per_measure: beats_per_measure.max(1),
        }
    }

    /// Index the next emitted beat will carry.
    pub fn beat_index(&self) -> u64 {
        self.beat_index
    }

    pub fn beats_per_measure(&self) -> u8 {
        self.beats_per_measure
    }

    /// Position in the measure of the next beat.
    pub fn beat_in_measure(&self) -> u8 {
        (self.beat_index % u64::from(self.beats_per_measure)) as u8
    }

    /// Emit the current beat and move to the next.
    pub fn advance(&mut self, bpm: u32) -> BeatEvent {
        let beat_in_measure = self.beat_in_measure();
        let event = BeatEvent {
            beat_index: self.beat_index,
            beat_in_measure,
            beats_per_measure: self.beats_per_measure,
            accent: beat_in_measure == 0,
            bpm,
        };
        self.beat_index += 1;
        event
    }

    pub fn reset(&mut self) {
        self.beat_index = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_beat_interval() {
        assert_eq!(beat_interval(120).unwrap(), Duration::from_millis(500));
        assert_eq!(beat_interval(60).unwrap(), Duration::from_secs(1));
        assert_eq!(
            beat_interval(0).unwrap_err(),
            AudioError::BpmInvalid { bpm: 0 }
        );
    }

    #[test]
    fn test_samples_per_beat_formula() {
        assert_eq!(samples_per_beat(120, 48000), 24000);
        assert_eq!(samples_per_beat(60, 48000), 48000);
        assert_eq!(samples_per_beat(100, 44100), 26460);
    }

    #[test]
    fn test_accent_every_measure() {
        let mut state = BeatState::new(3);
        let accents: Vec<bool> = (0..7).map(|_| state.advance(90).accent).collect();
        assert_eq!(accents, vec![true, false, false, true, false, false, true]);
        assert_eq!(state.beat_index(), 7);
    }

    #[test]
    fn test_four_four_sequence() {
        let mut state = BeatState::new(4);
        let positions: Vec<u8> = (0..8).map(|_| state.advance(120).beat_in_measure).collect();
        assert_eq!(positions, vec![0, 1, 2, 3, 0, 1, 2, 3]);
    }

    #[test]
    fn test_reset_returns_to_downbeat() {
        let mut state = BeatState::new(4);
        state.advance(120);
        state.advance(120);
        state.reset();
        let event = state.advance(120);
        assert_eq!(event.beat_index, 0);
        assert!(event.accent);
    }
}
