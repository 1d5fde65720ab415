//! Offline rendering of clicks and click tracks to WAV files
//!
//! Lets a user audition every timbre without a sound card. The click track
//! places each burst on a sample-accurate beat grid.

use hound::{SampleFormat, WavSpec, WavWriter};
use std::path::Path;

use super::synth::render_click;
use crate::metronome::{samples_per_beat, BeatState, TempoConfig};

fn spec(sample_rate: u32) -> WavSpec {
    WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 32,
        sample_format: SampleFormat::Float,
    }
}

/// Mixes `measures` bars of clicks for `tempo` into one buffer.
pub fn render_click_track(tempo: &TempoConfig, measures: u32, sample_rate: u32) -> Vec<f32> {
    let bpm = tempo.bpm().max(1);
    let spb = samples_per_beat(bpm, sample_rate) as usize;
    let beats = measures as u64 * u64::from(tempo.time_signature.beats_per_measure);
    let gain = f32::from(tempo.volume) / 100.0;

    let mut track = vec![0.0f32; spb * beats as usize];
    let mut state = BeatState::new(tempo.time_signature.beats_per_measure);

    for beat in 0..beats as usize {
        let event = state.advance(bpm);
        let burst = render_click(tempo.timbre, event.accent, gain, sample_rate);
        let offset = beat * spb;
        for (out, s) in track[offset..].iter_mut().zip(burst) {
            *out = (*out + s).clamp(-1.0, 1.0);
        }
    }
    track
}

/// Writes mono float samples to a WAV file.
pub fn write_wav<P: AsRef<Path>>(path: P, samples: &[f32], sample_rate: u32) -> hound::Result<()> {
    let mut writer = WavWriter::create(path, spec(sample_rate))?;
    for &s in samples {
        writer.write_sample(s)?;
    }
    writer.finalize()
}
