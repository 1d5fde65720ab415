//! Tone synthesizer - click burst rendering for the eight timbres
//!
//! Every click is rendered offline into a short buffer and handed to the
//! output device as one burst. Rendering is a pure function of
//! (timbre, accent, volume, sample rate); the noise timbres draw from a
//! fixed-seed generator so identical requests produce identical bursts.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;

use super::dsp::{Envelope, FilterMode, Oscillator, StateVariableFilter, Waveform};
use super::output::AudioOutput;
use super::timbre::{ClickVoice, Timbre};

/// Exponential decays end on this floor instead of zero
const DECAY_FLOOR: f32 = 0.001;

/// Renders one click burst.
///
/// # Arguments
/// * `timbre` - Click sound
/// * `accent` - Whether this is the first beat of the measure
/// * `volume` - Linear gain in [0, 1], clamped
/// * `sample_rate` - Sample rate in Hz
///
/// # Returns
/// At most 100 ms of mono samples. The burst scales linearly with `volume`.
pub fn render_click(timbre: Timbre, accent: bool, volume: f32, sample_rate: u32) -> Vec<f32> {
    let volume = if volume.is_finite() {
        volume.clamp(0.0, 1.0)
    } else {
        0.0
    };
    let voice = timbre.voice(accent);
    let len = (sample_rate as f32 * timbre.duration_secs()).round() as usize;

    let mut burst = match timbre {
        Timbre::MetronomeBeats => metronome_beats(voice, len, sample_rate),
        Timbre::DryClick => dry_click(voice, len, sample_rate),
        Timbre::WoodTick => wood_tick(voice, len, sample_rate),
        Timbre::DigitalBeep => digital_beep(voice, len, sample_rate),
        Timbre::Claves => claves(voice, len, sample_rate),
        Timbre::WoodBlock => wood_block(voice, len, sample_rate),
        Timbre::ClassicTick => classic_tick(voice, len, sample_rate),
        Timbre::StudioClick => studio_click(voice, len, sample_rate),
    };

    for sample in burst.iter_mut() {
        *sample *= volume;
    }
    burst
}

#[inline]
fn time_of(index: usize, sample_rate: u32) -> f32 {
    index as f32 / sample_rate as f32
}

/// Percussive envelope: linear attack to the peak, exponential decay to the floor.
fn strike(peak: f32, attack: f32, end: f32) -> Envelope {
    Envelope::starting_at(0.0)
        .linear_to(peak, attack)
        .exponential_to(DECAY_FLOOR, end)
}

fn enveloped_oscillator(
    waveform: Waveform,
    frequency_hz: f32,
    envelope: &Envelope,
    len: usize,
    sample_rate: u32,
) -> Vec<f32> {
    let mut osc = Oscillator::new(waveform, frequency_hz, sample_rate);
    (0..len)
        .map(|i| osc.next_sample() * envelope.value_at(time_of(i, sample_rate)))
        .collect()
}

/// Triangle at f plus square at 2f, shaped by a two-stage decay and band-passed.
fn metronome_beats(voice: ClickVoice, len: usize, sample_rate: u32) -> Vec<f32> {
    let envelope = Envelope::starting_at(0.0)
        .linear_to(voice.peak_gain, 0.002)
        .linear_to(voice.peak_gain * 4.0 / 7.0, 0.01)
        .exponential_to(DECAY_FLOOR, 0.08);

    let mut body = Oscillator::new(Waveform::Triangle, voice.frequency_hz, sample_rate);
    let mut edge = Oscillator::new(Waveform::Square, voice.frequency_hz * 2.0, sample_rate);
    let mut filter = StateVariableFilter::new(
        FilterMode::BandPass,
        voice.frequency_hz * 1.5,
        2.0,
        sample_rate,
    );

    (0..len)
        .map(|i| {
            let gain = envelope.value_at(time_of(i, sample_rate));
            filter.process((body.next_sample() + edge.next_sample()) * gain)
        })
        .collect()
}

fn dry_click(voice: ClickVoice, len: usize, sample_rate: u32) -> Vec<f32> {
    let envelope = strike(voice.peak_gain, 0.001, 0.02);
    enveloped_oscillator(Waveform::Square, voice.frequency_hz, &envelope, len, sample_rate)
}

/// Decaying white noise through a high-pass at the voice frequency.
fn wood_tick(voice: ClickVoice, len: usize, sample_rate: u32) -> Vec<f32> {
    let mut rng = StdRng::seed_from_u64(42);
    let envelope = Envelope::starting_at(voice.peak_gain).exponential_to(DECAY_FLOOR, 0.05);
    let mut filter =
        StateVariableFilter::new(FilterMode::HighPass, voice.frequency_hz, 1.0, sample_rate);

    (0..len)
        .map(|i| {
            let t = time_of(i, sample_rate);
            let taper = 1.0 - i as f32 / len as f32;
            let noise: f32 = rng.gen_range(-1.0..1.0);
            filter.process(noise * taper * (-14.4 * t).exp()) * envelope.value_at(t)
        })
        .collect()
}

fn digital_beep(voice: ClickVoice, len: usize, sample_rate: u32) -> Vec<f32> {
    let envelope = Envelope::starting_at(0.0)
        .linear_to(voice.peak_gain, 0.0005)
        .linear_to(0.0, 0.01);
    enveloped_oscillator(Waveform::Square, voice.frequency_hz, &envelope, len, sample_rate)
}

/// Three triangle partials at f, 2f and 4f, each quieter than the last.
fn claves(voice: ClickVoice, len: usize, sample_rate: u32) -> Vec<f32> {
    let mut burst = vec![0.0; len];
    for partial in 0..3u8 {
        let gain = voice.peak_gain / (partial as f32 + 1.0);
        let envelope = strike(gain, 0.001, 0.03);
        let frequency = voice.frequency_hz * f32::from(1u8 << partial);
        let layer = enveloped_oscillator(Waveform::Triangle, frequency, &envelope, len, sample_rate);
        for (out, sample) in burst.iter_mut().zip(layer) {
            *out += sample;
        }
    }
    burst
}

/// Noise plus a sine at the voice frequency, then a 300 Hz high-pass.
fn wood_block(voice: ClickVoice, len: usize, sample_rate: u32) -> Vec<f32> {
    let mut rng = StdRng::seed_from_u64(42);
    let mut filter = StateVariableFilter::new(FilterMode::HighPass, 300.0, 1.0, sample_rate);
    let omega = 2.0 * std::f32::consts::PI * voice.frequency_hz;

    (0..len)
        .map(|i| {
            let t = time_of(i, sample_rate);
            let shape = (-20.0 * t).exp() * (1.0 - 8.0 * t);
            let noise: f32 = rng.gen_range(-1.0..1.0);
            let tone = (omega * t).sin() * shape * 0.7;
            filter.process((noise * shape * 0.3 + tone * 0.7) * voice.peak_gain)
        })
        .collect()
}

fn classic_tick(voice: ClickVoice, len: usize, sample_rate: u32) -> Vec<f32> {
    let envelope = strike(voice.peak_gain, 0.001, 0.05);
    let mut filter = StateVariableFilter::new(FilterMode::LowPass, 2000.0, 1.0, sample_rate);
    let mut burst =
        enveloped_oscillator(Waveform::Sawtooth, voice.frequency_hz, &envelope, len, sample_rate);
    filter.process_buffer(&mut burst);
    burst
}

fn studio_click(voice: ClickVoice, len: usize, sample_rate: u32) -> Vec<f32> {
    let envelope = strike(voice.peak_gain, 0.001, 0.03);
    enveloped_oscillator(Waveform::Sine, voice.frequency_hz, &envelope, len, sample_rate)
}

/// Plays click bursts on an output device.
///
/// Playback is fire-and-forget: a missing or closed device drops the click
/// silently and never surfaces an error to the beat ticker.
pub struct ToneSynthesizer {
    output: Arc<dyn AudioOutput>,
}

impl ToneSynthesizer {
    pub fn new(output: Arc<dyn AudioOutput>) -> Self {
        Self { output }
    }

    pub fn sample_rate(&self) -> u32 {
        self.output.sample_rate()
    }

    /// Renders and queues one click.
    ///
    /// `volume` is the 0-100 user volume.
    pub fn play(&self, timbre: Timbre, volume: u8, accent: bool) {
        if !self.output.is_available() {
            tracing::debug!("[ToneSynthesizer] Output unavailable, dropping click");
            return;
        }
        let gain = f32::from(volume.min(100)) / 100.0;
        let burst = render_click(timbre, accent, gain, self.output.sample_rate());
        self.output.submit(burst);
    }
}
