//! Small synthesis primitives shared by the click timbres.
//!
//! Oscillators are phase accumulators, envelopes are breakpoint curves with
//! linear or exponential ramps, and filtering uses a Chamberlin
//! state-variable filter.

use std::f32::consts::PI;

/// Basic oscillator shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Waveform {
    Sine,
    Square,
    Triangle,
    Sawtooth,
}

impl Waveform {
    /// Value of the waveform at `phase` in [0, 1).
    #[inline]
    pub fn at(self, phase: f32) -> f32 {
        match self {
            Waveform::Sine => (2.0 * PI * phase).sin(),
            Waveform::Square => {
                if phase < 0.5 {
                    1.0
                } else {
                    -1.0
                }
            }
            Waveform::Triangle => {
                if phase < 0.25 {
                    4.0 * phase
                } else if phase < 0.75 {
                    2.0 - 4.0 * phase
                } else {
                    4.0 * phase - 4.0
                }
            }
            Waveform::Sawtooth => 2.0 * phase - 1.0,
        }
    }
}

/// Fixed-frequency phase accumulator.
#[derive(Debug, Clone, Copy)]
pub struct Oscillator {
    waveform: Waveform,
    phase: f32,
    increment: f32,
}

impl Oscillator {
    pub fn new(waveform: Waveform, frequency_hz: f32, sample_rate: u32) -> Self {
        Self {
            waveform,
            phase: 0.0,
            increment: frequency_hz / sample_rate as f32,
        }
    }

    #[inline]
    pub fn next_sample(&mut self) -> f32 {
        let value = self.waveform.at(self.phase);
        self.phase += self.increment;
        if self.phase >= 1.0 {
            self.phase -= self.phase.floor();
        }
        value
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Ramp {
    Linear,
    Exponential,
}

#[derive(Debug, Clone, Copy)]
struct Segment {
    end_time: f32,
    target: f32,
    ramp: Ramp,
}

/// Gain curve built from breakpoints, holding the last value after the final one.
#[derive(Debug, Clone)]
pub struct Envelope {
    initial: f32,
    segments: Vec<Segment>,
}

impl Envelope {
    pub fn starting_at(value: f32) -> Self {
        Self {
            initial: value,
            segments: Vec::new(),
        }
    }

    /// Ramp linearly to `target`, arriving at `time` seconds.
    pub fn linear_to(mut self, target: f32, time: f32) -> Self {
        self.segments.push(Segment {
            end_time: time,
            target,
            ramp: Ramp::Linear,
        });
        self
    }

    /// Ramp exponentially to `target`, arriving at `time` seconds.
    ///
    /// Falls back to a linear ramp when either end is not strictly positive.
    pub fn exponential_to(mut self, target: f32, time: f32) -> Self {
        self.segments.push(Segment {
            end_time: time,
            target,
            ramp: Ramp::Exponential,
        });
        self
    }

    pub fn value_at(&self, time: f32) -> f32 {
        let mut start_time = 0.0;
        let mut start_value = self.initial;

        for segment in &self.segments {
            if time < segment.end_time {
                let span = segment.end_time - start_time;
                if span <= 0.0 {
                    return segment.target;
                }
                let progress = ((time - start_time) / span).clamp(0.0, 1.0);
                let exponential = segment.ramp == Ramp::Exponential
                    && start_value > 0.0
                    && segment.target > 0.0;
                return if exponential {
                    start_value * (segment.target / start_value).powf(progress)
                } else {
                    start_value + (segment.target - start_value) * progress
                };
            }
            start_time = segment.end_time;
            start_value = segment.target;
        }

        start_value
    }

    /// Highest breakpoint value.
    pub fn peak(&self) -> f32 {
        self.segments
            .iter()
            .map(|s| s.target)
            .fold(self.initial, f32::max)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterMode {
    LowPass,
    HighPass,
    BandPass,
}

/// Chamberlin state-variable filter.
pub struct StateVariableFilter {
    mode: FilterMode,
    f: f32,
    damping: f32,
    low: f32,
    band: f32,
}

impl StateVariableFilter {
    /// Cutoff is limited to a sixth of the sample rate, where the structure stays stable.
    pub fn new(mode: FilterMode, cutoff_hz: f32, q: f32, sample_rate: u32) -> Self {
        let cutoff = cutoff_hz.clamp(1.0, sample_rate as f32 / 6.0);
        Self {
            mode,
            f: 2.0 * (PI * cutoff / sample_rate as f32).sin(),
            damping: 1.0 / q.max(0.5),
            low: 0.0,
            band: 0.0,
        }
    }

    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        self.low += self.f * self.band;
        let high = input - self.low - self.damping * self.band;
        self.band += self.f * high;

        match self.mode {
            FilterMode::LowPass => self.low,
            FilterMode::HighPass => high,
            FilterMode::BandPass => self.band,
        }
    }

    pub fn process_buffer(&mut self, buffer: &mut [f32]) {
        for sample in buffer.iter_mut() {
            *sample = self.process(*sample);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_waveforms_stay_in_range() {
        for waveform in [
            Waveform::Sine,
            Waveform::Square,
            Waveform::Triangle,
            Waveform::Sawtooth,
        ] {
            for i in 0..100 {
                let v = waveform.at(i as f32 / 100.0);
                assert!((-1.0..=1.0).contains(&v), "{:?} out of range: {}", waveform, v);
            }
        }
    }

    #[test]
    fn test_triangle_hits_extremes() {
        assert!((Waveform::Triangle.at(0.25) - 1.0).abs() < 1e-6);
        assert!((Waveform::Triangle.at(0.75) + 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_envelope_linear_attack_then_exponential_decay() {
        let env = Envelope::starting_at(0.0)
            .linear_to(1.0, 0.001)
            .exponential_to(0.001, 0.02);

        assert_eq!(env.value_at(0.0), 0.0);
        assert!((env.value_at(0.0005) - 0.5).abs() < 1e-4);
        assert!((env.value_at(0.001) - 1.0).abs() < 1e-4);
        assert!(env.value_at(0.01) < 1.0 && env.value_at(0.01) > 0.001);
        assert!((env.value_at(0.5) - 0.001).abs() < 1e-6, "holds final value");
        assert_eq!(env.peak(), 1.0);
    }

    #[test]
    fn test_lowpass_attenuates_high_frequency() {
        let sample_rate = 48000;
        let mut filter = StateVariableFilter::new(FilterMode::LowPass, 500.0, 0.707, sample_rate);
        let mut osc = Oscillator::new(Waveform::Sine, 6000.0, sample_rate);

        let mut peak: f32 = 0.0;
        for i in 0..4800 {
            let y = filter.process(osc.next_sample());
            if i > 2400 {
                peak = peak.max(y.abs());
            }
        }
        assert!(peak < 0.2, "6 kHz through 500 Hz low-pass should be quiet, got {}", peak);
    }
}
