// Metronome - tempo model, beat grid and the periodic beat ticker

pub mod beat;
pub mod scheduler;
pub mod tap;
pub mod tempo;

pub use beat::{beat_interval, samples_per_beat, BeatEvent, BeatState};
pub use scheduler::{BeatScheduler, BeatSnapshot};
pub use tap::TapTempo;
pub use tempo::{clamp_bpm, TempoConfig, TempoMarking, TimeSignature, MAX_BPM, MIN_BPM};
