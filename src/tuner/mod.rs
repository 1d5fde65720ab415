// Tuner - autocorrelation pitch detection under a calibrated A4

pub mod autocorrelation;
pub mod calibration;
pub mod detector;
pub mod history;
pub mod listener;
pub mod note;

pub use calibration::{CalibrationState, DEFAULT_A4_HZ, MAX_A4_HZ, MIN_A4_HZ};
pub use detector::{FrameAnalysis, PitchDetector, TunerReading};
pub use history::FrequencyHistory;
pub use listener::{Tuner, TunerSnapshot, TunerStatus};
pub use note::{frequency_to_note, note_frequency, Deviation, NoteName, PitchSample, TuningStatus};
