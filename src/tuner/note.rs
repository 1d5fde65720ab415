//! Frequency to note conversion under an adjustable A4 reference.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The twelve pitch classes, starting at C.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NoteName {
    C,
    CSharp,
    D,
    DSharp,
    E,
    F,
    FSharp,
    G,
    GSharp,
    A,
    ASharp,
    B,
}

impl NoteName {
    pub const ALL: [NoteName; 12] = [
        NoteName::C,
        NoteName::CSharp,
        NoteName::D,
        NoteName::DSharp,
        NoteName::E,
        NoteName::F,
        NoteName::FSharp,
        NoteName::G,
        NoteName::GSharp,
        NoteName::A,
        NoteName::ASharp,
        NoteName::B,
    ];

    /// Semitones above C.
    pub fn index(self) -> i32 {
        self as i32
    }

    pub fn symbol(self) -> &'static str {
        match self {
            NoteName::C => "C",
            NoteName::CSharp => "C#",
            NoteName::D => "D",
            NoteName::DSharp => "D#",
            NoteName::E => "E",
            NoteName::F => "F",
            NoteName::FSharp => "F#",
            NoteName::G => "G",
            NoteName::GSharp => "G#",
            NoteName::A => "A",
            NoteName::ASharp => "A#",
            NoteName::B => "B",
        }
    }
}

impl fmt::Display for NoteName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// One detected pitch.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PitchSample {
    pub frequency_hz: f32,
    pub note: NoteName,
    pub octave: i32,
    /// Offset from the nearest note, -50..=50
    pub cents: i32,
}

/// Rounds to the nearest integer, ties toward positive infinity.
fn round_half_up(value: f64) -> i32 {
    (value + 0.5).floor() as i32
}

/// Maps a frequency to the nearest note.
///
/// semitones = round(12·log2(f / a4)), ties rounding up; the note is (semitones + 9) mod 12
/// counted from C, and the octave is floor((semitones + 9) / 12) + 4.
///
/// Returns `None` for non-positive or non-finite input.
pub fn frequency_to_note(frequency_hz: f32, a4_hz: f32) -> Option<PitchSample> {
    if !(frequency_hz.is_finite() && frequency_hz > 0.0 && a4_hz.is_finite() && a4_hz > 0.0) {
        return None;
    }

    let exact = 12.0 * (f64::from(frequency_hz) / f64::from(a4_hz)).log2();
    let semitones = round_half_up(exact);
    let cents = round_half_up(100.0 * (exact - f64::from(semitones)));

    let from_c = semitones + 9;
    Some(PitchSample {
        frequency_hz,
        note: NoteName::ALL[from_c.rem_euclid(12) as usize],
        octave: from_c.div_euclid(12) + 4,
        cents,
    })
}

/// Frequency of `note` in `octave` under the given A4.
pub fn note_frequency(note: NoteName, octave: i32, a4_hz: f32) -> f32 {
    let semitones = (octave - 4) * 12 + note.index() - 9;
    a4_hz * 2f32.powf(semitones as f32 / 12.0)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Deviation {
    Sharp,
    Flat,
}

/// How close a reading is to its note.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "deviation", rename_all = "snake_case")]
pub enum TuningStatus {
    InTune,
    SlightlyOff(Deviation),
    FarOff(Deviation),
}

impl TuningStatus {
    /// |cents| < in_tune → in tune; < slightly_off → slightly off; otherwise far off.
    pub fn classify(cents: i32, in_tune: i32, slightly_off: i32) -> Self {
        let deviation = if cents > 0 {
            Deviation::Sharp
        } else {
            Deviation::Flat
        };
        let magnitude = cents.abs();
        if magnitude < in_tune {
            TuningStatus::InTune
        } else if magnitude < slightly_off {
            TuningStatus::SlightlyOff(deviation)
        } else {
            TuningStatus::FarOff(deviation)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn note(f: f32) -> PitchSample {
        frequency_to_note(f, 440.0).unwrap()
    }

    #[test]
    fn test_reference_points() {
        let a4 = note(440.0);
        assert_eq!((a4.note, a4.octave, a4.cents), (NoteName::A, 4, 0));

        let a3 = note(220.0);
        assert_eq!((a3.note, a3.octave, a3.cents), (NoteName::A, 3, 0));

        let c4 = note(261.63);
        assert_eq!((c4.note, c4.octave), (NoteName::C, 4));
        assert!(c4.cents.abs() <= 1, "Middle C within 1 cent, got {}", c4.cents);
    }

    #[test]
    fn test_octave_boundary_matches_scientific_pitch() {
        // B3 and C4 sit on either side of the octave change
        let b3 = note(246.94);
        assert_eq!((b3.note, b3.octave), (NoteName::B, 3));
        let c4 = note(261.63);
        assert_eq!((c4.note, c4.octave), (NoteName::C, 4));
        let b4 = note(493.88);
        assert_eq!((b4.note, b4.octave), (NoteName::B, 4));
        let c5 = note(523.25);
        assert_eq!((c5.note, c5.octave), (NoteName::C, 5));
        // Low E string and high E string
        let e2 = note(82.41);
        assert_eq!((e2.note, e2.octave), (NoteName::E, 2));
        let e4 = note(329.63);
        assert_eq!((e4.note, e4.octave), (NoteName::E, 4));
    }

    #[test]
    fn test_cents_sign() {
        assert!(note(445.0).cents > 0);
        assert!(note(435.0).cents < 0);
        assert_eq!(note(445.0).note, NoteName::A);
    }

    #[test]
    fn test_other_reference_pitch() {
        let sample = frequency_to_note(432.0, 432.0).unwrap();
        assert_eq!((sample.note, sample.octave, sample.cents), (NoteName::A, 4, 0));

        // 440 is about +32 cents above A under A4=432
        let sample = frequency_to_note(440.0, 432.0).unwrap();
        assert_eq!(sample.note, NoteName::A);
        assert_eq!(sample.cents, 32);
    }

    #[test]
    fn test_half_semitone_ties_round_up() {
        assert_eq!(round_half_up(-0.5), 0);
        assert_eq!(round_half_up(0.5), 1);
        assert_eq!(round_half_up(-1.5), -1);
        assert_eq!(round_half_up(-49.5), -49);
        assert_eq!(round_half_up(2.4), 2);
        assert_eq!(round_half_up(-2.6), -3);
    }

    #[test]
    fn test_quarter_tone_below_a4_stays_on_a() {
        // 0.4 semitone below A4 is still A, flat
        let sample = note(440.0 * 2f32.powf(-0.4 / 12.0));
        assert_eq!((sample.note, sample.octave), (NoteName::A, 4));
        assert_eq!(sample.cents, -40);

        // 0.6 below crosses to G#
        let sample = note(440.0 * 2f32.powf(-0.6 / 12.0));
        assert_eq!((sample.note, sample.octave), (NoteName::GSharp, 4));
        assert_eq!(sample.cents, 40);
    }

    #[test]
    fn test_invalid_input() {
        assert!(frequency_to_note(0.0, 440.0).is_none());
        assert!(frequency_to_note(-5.0, 440.0).is_none());
        assert!(frequency_to_note(f32::NAN, 440.0).is_none());
    }

    #[test]
    fn test_note_frequency_inverts_mapping() {
        for a4 in [432.0, 440.0, 445.0] {
            for octave in 2..6 {
                for name in NoteName::ALL {
                    let f = note_frequency(name, octave, a4);
                    let sample = frequency_to_note(f, a4).unwrap();
                    assert_eq!(
                        (sample.note, sample.octave),
                        (name, octave),
                        "{}{} at A4={}",
                        name,
                        octave,
                        a4
                    );
                    assert_eq!(sample.cents, 0);
                }
            }
        }
    }

    #[test]
    fn test_classification_thresholds() {
        assert_eq!(TuningStatus::classify(0, 5, 15), TuningStatus::InTune);
        assert_eq!(TuningStatus::classify(-4, 5, 15), TuningStatus::InTune);
        assert_eq!(
            TuningStatus::classify(5, 5, 15),
            TuningStatus::SlightlyOff(Deviation::Sharp)
        );
        assert_eq!(
            TuningStatus::classify(-14, 5, 15),
            TuningStatus::SlightlyOff(Deviation::Flat)
        );
        assert_eq!(
            TuningStatus::classify(15, 5, 15),
            TuningStatus::FarOff(Deviation::Sharp)
        );
        assert_eq!(
            TuningStatus::classify(-40, 5, 15),
            TuningStatus::FarOff(Deviation::Flat)
        );
    }
}
