//! # Musical Tuning Module
//!
//! Maps a frequency to its nearest equal-tempered note relative to a
//! configurable A4 reference pitch, and measures how far off it is in cents.
//!
//! ## Features
//! - Bounded A4 reference pitch (400-480 Hz, default 440 Hz)
//! - Frequency to note name, octave and cent deviation
//! - Note to exact equal-tempered frequency
//! - Quality tier and "in tune" flag for every reading

use crate::error::TunerError;
use crate::quality::{QualityThresholds, TuningQuality};
use serde::{Deserialize, Serialize};
use std::fmt;

/// MIDI note number of A4.
const A4_MIDI: i32 = 69;

/// The A4 calibration frequency.
///
/// Always strictly positive and within [`ReferencePitch::MIN`]..=[`ReferencePitch::MAX`].
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f32", into = "f32")]
pub struct ReferencePitch(f32);

impl ReferencePitch {
    pub const MIN: f32 = 400.0;
    pub const MAX: f32 = 480.0;
    pub const STANDARD: ReferencePitch = ReferencePitch(440.0);

    pub fn new(hz: f32) -> Result<Self, TunerError> {
        if hz.is_finite() && (Self::MIN..=Self::MAX).contains(&hz) {
            Ok(Self(hz))
        } else {
            Err(TunerError::ReferencePitchOutOfRange {
                hz,
                min: Self::MIN,
                max: Self::MAX,
            })
        }
    }

    pub fn hz(self) -> f32 {
        self.0
    }
}

impl Default for ReferencePitch {
    fn default() -> Self {
        Self::STANDARD
    }
}

impl TryFrom<f32> for ReferencePitch {
    type Error = TunerError;

    fn try_from(hz: f32) -> Result<Self, Self::Error> {
        Self::new(hz)
    }
}

impl From<ReferencePitch> for f32 {
    fn from(pitch: ReferencePitch) -> Self {
        pitch.0
    }
}

/// One of the twelve equal-tempered pitch classes, starting at C.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PitchClass {
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

impl PitchClass {
    pub const ALL: [PitchClass; 12] = [
        PitchClass::C,
        PitchClass::CSharp,
        PitchClass::D,
        PitchClass::DSharp,
        PitchClass::E,
        PitchClass::F,
        PitchClass::FSharp,
        PitchClass::G,
        PitchClass::GSharp,
        PitchClass::A,
        PitchClass::ASharp,
        PitchClass::B,
    ];

    /// Looks up a pitch class by semitone index; wraps modulo 12.
    pub fn from_index(index: i32) -> Self {
        Self::ALL[index.rem_euclid(12) as usize]
    }

    /// Semitone index, C = 0 through B = 11.
    pub fn index(self) -> i32 {
        self as i32
    }

    pub fn name(self) -> &'static str {
        match self {
            PitchClass::C => "C",
            PitchClass::CSharp => "C#",
            PitchClass::D => "D",
            PitchClass::DSharp => "D#",
            PitchClass::E => "E",
            PitchClass::F => "F",
            PitchClass::FSharp => "F#",
            PitchClass::G => "G",
            PitchClass::GSharp => "G#",
            PitchClass::A => "A",
            PitchClass::ASharp => "A#",
            PitchClass::B => "B",
        }
    }
}

impl fmt::Display for PitchClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The musical interpretation of a single frequency.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoteReading {
    /// Nearest pitch class, or `None` when nothing was detected.
    pub pitch_class: Option<PitchClass>,
    pub octave: i32,
    /// Signed deviation from the nearest semitone (positive = sharp).
    pub cents: f32,
    pub in_tune: bool,
    pub quality: TuningQuality,
}

impl NoteReading {
    /// The neutral reading reported when there is no pitch.
    pub const fn undefined() -> Self {
        Self {
            pitch_class: None,
            octave: 0,
            cents: 0.0,
            in_tune: false,
            quality: TuningQuality::Poor,
        }
    }

    pub fn is_defined(&self) -> bool {
        self.pitch_class.is_some()
    }

    /// Scientific pitch name such as `A4` or `C#3`; `--` when undefined.
    pub fn name(&self) -> String {
        match self.pitch_class {
            Some(pitch_class) => format!("{}{}", pitch_class, self.octave),
            None => "--".to_string(),
        }
    }

    /// Replaces the cents deviation and re-derives the quality from it.
    pub fn with_cents(self, cents: f32, thresholds: &QualityThresholds) -> Self {
        if !self.is_defined() {
            return self;
        }
        let quality = thresholds.classify(cents);
        Self {
            cents,
            quality,
            in_tune: quality.is_in_tune(),
            ..self
        }
    }
}

impl Default for NoteReading {
    fn default() -> Self {
        Self::undefined()
    }
}

/// Continuous MIDI-style note number of a frequency (A4 = 69).
pub fn note_number(freq: f32, reference: ReferencePitch) -> f32 {
    12.0 * (freq / reference.hz()).log2() + A4_MIDI as f32
}

/// Maps a frequency to its nearest note using the default quality thresholds.
pub fn map_note(freq: f32, reference: ReferencePitch) -> NoteReading {
    map_note_with(freq, reference, &QualityThresholds::default())
}

/// Maps a frequency to its nearest note.
///
/// Frequencies that are not strictly positive and finite produce
/// [`NoteReading::undefined`], which callers treat as "nothing detected".
pub fn map_note_with(
    freq: f32,
    reference: ReferencePitch,
    thresholds: &QualityThresholds,
) -> NoteReading {
    if !(freq.is_finite() && freq > 0.0) {
        return NoteReading::undefined();
    }

    let n = note_number(freq, reference);
    let nearest = n.round();
    let cents = (n - nearest) * 100.0;
    let midi = nearest as i32;
    let quality = thresholds.classify(cents);

    NoteReading {
        pitch_class: Some(PitchClass::from_index(midi)),
        octave: midi.div_euclid(12) - 1,
        cents,
        in_tune: quality.is_in_tune(),
        quality,
    }
}

/// Exact equal-tempered frequency of a note for the given reference.
pub fn note_frequency(pitch_class: PitchClass, octave: i32, reference: ReferencePitch) -> f32 {
    let midi = (octave + 1) * 12 + pitch_class.index();
    reference.hz() * 2.0_f32.powf((midi - A4_MIDI) as f32 / 12.0)
}

/// Calculates the deviation from a target frequency in cents.
///
/// - 100 cents = 1 semitone
/// - 1200 cents = 1 octave
/// - Positive values indicate sharpness, negative values indicate flatness
pub fn calculate_cents_deviation(freq: f32, target_freq: f32) -> f32 {
    1200.0 * (freq / target_freq).log2()
}

#[cfg(test)]
mod tests {
    use super::*;

    const A440: ReferencePitch = ReferencePitch::STANDARD;

    #[test]
    fn maps_concert_a() {
        let reading = map_note(440.0, A440);
        assert_eq!(reading.pitch_class, Some(PitchClass::A));
        assert_eq!(reading.octave, 4);
        assert!(reading.cents.abs() < 0.01);
        assert_eq!(reading.quality, TuningQuality::Excellent);
        assert!(reading.in_tune);
        assert_eq!(reading.name(), "A4");
    }

    #[test]
    fn maps_sharps_and_lower_octaves() {
        let a_sharp = map_note(466.16, A440);
        assert_eq!(a_sharp.name(), "A#4");
        assert!(a_sharp.cents.abs() < 0.1);

        let a3 = map_note(220.0, A440);
        assert_eq!(a3.name(), "A3");
        assert!(a3.cents.abs() < 0.01);
    }

    #[test]
    fn octave_changes_at_c() {
        assert_eq!(map_note(261.63, A440).name(), "C4");
        assert_eq!(map_note(246.94, A440).name(), "B3");
        assert_eq!(map_note(32.70, A440).name(), "C1");
        assert_eq!(map_note(4186.01, A440).name(), "C8");
    }

    #[test]
    fn cents_sign_convention() {
        let sharp = map_note(440.0 * 1.01, A440);
        assert_eq!(sharp.pitch_class, Some(PitchClass::A));
        assert!((sharp.cents - 17.23).abs() < 0.1, "cents = {}", sharp.cents);

        let flat = map_note(440.0 * 0.99, A440);
        assert_eq!(flat.pitch_class, Some(PitchClass::A));
        assert!((flat.cents + 17.4).abs() < 0.1, "cents = {}", flat.cents);
        assert_eq!(flat.quality, TuningQuality::Poor);
        assert!(!flat.in_tune);
    }

    #[test]
    fn non_positive_frequency_is_undefined() {
        for freq in [0.0, -440.0, f32::NAN, f32::INFINITY] {
            let reading = map_note(freq, A440);
            assert_eq!(reading, NoteReading::undefined());
            assert_eq!(reading.name(), "--");
            assert!(!reading.in_tune);
        }
    }

    #[test]
    fn reference_pitch_shifts_the_grid() {
        let reference = ReferencePitch::new(442.0).unwrap();
        let reading = map_note(442.0, reference);
        assert_eq!(reading.name(), "A4");
        assert!(reading.cents.abs() < 0.01);

        let against_standard = map_note(442.0, A440);
        assert!((against_standard.cents - 7.85).abs() < 0.05);
    }

    #[test]
    fn reference_pitch_is_bounded() {
        assert!(ReferencePitch::new(400.0).is_ok());
        assert!(ReferencePitch::new(480.0).is_ok());
        assert!(ReferencePitch::new(399.9).is_err());
        assert!(ReferencePitch::new(0.0).is_err());
        assert!(ReferencePitch::new(f32::NAN).is_err());
        assert_eq!(ReferencePitch::default().hz(), 440.0);
    }

    #[test]
    fn note_frequency_inverts_mapping() {
        for pitch_class in PitchClass::ALL {
            for octave in 1..8 {
                let freq = note_frequency(pitch_class, octave, A440);
                let reading = map_note(freq, A440);
                assert_eq!(reading.pitch_class, Some(pitch_class));
                assert_eq!(reading.octave, octave);
                assert!(reading.cents.abs() < 0.05);
            }
        }
        assert!((note_frequency(PitchClass::C, 4, A440) - 261.6256).abs() < 0.01);
    }

    #[test]
    fn with_cents_rederives_quality() {
        let thresholds = QualityThresholds::default();
        let reading = map_note(440.0, A440).with_cents(12.0, &thresholds);
        assert_eq!(reading.quality, TuningQuality::Acceptable);
        assert!(reading.in_tune);
        assert_eq!(NoteReading::undefined().with_cents(1.0, &thresholds), NoteReading::undefined());
    }

    #[test]
    fn cents_between_frequencies() {
        assert!((calculate_cents_deviation(880.0, 440.0) - 1200.0).abs() < 1e-3);
        assert!(calculate_cents_deviation(439.0, 440.0) < 0.0);
    }
}
