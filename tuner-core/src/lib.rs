// tuner-core/src/lib.rs

//! The core logic for the practice tuner.
//! This crate is responsible for audio capture, pitch detection,
//! note mapping, smoothing and tuning-quality classification. It is
//! completely headless and contains no UI code.

pub mod audio;
pub mod config;
pub mod error;
pub mod pitch;
pub mod quality;
pub mod scheduler;
pub mod session;
pub mod signal;
pub mod smoothing;
pub mod tuning;
pub mod wav;

pub use audio::{AudioFrame, AudioInput, FrameStream, MicrophoneInput};
pub use config::TunerConfig;
pub use error::TunerError;
pub use quality::TuningQuality;
pub use session::{SmootherState, Tuner};
pub use tuning::{NoteReading, PitchClass, ReferencePitch};

/// The result of a single analysis tick, handed to the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TunerReading {
    /// Smoothed fundamental frequency in Hz.
    pub frequency: Option<f32>,
    /// The detector's unsmoothed estimate for this frame.
    pub raw_frequency: Option<f32>,
    /// Note, octave, smoothed cents and quality.
    pub note: NoteReading,
}

impl TunerReading {
    /// The reading for a frame with no detectable pitch.
    pub const fn silent() -> Self {
        Self {
            frequency: None,
            raw_frequency: None,
            note: NoteReading::undefined(),
        }
    }

    pub fn has_pitch(&self) -> bool {
        self.frequency.is_some()
    }
}
