//! # Error Types
//!
//! The tuner deliberately has a narrow error surface: failing to estimate a
//! pitch is a normal "no pitch" reading, not an error. Only starting the input
//! and changing settings can fail.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TunerError {
    /// The audio input could not be opened (no device, permission denied,
    /// unsupported format, unreadable file).
    #[error("audio input unavailable: {0:#}")]
    InputUnavailable(anyhow::Error),

    #[error("reference pitch {hz} Hz is outside {min}..={max} Hz")]
    ReferencePitchOutOfRange { hz: f32, min: f32, max: f32 },

    #[error("invalid config: {0}")]
    InvalidConfig(String),
}
