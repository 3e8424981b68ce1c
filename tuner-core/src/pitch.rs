//! # Pitch Detection Module
//!
//! This module estimates the fundamental frequency of a single audio frame
//! using normalized autocorrelation, tuned for decaying plucked and bowed
//! string tones.
//!
//! ## Features
//! - RMS silence gate
//! - Hann windowing and edge trimming
//! - Normalized autocorrelation, robust to amplitude decay
//! - Peak search bounded to the valid frequency band, with octave-error guard
//! - Parabolic interpolation for sub-sample accuracy

use crate::signal::{self, Autocorrelator};
use serde::{Deserialize, Serialize};

/// Tunable parameters of the pitch detector.
///
/// The defaults are empirical and worth re-validating against real
/// instrument recordings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Frames with a lower RMS are treated as silence.
    pub silence_rms: f32,
    /// Edge-trim threshold as a fraction of the frame RMS.
    pub trim_factor: f32,
    /// Frames shorter than this after trimming are rejected.
    pub min_trimmed_len: usize,
    /// Minimum normalized correlation of the chosen peak.
    pub min_confidence: f32,
    /// An earlier peak within this fraction of the best one wins.
    pub peak_tolerance: f32,
    pub min_frequency: f32,
    pub max_frequency: f32,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            silence_rms: 0.005,
            trim_factor: 0.3,
            min_trimmed_len: 100,
            min_confidence: 0.4,
            peak_tolerance: 0.9,
            min_frequency: 80.0,
            max_frequency: 4000.0,
        }
    }
}

impl DetectorConfig {
    pub fn validate(&self) -> Result<(), String> {
        if !(self.silence_rms.is_finite() && self.silence_rms >= 0.0) {
            return Err(format!("silence_rms must be >= 0, got {}", self.silence_rms));
        }
        if !(self.trim_factor.is_finite() && self.trim_factor >= 0.0) {
            return Err(format!("trim_factor must be >= 0, got {}", self.trim_factor));
        }
        if !(self.min_confidence > 0.0 && self.min_confidence <= 1.0) {
            return Err(format!("min_confidence must be in (0, 1], got {}", self.min_confidence));
        }
        if !(self.peak_tolerance > 0.0 && self.peak_tolerance <= 1.0) {
            return Err(format!("peak_tolerance must be in (0, 1], got {}", self.peak_tolerance));
        }
        if !(self.min_frequency > 0.0 && self.min_frequency < self.max_frequency && self.max_frequency.is_finite()) {
            return Err(format!(
                "frequency band {}..{} Hz is empty or invalid",
                self.min_frequency, self.max_frequency
            ));
        }
        Ok(())
    }
}

/// A detected fundamental together with the correlation of its peak.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PitchCandidate {
    pub frequency: f32,
    /// Normalized correlation at the chosen lag, 0.0 to 1.0.
    pub confidence: f32,
}

/// Normalized-autocorrelation pitch detector.
///
/// Detection is a pure function of the frame; the struct only keeps FFT
/// plans and scratch buffers alive between frames.
pub struct PitchDetector {
    config: DetectorConfig,
    correlator: Autocorrelator,
    windowed: Vec<f32>,
    curve: Vec<f32>,
}

impl PitchDetector {
    pub fn new(config: DetectorConfig) -> Self {
        Self {
            config,
            correlator: Autocorrelator::new(),
            windowed: Vec::new(),
            curve: Vec::new(),
        }
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// Returns the fundamental frequency in Hz, or `None` when no reliable
    /// pitch is present.
    pub fn detect(&mut self, samples: &[f32], sample_rate: u32) -> Option<f32> {
        self.detect_with_confidence(samples, sample_rate)
            .map(|candidate| candidate.frequency)
    }

    /// Like [`detect`](Self::detect), also reporting the peak correlation.
    ///
    /// # Returns
    /// * `Some(candidate)` - frequency inside the configured band
    /// * `None` - silence, too short after trimming, no clear peak,
    ///   low confidence, or a frequency outside the band
    pub fn detect_with_confidence(&mut self, samples: &[f32], sample_rate: u32) -> Option<PitchCandidate> {
        let config = self.config;
        if samples.is_empty() || sample_rate == 0 {
            return None;
        }

        // --- Silence gate on the raw frame ---
        let level = signal::rms(samples);
        if !level.is_finite() || level < config.silence_rms {
            return None;
        }

        // --- Window, then trim quiet edges ---
        self.windowed.clear();
        self.windowed.extend_from_slice(samples);
        signal::apply_hann_window(&mut self.windowed);
        let trimmed = signal::trim_edges(&self.windowed, config.trim_factor * level);
        if trimmed.len() < config.min_trimmed_len.max(3) {
            return None;
        }

        self.correlator.normalized(trimmed, &mut self.curve);
        let curve = &self.curve;

        // --- Lag range of the valid band ---
        let sample_rate = sample_rate as f32;
        let min_lag = ((sample_rate / config.max_frequency).floor() as usize).max(1);
        let max_lag = ((sample_rate / config.min_frequency).ceil() as usize).min(curve.len() - 2);
        if min_lag >= max_lag {
            return None;
        }

        // --- Skip the zero-lag lobe: walk until the curve stops falling ---
        let mut turn = 0;
        while turn < max_lag && curve[turn] > curve[turn + 1] {
            turn += 1;
        }
        let start = turn.max(min_lag);

        let (best_lag, best_value) = (start..=max_lag)
            .map(|lag| (lag, curve[lag]))
            .fold((start, f32::NEG_INFINITY), |best, candidate| {
                if candidate.1 > best.1 { candidate } else { best }
            });
        if best_value <= 0.0 {
            return None;
        }

        // --- Octave guard: prefer the first period over its multiples ---
        let threshold = best_value * config.peak_tolerance;
        let peak_lag = (start..=best_lag)
            .find(|&lag| {
                curve[lag] >= threshold && curve[lag] >= curve[lag - 1] && curve[lag] >= curve[lag + 1]
            })
            .unwrap_or(best_lag);

        let confidence = curve[peak_lag];
        if confidence < config.min_confidence {
            return None;
        }

        // --- Parabolic interpolation for better precision ---
        let y1 = curve[peak_lag - 1];
        let y2 = curve[peak_lag];
        let y3 = curve[peak_lag + 1];
        let curvature = y1 - 2.0 * y2 + y3;
        let period = if curvature.abs() > f32::EPSILON {
            let peak_shift = (y1 - y3) / (2.0 * curvature);
            if peak_shift.abs() <= 1.0 {
                peak_lag as f32 + peak_shift
            } else {
                peak_lag as f32
            }
        } else {
            peak_lag as f32
        };

        let frequency = sample_rate / period;
        if frequency.is_finite() && frequency >= config.min_frequency && frequency <= config.max_frequency {
            Some(PitchCandidate { frequency, confidence })
        } else {
            None
        }
    }
}

/// One-shot pitch estimate for a single buffer.
pub fn estimate_pitch(samples: &[f32], sample_rate: u32, config: &DetectorConfig) -> Option<f32> {
    PitchDetector::new(*config).detect(samples, sample_rate)
}
