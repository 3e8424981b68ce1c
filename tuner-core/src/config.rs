//! # Tuner Configuration
//!
//! All tunable parameters of the pipeline in one serializable struct. Missing
//! fields in a config file fall back to their defaults, so a file only needs
//! to name what it changes.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::audio::DEFAULT_WINDOW_SIZE;
use crate::error::TunerError;
use crate::pitch::DetectorConfig;
use crate::quality::QualityThresholds;
use crate::smoothing::SmoothingConfig;
use crate::tuning::ReferencePitch;

/// Target number of analyses per second.
pub const DEFAULT_ANALYSIS_RATE_HZ: f32 = 30.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TunerConfig {
    /// Samples per analysis frame; a power of two.
    pub window_size: usize,
    pub analysis_rate_hz: f32,
    pub reference_pitch: ReferencePitch,
    pub detector: DetectorConfig,
    pub smoothing: SmoothingConfig,
    pub thresholds: QualityThresholds,
}

impl Default for TunerConfig {
    fn default() -> Self {
        Self {
            window_size: DEFAULT_WINDOW_SIZE,
            analysis_rate_hz: DEFAULT_ANALYSIS_RATE_HZ,
            reference_pitch: ReferencePitch::default(),
            detector: DetectorConfig::default(),
            smoothing: SmoothingConfig::default(),
            thresholds: QualityThresholds::default(),
        }
    }
}

impl TunerConfig {
    /// Loads a config from a JSON file and validates it.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).with_context(|| format!("Failed to open config {}", path.display()))?;
        let config: TunerConfig = serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("Failed to parse config {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Saves the config as pretty-printed JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let file = File::create(path).with_context(|| format!("Failed to create config {}", path.display()))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, self)?;
        writer.flush()?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), TunerError> {
        if self.window_size < 256 || !self.window_size.is_power_of_two() {
            return Err(TunerError::InvalidConfig(format!(
                "window_size must be a power of two >= 256, got {}",
                self.window_size
            )));
        }
        if !(self.analysis_rate_hz.is_finite() && self.analysis_rate_hz > 0.0) {
            return Err(TunerError::InvalidConfig(format!(
                "analysis_rate_hz must be positive, got {}",
                self.analysis_rate_hz
            )));
        }
        // Re-check in case the value was built without going through `new`.
        ReferencePitch::new(self.reference_pitch.hz())?;
        self.detector.validate().map_err(TunerError::InvalidConfig)?;
        self.smoothing.validate().map_err(TunerError::InvalidConfig)?;
        if !self.thresholds.is_valid() {
            return Err(TunerError::InvalidConfig(format!(
                "quality thresholds must be increasing, got {:?}",
                self.thresholds
            )));
        }
        Ok(())
    }
}
