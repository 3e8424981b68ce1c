//! # WAV File Input
//!
//! Replays a WAV recording through the tuner as if it were a live input:
//! every call to `latest_frame` advances by one analysis hop, so a 30 Hz
//! tick loop consumes the file in real time.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};

use crate::audio::{AudioFrame, AudioInput, FrameStream, downmix_to_mono};
use crate::error::TunerError;

#[derive(Debug, Clone)]
pub struct WavInput {
    path: PathBuf,
    analysis_rate_hz: f32,
}

impl WavInput {
    /// `analysis_rate_hz` sets the hop between frames (`sample_rate / rate`).
    pub fn new(path: impl AsRef<Path>, analysis_rate_hz: f32) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            analysis_rate_hz,
        }
    }
}

impl AudioInput for WavInput {
    type Stream = SampleStream;

    fn open(&mut self, window_size: usize) -> Result<Self::Stream, TunerError> {
        let (samples, sample_rate) = read_mono(&self.path).map_err(TunerError::InputUnavailable)?;
        tracing::info!(
            "Loaded {} ({} samples at {} Hz)",
            self.path.display(),
            samples.len(),
            sample_rate
        );
        let hop = (sample_rate as f32 / self.analysis_rate_hz).round().max(1.0) as usize;
        Ok(SampleStream::new(samples, sample_rate, window_size, hop))
    }
}

/// Reads a WAV file and downmixes it to mono `f32` in [-1, 1].
pub fn read_mono(path: &Path) -> Result<(Vec<f32>, u32)> {
    let mut reader =
        hound::WavReader::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let spec = reader.spec();

    let interleaved: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<Result<_, _>>()
            .context("Failed to decode float samples")?,
        hound::SampleFormat::Int => {
            if spec.bits_per_sample == 0 || spec.bits_per_sample > 32 {
                return Err(anyhow!("Unsupported bit depth {}", spec.bits_per_sample));
            }
            let scale = (1_i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|s| s as f32 / scale))
                .collect::<Result<_, _>>()
                .context("Failed to decode integer samples")?
        }
    };

    Ok((downmix_to_mono(&interleaved, spec.channels as usize), spec.sample_rate))
}

/// An in-memory finite stream that advances one hop per frame.
#[derive(Debug, Clone)]
pub struct SampleStream {
    samples: Vec<f32>,
    sample_rate: u32,
    window_size: usize,
    hop: usize,
    position: usize,
}

impl SampleStream {
    pub fn new(samples: Vec<f32>, sample_rate: u32, window_size: usize, hop: usize) -> Self {
        Self {
            samples,
            sample_rate,
            window_size,
            hop: hop.max(1),
            position: 0,
        }
    }
}

impl FrameStream for SampleStream {
    fn latest_frame(&mut self) -> Option<AudioFrame> {
        let end = self.position.checked_add(self.window_size)?;
        if self.window_size == 0 || end > self.samples.len() {
            self.position = self.samples.len();
            return None;
        }
        let frame = AudioFrame::new(self.samples[self.position..end].to_vec(), self.sample_rate);
        self.position += self.hop;
        Some(frame)
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn is_exhausted(&self) -> bool {
        self.window_size == 0 || self.position + self.window_size > self.samples.len()
    }
}
