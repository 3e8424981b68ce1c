//! # Audio Capture Module
//!
//! This module defines the audio input boundary of the tuner and its
//! microphone implementation on top of CPAL (Cross-Platform Audio Library).
//!
//! ## Features
//! - `AudioInput` / `FrameStream` traits so the pipeline does not care where
//!   samples come from
//! - Automatic input device and format selection with mono downmixing
//! - Coalescing rolling window: only the newest frame is ever analyzed

use std::collections::VecDeque;

use anyhow::{Context, Result, anyhow};
use cpal::SupportedStreamConfigRange;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use crossbeam_channel::{Receiver, Sender, TrySendError};

use crate::error::TunerError;

/// Default number of samples per analysis frame.
///
/// Larger windows resolve lower notes but increase latency.
pub const DEFAULT_WINDOW_SIZE: usize = 4096;

/// Sample rate requested from capture devices.
pub const TARGET_SAMPLE_RATE: u32 = 44100;

/// Raw chunks the capture callback may queue before new ones are dropped.
const CHUNK_QUEUE_DEPTH: usize = 64;

/// A fixed-size window of mono time-domain samples.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioFrame {
    samples: Vec<f32>,
    sample_rate: u32,
}

impl AudioFrame {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self { samples, sample_rate }
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Length of the frame in seconds.
    pub fn duration_secs(&self) -> f32 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f32 / self.sample_rate as f32
    }
}

/// A source of audio that can be opened for one listening session.
pub trait AudioInput {
    type Stream: FrameStream;

    /// Starts capture. Dropping the returned stream stops it and releases
    /// the underlying device.
    fn open(&mut self, window_size: usize) -> Result<Self::Stream, TunerError>;
}

/// An open capture stream.
pub trait FrameStream {
    /// The most recent full window, if new samples arrived since the last call.
    fn latest_frame(&mut self) -> Option<AudioFrame>;

    fn sample_rate(&self) -> u32;

    /// True once a finite source has nothing more to deliver.
    fn is_exhausted(&self) -> bool {
        false
    }
}

/// Rolling window holding the newest `capacity` samples.
///
/// Pushing more than a window's worth between reads discards the oldest
/// samples, so a slow reader always sees the latest audio instead of a
/// growing backlog.
#[derive(Debug, Clone)]
pub struct FrameWindow {
    samples: VecDeque<f32>,
    capacity: usize,
    fresh: bool,
}

impl FrameWindow {
    pub fn new(capacity: usize) -> Self {
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
            fresh: false,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn push(&mut self, chunk: &[f32]) {
        if chunk.is_empty() || self.capacity == 0 {
            return;
        }
        let chunk = &chunk[chunk.len().saturating_sub(self.capacity)..];
        let overflow = (self.samples.len() + chunk.len()).saturating_sub(self.capacity);
        self.samples.drain(..overflow);
        self.samples.extend(chunk.iter().copied());
        self.fresh = true;
    }

    pub fn is_full(&self) -> bool {
        self.capacity > 0 && self.samples.len() == self.capacity
    }

    /// Copies out the window once it is full and has unseen samples.
    pub fn take_frame(&mut self, sample_rate: u32) -> Option<AudioFrame> {
        if !self.fresh || !self.is_full() {
            return None;
        }
        self.fresh = false;
        Some(AudioFrame::new(self.samples.iter().copied().collect(), sample_rate))
    }

    pub fn clear(&mut self) {
        self.samples.clear();
        self.fresh = false;
    }
}

/// Averages interleaved channels into mono.
pub fn downmix_to_mono(interleaved: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return interleaved.to_vec();
    }
    interleaved
        .chunks(channels)
        .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
        .collect()
}

/// Captures from the system's default input device.
#[derive(Debug, Clone, Default)]
pub struct MicrophoneInput {
    /// Input device name to prefer over the default one.
    pub device_name: Option<String>,
}

impl MicrophoneInput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_device(name: impl Into<String>) -> Self {
        Self {
            device_name: Some(name.into()),
        }
    }
}

impl AudioInput for MicrophoneInput {
    type Stream = MicrophoneStream;

    fn open(&mut self, window_size: usize) -> Result<Self::Stream, TunerError> {
        let (sender, receiver) = crossbeam_channel::bounded(CHUNK_QUEUE_DEPTH);
        let (stream, sample_rate) =
            start_audio_capture(self.device_name.as_deref(), sender).map_err(TunerError::InputUnavailable)?;
        Ok(MicrophoneStream {
            stream,
            receiver,
            window: FrameWindow::new(window_size),
            sample_rate,
        })
    }
}

/// A live microphone capture. Capture stops when this is dropped.
pub struct MicrophoneStream {
    stream: cpal::Stream,
    receiver: Receiver<Vec<f32>>,
    window: FrameWindow,
    sample_rate: u32,
}

impl FrameStream for MicrophoneStream {
    fn latest_frame(&mut self) -> Option<AudioFrame> {
        // Coalesce everything delivered since the last tick.
        for chunk in self.receiver.try_iter() {
            self.window.push(&chunk);
        }
        self.window.take_frame(self.sample_rate)
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}

impl Drop for MicrophoneStream {
    fn drop(&mut self) {
        if let Err(e) = self.stream.pause() {
            tracing::warn!("Error pausing input stream: {}", e);
        }
        tracing::debug!("Input stream released");
    }
}

/// Starts audio capture and streams mono chunks into `sender`.
///
/// # Returns
/// * `Ok((stream, sample_rate))` - Playing stream handle and its sample rate
/// * `Err(e)` - No device, no usable f32 format, or the stream failed to start
fn start_audio_capture(device_name: Option<&str>, sender: Sender<Vec<f32>>) -> Result<(cpal::Stream, u32)> {
    let host = cpal::default_host();
    let device = match device_name {
        Some(name) => host
            .input_devices()?
            .find(|d| d.name().map(|n| n == name).unwrap_or(false))
            .ok_or_else(|| anyhow!("Input device '{}' not found", name))?,
        None => host
            .default_input_device()
            .ok_or_else(|| anyhow!("No input device available"))?,
    };

    tracing::info!("Using audio input device: {}", device.name()?);

    let configs = device
        .supported_input_configs()
        .context("Failed to query input configs")?
        .collect::<Vec<_>>();
    let supported_config = find_supported_config(configs, TARGET_SAMPLE_RATE)
        .ok_or_else(|| anyhow!("No suitable f32 input format found"))?;

    let rate = TARGET_SAMPLE_RATE.clamp(
        supported_config.min_sample_rate().0,
        supported_config.max_sample_rate().0,
    );
    let config = supported_config.with_sample_rate(cpal::SampleRate(rate));
    let sample_rate = config.sample_rate().0;
    let channels = config.channels() as usize;
    let config: cpal::StreamConfig = config.into();

    tracing::debug!("Selected input format: {} Hz, {} channel(s)", sample_rate, channels);

    let err_fn = |err| tracing::error!("An error occurred on the audio stream: {}", err);

    let stream = device.build_input_stream(
        &config,
        move |data: &[f32], _: &cpal::InputCallbackInfo| {
            let chunk = downmix_to_mono(data, channels);
            // The analysis side only wants the newest audio; drop on backlog.
            if let Err(TrySendError::Full(_)) = sender.try_send(chunk) {
                tracing::trace!("Chunk queue full, dropping audio");
            }
        },
        err_fn,
        None,
    )?;

    stream.play().context("Failed to start input stream")?;

    Ok((stream, sample_rate))
}

/// Finds the best supported f32 configuration, preferring mono and then the
/// range closest to the target rate.
fn find_supported_config(
    configs: Vec<SupportedStreamConfigRange>,
    target_rate: u32,
) -> Option<SupportedStreamConfigRange> {
    configs
        .into_iter()
        .filter(|c| c.sample_format() == cpal::SampleFormat::F32)
        .min_by_key(|c| {
            let min_diff = (c.min_sample_rate().0 as i64 - target_rate as i64).abs();
            let max_diff = (c.max_sample_rate().0 as i64 - target_rate as i64).abs();
            let in_range = c.min_sample_rate().0 <= target_rate && target_rate <= c.max_sample_rate().0;
            let rate_cost = if in_range { 0 } else { min_diff.min(max_diff) };
            (c.channels() != 1, rate_cost)
        })
}
