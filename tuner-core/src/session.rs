//! # Listening Session
//!
//! Ties the pipeline together: each tick pulls the newest frame from the
//! input, estimates its pitch, smooths the frequency and cents streams, and
//! turns the result into a [`TunerReading`] for the presentation layer.
//!
//! All per-session state lives in a [`ListeningSession`] that is built on
//! `start` and dropped on `stop`, so no frequency or cents carry over from
//! one session to the next.

use crate::TunerReading;
use crate::audio::{AudioFrame, AudioInput, FrameStream};
use crate::config::TunerConfig;
use crate::error::TunerError;
use crate::pitch::PitchDetector;
use crate::smoothing::Smoother;
use crate::tuning::{self, NoteReading, ReferencePitch};

/// Running values of both smoothed streams.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SmootherState {
    pub frequency: f32,
    pub cents: f32,
}

/// The per-frame analysis chain: detector, smoothers, note mapping and
/// classification.
pub struct Analyzer {
    config: TunerConfig,
    detector: PitchDetector,
    frequency: Smoother,
    cents: Smoother,
}

impl Analyzer {
    pub fn new(config: TunerConfig) -> Self {
        Self {
            detector: PitchDetector::new(config.detector),
            frequency: Smoother::new(config.smoothing.frequency),
            cents: Smoother::new(config.smoothing.cents),
            config,
        }
    }

    /// Analyzes one frame against the given reference pitch.
    ///
    /// A frame with no pitch resets both smoothers to zero and produces the
    /// undefined reading.
    pub fn process(&mut self, frame: &AudioFrame, reference: ReferencePitch) -> TunerReading {
        let raw_frequency = self.detector.detect(frame.samples(), frame.sample_rate());

        let Some(raw) = raw_frequency else {
            self.reset();
            return TunerReading::silent();
        };

        let raw_cents = tuning::map_note_with(raw, reference, &self.config.thresholds).cents;
        let frequency = self.frequency.update(raw);
        let cents = self.cents.update(raw_cents);

        let note = tuning::map_note_with(frequency, reference, &self.config.thresholds)
            .with_cents(cents, &self.config.thresholds);

        tracing::trace!(
            "raw {:.2} Hz -> smoothed {:.2} Hz, {} {:+.1} cents",
            raw,
            frequency,
            note.name(),
            cents
        );

        TunerReading {
            frequency: Some(frequency),
            raw_frequency: Some(raw),
            note,
        }
    }

    pub fn reset(&mut self) {
        self.frequency.reset();
        self.cents.reset();
    }

    pub fn smoother_state(&self) -> SmootherState {
        SmootherState {
            frequency: self.frequency.value(),
            cents: self.cents.value(),
        }
    }
}

/// Resources owned for the duration of one listening session.
pub struct ListeningSession<S> {
    stream: S,
    analyzer: Analyzer,
}

impl<S: FrameStream> ListeningSession<S> {
    fn tick(&mut self, reference: ReferencePitch) -> Option<TunerReading> {
        let frame = self.stream.latest_frame()?;
        Some(self.analyzer.process(&frame, reference))
    }
}

/// A tuner bound to one audio input.
///
/// `start` opens the input and creates a fresh session; `stop` drops the
/// session and releases the input. Both are safe to call repeatedly.
pub struct Tuner<I: AudioInput> {
    input: I,
    config: TunerConfig,
    reference: ReferencePitch,
    session: Option<ListeningSession<I::Stream>>,
}

impl<I: AudioInput> Tuner<I> {
    pub fn new(input: I, config: TunerConfig) -> Result<Self, TunerError> {
        config.validate()?;
        Ok(Self {
            input,
            reference: config.reference_pitch,
            config,
            session: None,
        })
    }

    pub fn config(&self) -> &TunerConfig {
        &self.config
    }

    pub fn input(&self) -> &I {
        &self.input
    }

    pub fn reference_pitch(&self) -> ReferencePitch {
        self.reference
    }

    /// Changes the A4 reference; takes effect on the next tick.
    pub fn set_reference_pitch(&mut self, hz: f32) -> Result<(), TunerError> {
        self.reference = ReferencePitch::new(hz)?;
        tracing::info!("Reference pitch set to A4 = {} Hz", hz);
        Ok(())
    }

    pub fn is_listening(&self) -> bool {
        self.session.is_some()
    }

    /// Opens the input and begins a clean session.
    ///
    /// A running session is stopped first. Input failures are returned as
    /// [`TunerError::InputUnavailable`] and leave the tuner stopped.
    pub fn start(&mut self) -> Result<(), TunerError> {
        self.stop();
        let stream = self.input.open(self.config.window_size)?;
        tracing::info!(
            "Listening at {} Hz, {} samples per frame, A4 = {} Hz",
            stream.sample_rate(),
            self.config.window_size,
            self.reference.hz()
        );
        self.session = Some(ListeningSession {
            stream,
            analyzer: Analyzer::new(self.config.clone()),
        });
        Ok(())
    }

    /// Stops listening and releases the input. No-op when already stopped.
    pub fn stop(&mut self) {
        if self.session.take().is_some() {
            tracing::info!("Stopped listening");
        }
    }

    /// Runs one analysis step.
    ///
    /// Returns `None` when not listening or when no new audio arrived since
    /// the previous tick.
    pub fn tick(&mut self) -> Option<TunerReading> {
        let reference = self.reference;
        self.session.as_mut()?.tick(reference)
    }

    /// True when the open stream is a finite source that has run dry.
    pub fn is_exhausted(&self) -> bool {
        self.session
            .as_ref()
            .is_some_and(|session| session.stream.is_exhausted())
    }

    /// Current smoother values; zero when not listening.
    pub fn smoother_state(&self) -> SmootherState {
        self.session
            .as_ref()
            .map(|session| session.analyzer.smoother_state())
            .unwrap_or_default()
    }
}

impl<I: AudioInput> Drop for Tuner<I> {
    fn drop(&mut self) {
        self.stop();
    }
}
