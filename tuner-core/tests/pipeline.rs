use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::anyhow;
use tuner_core::audio::{AudioFrame, AudioInput, FrameStream};
use tuner_core::scheduler::{self, stop_channel};
use tuner_core::{PitchClass, SmootherState, Tuner, TunerConfig, TunerError, TunerReading, TuningQuality};

const SAMPLE_RATE: u32 = 44100;
const WINDOW: usize = 4096;

fn sine(frequency: f32) -> AudioFrame {
    let samples = (0..WINDOW)
        .map(|i| 0.4 * (2.0 * std::f32::consts::PI * frequency * i as f32 / SAMPLE_RATE as f32).sin())
        .collect();
    AudioFrame::new(samples, SAMPLE_RATE)
}

fn silence() -> AudioFrame {
    AudioFrame::new(vec![0.0; WINDOW], SAMPLE_RATE)
}

/// Hands out a fixed list of frames per session, one frame per tick.
struct ScriptedInput {
    sessions: VecDeque<Vec<AudioFrame>>,
    fail: bool,
    opened: Arc<AtomicUsize>,
    live: Arc<AtomicUsize>,
}

impl ScriptedInput {
    fn new(frames: Vec<AudioFrame>) -> Self {
        Self::with_sessions(vec![frames])
    }

    fn with_sessions(sessions: Vec<Vec<AudioFrame>>) -> Self {
        Self {
            sessions: sessions.into(),
            fail: false,
            opened: Arc::new(AtomicUsize::new(0)),
            live: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new(Vec::new())
        }
    }
}

struct ScriptedStream {
    frames: VecDeque<AudioFrame>,
    live: Arc<AtomicUsize>,
}

impl AudioInput for ScriptedInput {
    type Stream = ScriptedStream;

    fn open(&mut self, _window_size: usize) -> Result<Self::Stream, TunerError> {
        if self.fail {
            return Err(TunerError::InputUnavailable(anyhow!("permission denied")));
        }
        self.opened.fetch_add(1, Ordering::SeqCst);
        self.live.fetch_add(1, Ordering::SeqCst);
        Ok(ScriptedStream {
            frames: self.sessions.pop_front().unwrap_or_default().into(),
            live: Arc::clone(&self.live),
        })
    }
}

impl FrameStream for ScriptedStream {
    fn latest_frame(&mut self) -> Option<AudioFrame> {
        self.frames.pop_front()
    }

    fn sample_rate(&self) -> u32 {
        SAMPLE_RATE
    }

    fn is_exhausted(&self) -> bool {
        self.frames.is_empty()
    }
}

impl Drop for ScriptedStream {
    fn drop(&mut self) {
        self.live.fetch_sub(1, Ordering::SeqCst);
    }
}

#[test]
fn steady_a440_stabilizes_then_silence_resets() {
    let mut frames: Vec<AudioFrame> = (0..10).map(|_| sine(440.0)).collect();
    frames.push(silence());
    let mut tuner = Tuner::new(ScriptedInput::new(frames), TunerConfig::default()).unwrap();
    tuner.start().unwrap();

    for tick in 1..=10 {
        let reading = tuner.tick().expect("frame available");
        if tick >= 5 {
            assert_eq!(reading.note.pitch_class, Some(PitchClass::A), "tick {}", tick);
            assert_eq!(reading.note.octave, 4);
            assert!(reading.note.cents.abs() <= 5.0, "tick {}: {} cents", tick, reading.note.cents);
            assert_eq!(reading.note.quality, TuningQuality::Excellent);
            assert!(reading.note.in_tune);
        }
    }

    let silent = tuner.tick().expect("silent frame available");
    assert_eq!(silent, TunerReading::silent());
    assert_eq!(silent.note.name(), "--");
    assert_eq!(tuner.smoother_state(), SmootherState { frequency: 0.0, cents: 0.0 });
}

#[test]
fn detuned_string_reports_sharp_cents() {
    // About 17 cents sharp of A3.
    let frames: Vec<AudioFrame> = (0..6).map(|_| sine(222.2)).collect();
    let mut tuner = Tuner::new(ScriptedInput::new(frames), TunerConfig::default()).unwrap();
    tuner.start().unwrap();

    let mut last = None;
    while let Some(reading) = tuner.tick() {
        last = Some(reading);
    }
    let reading = last.unwrap();
    assert_eq!(reading.note.name(), "A3");
    assert!(reading.note.cents > 10.0, "cents = {}", reading.note.cents);
    assert_eq!(reading.note.quality, TuningQuality::Poor);
    assert!(!reading.note.in_tune);
}

#[test]
fn reference_pitch_changes_apply_on_next_tick() {
    let frames: Vec<AudioFrame> = (0..2).map(|_| sine(440.0)).collect();
    let mut tuner = Tuner::new(ScriptedInput::new(frames), TunerConfig::default()).unwrap();
    tuner.start().unwrap();

    let first = tuner.tick().unwrap();
    assert!(first.note.cents.abs() < 2.0);

    tuner.set_reference_pitch(450.0).unwrap();
    let second = tuner.tick().unwrap();
    assert_eq!(second.note.name(), "A4");
    // Raw deviation is about -39 cents; the smoothed stream moves at most 6 per tick.
    assert!(second.note.cents < -4.0 && second.note.cents >= -6.5, "cents = {}", second.note.cents);

    assert!(matches!(
        tuner.set_reference_pitch(300.0),
        Err(TunerError::ReferencePitchOutOfRange { .. })
    ));
    assert_eq!(tuner.reference_pitch().hz(), 450.0);
}

#[test]
fn stop_releases_input_and_is_idempotent() {
    let input = ScriptedInput::new(vec![sine(440.0), sine(440.0)]);
    let live = Arc::clone(&input.live);
    let mut tuner = Tuner::new(input, TunerConfig::default()).unwrap();

    tuner.stop();
    assert!(!tuner.is_listening());

    tuner.start().unwrap();
    assert_eq!(live.load(Ordering::SeqCst), 1);
    assert!(tuner.tick().is_some());

    tuner.stop();
    tuner.stop();
    assert!(!tuner.is_listening());
    assert_eq!(live.load(Ordering::SeqCst), 0);
    assert!(tuner.tick().is_none());
    assert_eq!(tuner.smoother_state(), SmootherState::default());
}

#[test]
fn restart_begins_from_a_clean_state() {
    let input = ScriptedInput::with_sessions(vec![vec![sine(440.0)], vec![sine(329.63)]]);
    let opened = Arc::clone(&input.opened);
    let mut tuner = Tuner::new(input, TunerConfig::default()).unwrap();

    tuner.start().unwrap();
    tuner.tick().unwrap();
    assert!(tuner.smoother_state().frequency > 400.0);
    tuner.stop();

    tuner.start().unwrap();
    assert_eq!(opened.load(Ordering::SeqCst), 2);
    assert_eq!(tuner.smoother_state(), SmootherState::default());

    // The first estimate of the new session is not dragged toward 440 Hz.
    let reading = tuner.tick().unwrap();
    assert_eq!(reading.note.name(), "E4");
    assert!((reading.frequency.unwrap() - 329.63).abs() < 1.0);
}

#[test]
fn start_failure_is_reported_and_leaves_tuner_stopped() {
    let mut tuner = Tuner::new(ScriptedInput::failing(), TunerConfig::default()).unwrap();
    let err = tuner.start().unwrap_err();
    assert!(matches!(err, TunerError::InputUnavailable(_)));
    assert!(err.to_string().contains("permission denied"));
    assert!(!tuner.is_listening());
}

#[test]
fn invalid_config_is_rejected() {
    let config = TunerConfig {
        window_size: 1000,
        ..TunerConfig::default()
    };
    assert!(matches!(
        Tuner::new(ScriptedInput::new(Vec::new()), config),
        Err(TunerError::InvalidConfig(_))
    ));
}

#[test]
fn run_loop_drains_finite_input_then_stops() {
    let frames = vec![sine(440.0), sine(440.0), silence()];
    let config = TunerConfig {
        analysis_rate_hz: 200.0,
        ..TunerConfig::default()
    };
    let input = ScriptedInput::new(frames);
    let live = Arc::clone(&input.live);
    let mut tuner = Tuner::new(input, config).unwrap();
    let (_handle, signal) = stop_channel();

    let mut readings = Vec::new();
    scheduler::run(&mut tuner, &signal, |reading| readings.push(*reading)).unwrap();

    assert_eq!(readings.len(), 3);
    assert!(readings[0].has_pitch());
    assert!(!readings[2].has_pitch());
    assert!(!tuner.is_listening());
    assert_eq!(live.load(Ordering::SeqCst), 0);
}

#[test]
fn run_loop_stops_on_request() {
    let frames: Vec<AudioFrame> = (0..1000).map(|_| sine(440.0)).collect();
    let config = TunerConfig {
        analysis_rate_hz: 200.0,
        ..TunerConfig::default()
    };
    let mut tuner = Tuner::new(ScriptedInput::new(frames), config).unwrap();
    let (handle, signal) = stop_channel();

    let mut count = 0;
    scheduler::run(&mut tuner, &signal, |_| {
        count += 1;
        if count == 3 {
            handle.stop();
        }
    })
    .unwrap();

    assert_eq!(count, 3);
    assert!(!tuner.is_listening());
}

#[test]
fn run_loop_does_not_start_when_already_stopped() {
    let input = ScriptedInput::new(vec![sine(440.0)]);
    let opened = Arc::clone(&input.opened);
    let mut tuner = Tuner::new(input, TunerConfig::default()).unwrap();
    let (handle, signal) = stop_channel();
    handle.stop();

    scheduler::run(&mut tuner, &signal, |_| unreachable!("no ticks expected")).unwrap();
    assert_eq!(opened.load(Ordering::SeqCst), 0);
}

#[test]
fn run_loop_surfaces_start_failure() {
    let mut tuner = Tuner::new(ScriptedInput::failing(), TunerConfig::default()).unwrap();
    let (_handle, signal) = stop_channel();
    let result = scheduler::run(&mut tuner, &signal, |_| {});
    assert!(matches!(result, Err(TunerError::InputUnavailable(_))));
}
