//! # Tick Loop
//!
//! Drives a [`Tuner`] at a fixed analysis rate on the calling thread,
//! independent of how often the audio backend delivers samples.

use std::time::Duration;

use crossbeam_channel::{Receiver, Sender, TrySendError};

use crate::TunerReading;
use crate::audio::AudioInput;
use crate::error::TunerError;
use crate::session::Tuner;

/// Requests that a running tick loop stop.
///
/// Cloneable and idempotent: any number of requests stop the loop once.
#[derive(Debug, Clone)]
pub struct StopHandle {
    sender: Sender<()>,
}

impl StopHandle {
    pub fn stop(&self) {
        match self.sender.try_send(()) {
            Ok(()) | Err(TrySendError::Full(())) => {}
            Err(TrySendError::Disconnected(())) => {
                tracing::debug!("Stop requested after the tick loop ended");
            }
        }
    }
}

/// Receiving side of a [`StopHandle`], handed to [`run`].
#[derive(Debug)]
pub struct StopSignal {
    receiver: Receiver<()>,
}

impl StopSignal {
    pub fn is_requested(&self) -> bool {
        !self.receiver.is_empty()
    }
}

pub fn stop_channel() -> (StopHandle, StopSignal) {
    let (sender, receiver) = crossbeam_channel::bounded(1);
    (StopHandle { sender }, StopSignal { receiver })
}

/// Interval between ticks for a target analysis rate.
pub fn tick_interval(rate_hz: f32) -> Duration {
    Duration::from_secs_f32(1.0 / rate_hz.max(f32::EPSILON))
}

/// Starts the tuner and analyzes one frame per tick until stopped.
///
/// The loop ends when `stop` is signalled or a finite input runs dry; in
/// both cases the tuner is stopped before returning, so no further ticks
/// fire. Start failures are returned without entering the loop.
pub fn run<I, F>(tuner: &mut Tuner<I>, stop: &StopSignal, mut on_reading: F) -> Result<(), TunerError>
where
    I: AudioInput,
    F: FnMut(&TunerReading),
{
    if stop.is_requested() {
        return Ok(());
    }
    tuner.start()?;

    let interval = tick_interval(tuner.config().analysis_rate_hz);
    let ticker = crossbeam_channel::tick(interval);
    tracing::debug!("Tick loop running every {:?}", interval);

    loop {
        crossbeam_channel::select! {
            recv(stop.receiver) -> _ => {
                tracing::debug!("Tick loop received stop request");
                break;
            },
            recv(ticker) -> _ => {
                // A stop that raced the tick wins.
                if stop.is_requested() {
                    break;
                }
                if let Some(reading) = tuner.tick() {
                    on_reading(&reading);
                }
                if tuner.is_exhausted() {
                    tracing::info!("Input exhausted");
                    break;
                }
            },
        }
    }

    tuner.stop();
    Ok(())
}
