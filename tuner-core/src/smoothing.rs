//! # Temporal Smoothing Module
//!
//! Adaptive exponential smoothing for the frequency and cents streams. Each
//! step moves toward the new target by a bounded amount, so single-frame
//! jitter from the detector never reaches the indicator while genuine pitch
//! changes are still tracked within a few frames.

use serde::{Deserialize, Serialize};

/// Advances a smoothed value one step toward `target`.
///
/// The step is `clamp(target - current, ±max_change) * alpha`, with `alpha`
/// halved for jumps larger than `2 * max_change`. If the result would still be
/// more than `3 * max_change` away from the target, the value moves by exactly
/// `max_change` instead.
pub fn advance(current: f32, target: f32, alpha: f32, max_change: f32) -> f32 {
    let diff = target - current;
    let alpha = if diff.abs() > 2.0 * max_change { alpha * 0.5 } else { alpha };
    let limited_diff = diff.clamp(-max_change, max_change);
    let result = current + limited_diff * alpha;

    if (result - target).abs() > 3.0 * max_change {
        current + diff.signum() * max_change
    } else {
        result
    }
}

/// How far a stream may move in one step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepLimit {
    /// A fixed amount in the stream's own unit.
    Absolute(f32),
    /// A fraction of the current target's magnitude.
    Relative(f32),
}

impl StepLimit {
    fn for_target(self, target: f32) -> f32 {
        match self {
            StepLimit::Absolute(amount) => amount,
            StepLimit::Relative(fraction) => target.abs() * fraction,
        }
    }

    fn is_valid(self) -> bool {
        match self {
            StepLimit::Absolute(amount) | StepLimit::Relative(amount) => amount.is_finite() && amount > 0.0,
        }
    }
}

/// Smoothing constants of one stream.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StreamSmoothing {
    pub alpha: f32,
    pub max_change: StepLimit,
}

/// Smoothing constants of both streams.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SmoothingConfig {
    pub frequency: StreamSmoothing,
    pub cents: StreamSmoothing,
}

impl Default for SmoothingConfig {
    fn default() -> Self {
        Self {
            frequency: StreamSmoothing {
                alpha: 0.4,
                max_change: StepLimit::Relative(0.03),
            },
            cents: StreamSmoothing {
                alpha: 0.4,
                max_change: StepLimit::Absolute(6.0),
            },
        }
    }
}

impl SmoothingConfig {
    pub fn validate(&self) -> Result<(), String> {
        for (name, stream) in [("frequency", self.frequency), ("cents", self.cents)] {
            if !(stream.alpha > 0.0 && stream.alpha <= 1.0) {
                return Err(format!("{} alpha must be in (0, 1], got {}", name, stream.alpha));
            }
            if !stream.max_change.is_valid() {
                return Err(format!("{} max_change must be positive, got {:?}", name, stream.max_change));
            }
        }
        Ok(())
    }
}

/// A single smoothed stream.
///
/// After a reset the stream rests at exactly 0. The first target after a
/// reset seeds the value; every later target is approached through
/// [`advance`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Smoother {
    settings: StreamSmoothing,
    value: f32,
    seeded: bool,
}

impl Smoother {
    pub fn new(settings: StreamSmoothing) -> Self {
        Self {
            settings,
            value: 0.0,
            seeded: false,
        }
    }

    pub fn value(&self) -> f32 {
        self.value
    }

    pub fn is_resting(&self) -> bool {
        !self.seeded
    }

    /// Feeds one target and returns the new smoothed value.
    pub fn update(&mut self, target: f32) -> f32 {
        if !target.is_finite() {
            return self.value;
        }
        if !self.seeded {
            self.value = target;
            self.seeded = true;
            return self.value;
        }

        let max_change = self.settings.max_change.for_target(target);
        if max_change > 0.0 {
            let next = advance(self.value, target, self.settings.alpha, max_change);
            if next.is_finite() {
                self.value = next;
            }
        }
        self.value
    }

    pub fn reset(&mut self) {
        self.value = 0.0;
        self.seeded = false;
    }
}
