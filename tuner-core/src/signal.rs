//! # Signal Conditioning Module
//!
//! Frame-level helpers used ahead of pitch estimation: RMS energy, Hann
//! windowing, edge trimming and a normalized autocorrelation computed through
//! RustFFT.
//!
//! ## Features
//! - Hann windowing to reduce edge artifacts
//! - Edge trimming of low-energy leading/trailing samples
//! - Normalized autocorrelation bounded to [-1, 1], independent of amplitude
//! - FFT plans cached across frames

use rustfft::{FftPlanner, num_complex::Complex};

/// Root-mean-square energy of a signal. Empty signals have zero energy.
pub fn rms(signal: &[f32]) -> f32 {
    if signal.is_empty() {
        return 0.0;
    }
    (signal.iter().map(|&s| s * s).sum::<f32>() / signal.len() as f32).sqrt()
}

/// Applies a Hann window to the input buffer in place.
///
/// The window tapers both ends to zero, which keeps the abrupt frame edges
/// from showing up as false periodicity.
pub fn apply_hann_window(buffer: &mut [f32]) {
    let n = buffer.len();
    if n < 2 {
        return;
    }
    let n_minus_1 = (n - 1) as f32;
    for (i, sample) in buffer.iter_mut().enumerate() {
        let multiplier = 0.5 * (1.0 - (2.0 * std::f32::consts::PI * i as f32 / n_minus_1).cos());
        *sample *= multiplier;
    }
}

/// Trims a signal from both ends.
///
/// Scanning inward over each half, the cut is placed at the first sample whose
/// magnitude drops below `threshold`. If no such sample exists on a side that
/// side is left untouched.
pub fn trim_edges(signal: &[f32], threshold: f32) -> &[f32] {
    let n = signal.len();
    let half = n / 2;

    let start = signal[..half]
        .iter()
        .position(|s| s.abs() < threshold)
        .unwrap_or(0);
    let end = (1..half)
        .find(|&i| signal[n - i].abs() < threshold)
        .map(|i| n - i)
        .unwrap_or(n);

    &signal[start..end]
}

/// Computes normalized autocorrelation curves.
///
/// For lag `k` the coefficient is
/// `sum(x[j] * x[j + k]) / sqrt(sum(x[j]^2) * sum(x[j + k]^2))` over the
/// overlapping region. The cross products come from a zero-padded FFT and the
/// energies from prefix sums, so a whole curve costs O(n log n).
pub struct Autocorrelator {
    planner: FftPlanner<f32>,
    buffer: Vec<Complex<f32>>,
    energy: Vec<f64>,
}

impl Default for Autocorrelator {
    fn default() -> Self {
        Self::new()
    }
}

impl Autocorrelator {
    pub fn new() -> Self {
        Self {
            planner: FftPlanner::new(),
            buffer: Vec::new(),
            energy: Vec::new(),
        }
    }

    /// Fills `out` with one coefficient per lag, `0..signal.len()`.
    ///
    /// Lags whose overlapping region carries no energy get a coefficient of 0.
    pub fn normalized(&mut self, signal: &[f32], out: &mut Vec<f32>) {
        out.clear();
        let n = signal.len();
        if n == 0 {
            return;
        }

        // Linear (not circular) correlation needs at least 2n - 1 points.
        let size = (2 * n).next_power_of_two();
        self.buffer.clear();
        self.buffer
            .extend(signal.iter().map(|&s| Complex { re: s, im: 0.0 }));
        self.buffer.resize(size, Complex { re: 0.0, im: 0.0 });

        let forward = self.planner.plan_fft_forward(size);
        forward.process(&mut self.buffer);
        for c in self.buffer.iter_mut() {
            *c = Complex { re: c.norm_sqr(), im: 0.0 };
        }
        let inverse = self.planner.plan_fft_inverse(size);
        inverse.process(&mut self.buffer);

        // energy[k] = sum of x[j]^2 for j < k
        self.energy.clear();
        self.energy.push(0.0);
        let mut running = 0.0_f64;
        for &s in signal {
            running += (s as f64) * (s as f64);
            self.energy.push(running);
        }
        let total = running;

        let scale = 1.0 / size as f64;
        out.extend((0..n).map(|k| {
            let head = self.energy[n - k];
            let tail = total - self.energy[k];
            let denominator = (head * tail).sqrt();
            if denominator <= f64::EPSILON {
                return 0.0;
            }
            let cross = self.buffer[k].re as f64 * scale;
            (cross / denominator).clamp(-1.0, 1.0) as f32
        }));
    }
}
