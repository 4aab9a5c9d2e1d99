//! Time Stretcher
//!
//! Phase-vocoder time stretching: duration changes by `1 / rate`, pitch is
//! unchanged.

use std::f64::consts::PI;

use log::{debug, warn};
use rustfft::num_complex::Complex32;
use serde_json::{json, Value};

use crate::dsp::effect::{Stage, StageContext};
use crate::dsp::stft::{Spectrum, Stft};
use crate::engine::AudioBuffer;
use crate::error::{Result, VoxError};

/// Slowest supported rate (doubles the duration)
pub const MIN_RATE: f32 = 0.5;

/// Fastest supported rate (halves the duration)
pub const MAX_RATE: f32 = 2.0;

const STAGE: &str = "time_stretch";

/// Stretch a buffer in time without changing its pitch
///
/// Output length is `round(len / rate)`. Buffers shorter than one analysis
/// frame are returned unchanged.
///
/// # Errors
/// * `Configuration` - rate outside 0.5..=2.0 or not finite
pub fn stretch(buffer: AudioBuffer, rate: f32) -> Result<AudioBuffer> {
    if !(MIN_RATE..=MAX_RATE).contains(&rate) {
        return Err(VoxError::config(
            STAGE,
            "time_stretch_rate",
            format!("{} is outside {}..={}", rate, MIN_RATE, MAX_RATE),
        ));
    }
    if rate == 1.0 {
        return Ok(buffer);
    }

    let stft = Stft::default();
    if buffer.len() < stft.n_fft() {
        warn!(
            "Time stretch skipped: {} samples is shorter than one {}-sample frame",
            buffer.len(),
            stft.n_fft()
        );
        return Ok(buffer);
    }

    let stretched = phase_vocoder_stretch(buffer.samples(), rate as f64, &stft);
    Ok(buffer.with_samples(stretched))
}

/// Stretch samples by `rate` with the given transform; no range checks
pub(crate) fn phase_vocoder_stretch(samples: &[f32], rate: f64, stft: &Stft) -> Vec<f32> {
    let target_len = (samples.len() as f64 / rate).round() as usize;
    let frames = stft.forward(samples);
    let stretched = phase_vocoder(&frames, rate, stft.hop(), stft.n_fft());
    stft.inverse(&stretched, target_len)
}

/// Resample a frame sequence in time with running phase accumulation
///
/// Output frame `k` reads analysis position `k * rate`: magnitudes are
/// interpolated between the neighbouring frames and the phase advances by the
/// measured per-bin instantaneous frequency, so partials stay continuous
/// across frame boundaries.
fn phase_vocoder(frames: &[Spectrum], rate: f64, hop: usize, n_fft: usize) -> Vec<Spectrum> {
    let Some(first) = frames.first() else {
        return Vec::new();
    };
    let num_bins = first.len();
    let num_frames = frames.len();

    // Expected phase advance per hop for the center frequency of each bin
    let expected: Vec<f64> = (0..num_bins)
        .map(|k| 2.0 * PI * hop as f64 * k as f64 / n_fft as f64)
        .collect();
    let mut phase: Vec<f64> = first.iter().map(|c| c.arg() as f64).collect();

    // Positions past the last frame interpolate toward silence
    let silent: Spectrum = vec![Complex32::new(0.0, 0.0); num_bins];

    let num_steps = (num_frames as f64 / rate).ceil() as usize;
    let mut output = Vec::with_capacity(num_steps);

    for step in 0..num_steps {
        let position = step as f64 * rate;
        if position >= num_frames as f64 {
            break;
        }
        let index = position.floor() as usize;
        let alpha = position - index as f64;
        let current = frames.get(index).unwrap_or(&silent);
        let next = frames.get(index + 1).unwrap_or(&silent);

        let mut frame = Vec::with_capacity(num_bins);
        for k in 0..num_bins {
            let magnitude =
                (1.0 - alpha) * current[k].norm() as f64 + alpha * next[k].norm() as f64;
            frame.push(Complex32::from_polar(magnitude as f32, phase[k] as f32));

            let mut deviation = next[k].arg() as f64 - current[k].arg() as f64 - expected[k];
            deviation -= 2.0 * PI * (deviation / (2.0 * PI)).round();
            phase[k] = wrap_phase(phase[k] + expected[k] + deviation);
        }
        output.push(frame);
    }

    debug!(
        "Phase vocoder: {} analysis frames -> {} synthesis frames (rate {:.3})",
        num_frames,
        output.len(),
        rate
    );
    output
}

/// Keep the running phase in (-pi, pi] so f32 conversion stays precise
#[inline]
fn wrap_phase(phase: f64) -> f64 {
    phase - 2.0 * PI * (phase / (2.0 * PI)).round()
}

// ============================================================================
// Stage
// ============================================================================

/// Time stretch stage
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeStretcher {
    rate: f32,
}

impl TimeStretcher {
    pub fn new(rate: f32) -> Self {
        Self { rate }
    }

    pub fn rate(&self) -> f32 {
        self.rate
    }
}

impl Default for TimeStretcher {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl Stage for TimeStretcher {
    fn name(&self) -> &'static str {
        STAGE
    }

    fn display_name(&self) -> &'static str {
        "Time Stretch"
    }

    fn is_neutral(&self) -> bool {
        self.rate == 1.0
    }

    fn apply(&self, buffer: AudioBuffer, _ctx: &mut StageContext) -> Result<AudioBuffer> {
        stretch(buffer, self.rate)
    }

    fn params(&self) -> Value {
        json!({ "rate": self.rate })
    }
}

// ============================================================================
// Tests
// ============================================================================
