//! Spectral Noise Gate
//!
//! Estimates a per-frequency noise floor from the quietest frames of the STFT
//! and attenuates bins that fall below it. Phase is left untouched.

use log::debug;
use serde_json::{json, Value};

use crate::dsp::effect::{Stage, StageContext};
use crate::dsp::stft::{Spectrum, Stft};
use crate::engine::AudioBuffer;
use crate::error::{Result, VoxError};

// ============================================================================
// Constants
// ============================================================================

/// Percentile of each bin's magnitude over time taken as its noise floor
pub const NOISE_FLOOR_PERCENTILE: f32 = 10.0;

/// Added to the floor so silent bins do not divide by zero
const FLOOR_EPSILON: f32 = 1e-10;

const STAGE: &str = "noise_gate";

// ============================================================================
// Helper Functions
// ============================================================================

/// Percentile with linear interpolation between order statistics
///
/// # Arguments
/// * `values` - Samples; reordered in place
/// * `percentile` - 0 to 100
///
/// # Returns
/// The interpolated value, or 0 for an empty slice
pub fn percentile(values: &mut [f32], percentile: f32) -> f32 {
    if values.is_empty() {
        return 0.0;
    }
    values.sort_by(|a, b| a.total_cmp(b));

    let rank = (percentile / 100.0).clamp(0.0, 1.0) as f64 * (values.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let frac = (rank - lo as f64) as f32;
    values[lo] + (values[hi] - values[lo]) * frac
}

/// Per-bin noise floor across all frames
fn noise_floor(frames: &[Spectrum], num_bins: usize) -> Vec<f32> {
    let mut column = Vec::with_capacity(frames.len());
    (0..num_bins)
        .map(|k| {
            column.clear();
            column.extend(frames.iter().map(|frame| frame[k].norm()));
            percentile(&mut column, NOISE_FLOOR_PERCENTILE)
        })
        .collect()
}

/// Soft mask for one bin: `min((magnitude / floor)^(1 - strength), 1)`
#[inline]
pub(crate) fn gate_mask(magnitude: f32, floor: f32, strength: f32) -> f32 {
    (magnitude / (floor + FLOOR_EPSILON))
        .powf(1.0 - strength)
        .min(1.0)
}

// ============================================================================
// Processing
// ============================================================================

/// Reduce stationary background noise
///
/// Bins quieter than their noise floor are scaled by the soft mask; bins at
/// or above it pass unchanged. Higher strength flattens the mask exponent, so
/// at strength 1 every bin passes.
///
/// # Arguments
/// * `buffer` - Input audio
/// * `strength` - Mask exponent control (0 to 1)
///
/// # Returns
/// A buffer of exactly the input length
///
/// # Errors
/// * `Configuration` - strength outside 0..=1
pub fn denoise(buffer: AudioBuffer, strength: f32) -> Result<AudioBuffer> {
    if !(0.0..=1.0).contains(&strength) {
        return Err(VoxError::config(
            STAGE,
            "noise_reduction_strength",
            format!("{} is outside 0..=1", strength),
        ));
    }

    let stft = Stft::default();
    let mut frames = stft.forward(buffer.samples());
    let floor = noise_floor(&frames, stft.num_bins());

    let mut attenuated_bins = 0usize;
    for frame in frames.iter_mut() {
        for (bin, &bin_floor) in frame.iter_mut().zip(&floor) {
            let mask = gate_mask(bin.norm(), bin_floor, strength);
            if mask < 1.0 {
                attenuated_bins += 1;
            }
            *bin *= mask;
        }
    }

    debug!(
        "Noise gate strength {:.2}: attenuated {} of {} bins",
        strength,
        attenuated_bins,
        frames.len() * stft.num_bins()
    );

    let cleaned = stft.inverse(&frames, buffer.len());
    Ok(buffer.with_samples(cleaned))
}

// ============================================================================
// Stage
// ============================================================================

/// Spectral noise gate stage
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SpectralNoiseGate {
    strength: f32,
}

impl SpectralNoiseGate {
    pub fn new(strength: f32) -> Self {
        Self { strength }
    }
}

impl Stage for SpectralNoiseGate {
    fn name(&self) -> &'static str {
        STAGE
    }

    fn display_name(&self) -> &'static str {
        "Noise Reduction"
    }

    fn is_neutral(&self) -> bool {
        self.strength == 0.0
    }

    fn apply(&self, buffer: AudioBuffer, _ctx: &mut StageContext) -> Result<AudioBuffer> {
        denoise(buffer, self.strength)
    }

    fn params(&self) -> Value {
        json!({
            "strength": self.strength,
            "floor_percentile": NOISE_FLOOR_PERCENTILE,
        })
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    fn noisy_tone() -> AudioBuffer {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let tone = AudioBuffer::sine(500.0, 0.4, 0.5, 16000);
        let samples = tone
            .samples()
            .iter()
            .map(|s| s + rng.random_range(-0.05..0.05))
            .collect();
        tone.with_samples(samples)
    }

    #[test]
    fn test_percentile_interpolates() {
        let mut values = vec![4.0, 1.0, 3.0, 2.0, 5.0];
        // rank = 0.1 * 4 = 0.4 between 1 and 2
        assert_relative_eq!(percentile(&mut values, 10.0), 1.4, epsilon = 1e-6);
        assert_relative_eq!(percentile(&mut values, 50.0), 3.0);
        assert_relative_eq!(percentile(&mut values, 100.0), 5.0);
        assert_eq!(percentile(&mut [], 10.0), 0.0);
        assert_eq!(percentile(&mut [7.0], 10.0), 7.0);
    }

    #[test]
    fn test_mask_never_amplifies() {
        for &strength in &[0.0, 0.25, 0.5, 0.75, 1.0] {
            for &magnitude in &[0.0, 1e-6, 0.01, 0.5, 1.0, 10.0, 1e4] {
                for &floor in &[0.0, 1e-4, 0.1, 1.0] {
                    let mask = gate_mask(magnitude, floor, strength);
                    assert!(mask <= 1.0, "mask {} at m={} f={}", mask, magnitude, floor);
                    assert!(mask >= 0.0);
                }
            }
        }
    }

    #[test]
    fn test_mask_grows_with_strength() {
        // Below the floor a stronger setting lets more of the bin through
        assert!(gate_mask(0.01, 0.1, 0.2) <= gate_mask(0.01, 0.1, 0.8));

        for &magnitude in &[0.0, 0.001, 0.01, 0.05, 0.1, 0.5] {
            let masks: Vec<f32> = (0..=10)
                .map(|step| gate_mask(magnitude, 0.1, step as f32 / 10.0))
                .collect();
            for pair in masks.windows(2) {
                assert!(pair[0] <= pair[1], "m={} masks {:?}", magnitude, masks);
            }
            assert_relative_eq!(masks[10], 1.0);
        }
    }

    #[test]
    fn test_mask_attenuates_below_floor() {
        assert!(gate_mask(0.01, 0.1, 0.0) < 0.11);
        assert_eq!(gate_mask(0.5, 0.1, 0.0), 1.0);
    }

    #[test]
    fn test_output_length_matches_input() {
        let input = noisy_tone();
        let output = denoise(input.clone(), 0.6).unwrap();
        assert_eq!(output.len(), input.len());
        assert!(output.is_finite());
    }

    #[test]
    fn test_full_strength_passes_every_bin() {
        let input = noisy_tone();
        let output = denoise(input.clone(), 1.0).unwrap();
        for (a, b) in input.samples().iter().zip(output.samples()) {
            assert!((a - b).abs() < 1e-3);
        }
    }

    #[test]
    fn test_gate_does_not_add_energy() {
        let input = noisy_tone();
        let output = denoise(input.clone(), 0.0).unwrap();
        let energy = |b: &AudioBuffer| b.samples().iter().map(|s| s * s).sum::<f32>();
        assert!(energy(&output) <= energy(&input) * 1.01);
    }

    #[test]
    fn test_strength_out_of_range() {
        assert!(denoise(noisy_tone(), 1.5).is_err());
        assert!(denoise(noisy_tone(), -0.1).is_err());
    }
}
