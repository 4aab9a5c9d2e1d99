//! Pitch Shifter
//!
//! Shifts pitch by a number of semitones while keeping the duration: the
//! signal is time-stretched by the pitch ratio with the phase vocoder and then
//! resampled back to its original length.

use log::debug;
use serde_json::{json, Value};

use crate::dsp::effect::{Stage, StageContext};
use crate::dsp::resample::resample;
use crate::dsp::stft::Stft;
use crate::dsp::stretch::phase_vocoder_stretch;
use crate::engine::AudioBuffer;
use crate::error::{Result, VoxError};

// ============================================================================
// Constants
// ============================================================================

/// Largest shift in either direction (one octave)
pub const MAX_SEMITONES: f32 = 12.0;

/// Longest analysis window accepted, in seconds
const MAX_WINDOW_SECS: f64 = 0.5;

const STAGE: &str = "pitch_shift";

// ============================================================================
// Processing
// ============================================================================

/// Convert a semitone offset to a frequency ratio
///
/// # Arguments
/// * `semitones` - Offset in equal-tempered semitones
///
/// # Returns
/// `2^(semitones / 12)`
#[inline]
pub fn semitones_to_ratio(semitones: f32) -> f64 {
    2.0_f64.powf(semitones as f64 / 12.0)
}

/// Shift pitch without changing duration
///
/// # Arguments
/// * `buffer` - Input audio
/// * `semitones` - Shift in semitones (-12 to +12)
///
/// # Returns
/// A buffer of exactly the input length at the same sample rate
///
/// # Errors
/// * `Configuration` - semitones out of range, or the sample rate is so low
///   that one analysis window lasts longer than half a second
pub fn shift(buffer: AudioBuffer, semitones: f32) -> Result<AudioBuffer> {
    if !(-MAX_SEMITONES..=MAX_SEMITONES).contains(&semitones) {
        return Err(VoxError::config(
            STAGE,
            "pitch_shift_semitones",
            format!("{} is outside -{}..={}", semitones, MAX_SEMITONES, MAX_SEMITONES),
        ));
    }
    if semitones == 0.0 {
        return Ok(buffer);
    }

    let stft = Stft::default();
    let window_secs = stft.n_fft() as f64 / buffer.sample_rate() as f64;
    if window_secs > MAX_WINDOW_SECS {
        return Err(VoxError::config(
            STAGE,
            "sample_rate",
            format!(
                "{} Hz is too low for a {}-sample analysis window",
                buffer.sample_rate(),
                stft.n_fft()
            ),
        ));
    }

    let ratio = semitones_to_ratio(semitones);
    let rate = 1.0 / ratio;
    let length = buffer.len();

    // Stretch by 1/ratio (length grows by ratio), then squeeze back by resampling
    let stretched = phase_vocoder_stretch(buffer.samples(), rate, &stft);
    let mut shifted = resample(&stretched, rate);
    shifted.resize(length, 0.0);

    debug!(
        "Pitch shift {:+.2} st (ratio {:.4}): {} -> {} -> {} samples",
        semitones,
        ratio,
        length,
        stretched.len(),
        shifted.len()
    );

    Ok(buffer.with_samples(shifted))
}

// ============================================================================
// Stage
// ============================================================================

/// Pitch shift stage
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PitchShifter {
    semitones: f32,
}

impl PitchShifter {
    pub fn new(semitones: f32) -> Self {
        Self { semitones }
    }

    pub fn semitones(&self) -> f32 {
        self.semitones
    }
}

impl Stage for PitchShifter {
    fn name(&self) -> &'static str {
        STAGE
    }

    fn display_name(&self) -> &'static str {
        "Pitch Shift"
    }

    fn is_neutral(&self) -> bool {
        self.semitones == 0.0
    }

    fn apply(&self, buffer: AudioBuffer, _ctx: &mut StageContext) -> Result<AudioBuffer> {
        shift(buffer, self.semitones)
    }

    fn params(&self) -> Value {
        json!({
            "semitones": self.semitones,
            "ratio": semitones_to_ratio(self.semitones),
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
    use test_case::test_case;

    fn zero_crossing_frequency(samples: &[f32], sample_rate: u32) -> f32 {
        let crossings = samples
            .windows(2)
            .filter(|w| w[0] <= 0.0 && w[1] > 0.0)
            .count();
        crossings as f32 * sample_rate as f32 / samples.len() as f32
    }

    #[test]
    fn test_semitone_ratio() {
        assert_relative_eq!(semitones_to_ratio(12.0), 2.0, epsilon = 1e-12);
        assert_relative_eq!(semitones_to_ratio(-12.0), 0.5, epsilon = 1e-12);
        assert_relative_eq!(semitones_to_ratio(0.0), 1.0);
    }

    #[test]
    fn test_identity_at_zero() {
        let input = AudioBuffer::sine(330.0, 0.4, 0.5, 44100);
        assert_eq!(shift(input.clone(), 0.0).unwrap(), input);
    }

    #[test_case(-12.0 ; "octave down")]
    #[test_case(-3.5 ; "fractional down")]
    #[test_case(5.0 ; "fourth up")]
    #[test_case(12.0 ; "octave up")]
    fn test_length_preserved(semitones: f32) {
        let input = AudioBuffer::sine(440.0, 0.5, 0.75, 22050);
        let len = input.len();
        let output = shift(input, semitones).unwrap();
        assert_eq!(output.len(), len);
        assert_eq!(output.sample_rate(), 22050);
        assert!(output.is_finite());
    }

    #[test_case(220.0, 12.0, 440.0 ; "octave up")]
    #[test_case(440.0, -12.0, 220.0 ; "octave down")]
    fn test_frequency_moves_by_ratio(freq: f32, semitones: f32, expected: f32) {
        let sr = 22050;
        let input = AudioBuffer::sine(freq, 0.5, 1.0, sr);
        let output = shift(input, semitones).unwrap();

        let body = &output.samples()[4096..output.len() - 4096];
        let measured = zero_crossing_frequency(body, sr);
        assert!(
            (measured - expected).abs() < 15.0,
            "expected ~{} Hz, measured {} Hz",
            expected,
            measured
        );
    }

    #[test]
    fn test_low_sample_rate_rejected() {
        let input = AudioBuffer::sine(100.0, 0.5, 1.0, 2000);
        let err = shift(input, 2.0).unwrap_err();
        assert!(matches!(
            err,
            VoxError::Configuration { stage: "pitch_shift", .. }
        ));
    }

    #[test]
    fn test_out_of_range_rejected() {
        let input = AudioBuffer::sine(100.0, 0.5, 0.1, 44100);
        assert!(shift(input.clone(), 13.0).is_err());
        assert!(shift(input, f32::INFINITY).is_err());
    }
}
