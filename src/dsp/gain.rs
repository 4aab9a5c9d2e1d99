//! Gain Stage
//!
//! Linear amplitude scaling from a decibel value. No clipping is applied here;
//! the normalizer at the end of the chain limits the peak.

use serde_json::{json, Value};

use crate::dsp::effect::{Stage, StageContext};
use crate::engine::{db_to_linear, AudioBuffer};
use crate::error::Result;

// ============================================================================
// Constants
// ============================================================================

/// Minimum gain in dB
pub const MIN_GAIN_DB: f32 = -20.0;

/// Maximum gain in dB
pub const MAX_GAIN_DB: f32 = 20.0;

// ============================================================================
// Processing
// ============================================================================

/// Scale every sample by `10^(db / 20)`
///
/// # Arguments
/// * `buffer` - Input audio
/// * `db` - Gain in decibels
///
/// # Returns
/// The scaled buffer; unchanged at 0 dB
pub fn gain(mut buffer: AudioBuffer, db: f32) -> AudioBuffer {
    if db == 0.0 {
        return buffer;
    }

    let linear = db_to_linear(db);
    for sample in buffer.samples_mut() {
        *sample *= linear;
    }
    buffer
}

// ============================================================================
// Gain Stage
// ============================================================================

/// Gain adjustment stage
///
/// # Parameters
/// - `gain_db`: Gain in decibels (-20 to +20 dB)
///
/// # Example
/// ```
/// use voxfx::dsp::{Gain, Stage, StageContext};
/// use voxfx::engine::AudioBuffer;
///
/// let stage = Gain::new(-6.0);
/// let buffer = AudioBuffer::new(vec![1.0; 4], 44100);
/// let out = stage.apply(buffer, &mut StageContext::new(0)).unwrap();
/// assert!((out.samples()[0] - 0.501).abs() < 1e-3);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Gain {
    gain_db: f32,
}

impl Gain {
    /// Create a new gain stage
    ///
    /// # Arguments
    /// * `gain_db` - Gain in decibels; range is checked by `EffectParameters::validate`
    pub fn new(gain_db: f32) -> Self {
        Self { gain_db }
    }

    /// Get the gain in decibels
    pub fn gain_db(&self) -> f32 {
        self.gain_db
    }

    /// Get the linear gain multiplier
    pub fn gain_linear(&self) -> f32 {
        db_to_linear(self.gain_db)
    }
}

impl Stage for Gain {
    fn name(&self) -> &'static str {
        "gain"
    }

    fn display_name(&self) -> &'static str {
        "Gain"
    }

    fn is_neutral(&self) -> bool {
        self.gain_db == 0.0
    }

    fn apply(&self, buffer: AudioBuffer, _ctx: &mut StageContext) -> Result<AudioBuffer> {
        Ok(gain(buffer, self.gain_db))
    }

    fn params(&self) -> Value {
        json!({
            "gain_db": self.gain_db,
            "gain_linear": self.gain_linear(),
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

    fn create_test_buffer(value: f32) -> AudioBuffer {
        AudioBuffer::new(vec![value; 256], 44100)
    }

    #[test]
    fn test_gain_unity() {
        let buffer = create_test_buffer(0.5);
        let output = gain(buffer.clone(), 0.0);
        assert_eq!(output, buffer);
    }

    #[test]
    fn test_gain_boost() {
        // +6 dB is approximately 2x amplitude
        let output = gain(create_test_buffer(0.25), 6.0);
        for &sample in output.samples() {
            assert_relative_eq!(sample, 0.25 * 1.9953, epsilon = 1e-3);
        }
    }

    #[test]
    fn test_gain_cut() {
        // -6 dB is approximately 0.5x amplitude
        let output = gain(create_test_buffer(0.5), -6.0);
        for &sample in output.samples() {
            assert_relative_eq!(sample, 0.5 * 0.5012, epsilon = 1e-3);
        }
    }

    #[test]
    fn test_gain_round_trip() {
        let input = AudioBuffer::sine(440.0, 0.3, 0.05, 44100);
        let output = gain(gain(input.clone(), 13.5), -13.5);
        for (a, b) in input.samples().iter().zip(output.samples()) {
            assert_relative_eq!(a, b, epsilon = 1e-5);
        }
    }

    #[test]
    fn test_gain_does_not_clip() {
        let output = gain(create_test_buffer(0.9), 20.0);
        assert!(output.peak() > 8.0);
    }

    #[test]
    fn test_gain_stage() {
        let stage = Gain::new(6.0);
        assert!(!stage.is_neutral());
        assert!(Gain::default().is_neutral());
        assert_relative_eq!(stage.gain_linear(), 1.9953, epsilon = 1e-3);

        let params = stage.params();
        assert_eq!(params["gain_db"], 6.0);
    }
}
