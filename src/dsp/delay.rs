//! Multi-Tap Echo
//!
//! Adds three delayed, progressively quieter copies of the signal on top of
//! the dry signal. Unlike the reverb there is no wet/dry crossfade: the dry
//! signal always passes at full level.

use serde_json::{json, Value};

use crate::dsp::effect::{Stage, StageContext};
use crate::engine::AudioBuffer;
use crate::error::Result;

/// Number of echo taps
pub const NUM_TAPS: usize = 3;

/// Longest supported delay in milliseconds
pub const MAX_DELAY_MS: f32 = 1000.0;

/// Highest supported per-tap decay
pub const MAX_DECAY: f32 = 0.9;

/// Convert a delay in milliseconds to whole samples (rounded)
#[inline]
pub fn delay_samples(delay_ms: f32, sample_rate: u32) -> usize {
    (sample_rate as f64 * delay_ms as f64 / 1000.0).round() as usize
}

/// Apply the multi-tap echo
///
/// Tap `i` (1 to 3) is the input delayed by `i * delay` samples and scaled by
/// `decay^i`. Taps that start past the end of the buffer contribute nothing.
///
/// # Arguments
/// * `buffer` - Input audio
/// * `delay_ms` - Spacing between taps in milliseconds
/// * `decay` - Gain applied per tap
///
/// # Returns
/// The buffer with the taps added; unchanged when the delay rounds to zero
/// samples or decay is zero
pub fn echo(buffer: AudioBuffer, delay_ms: f32, decay: f32) -> AudioBuffer {
    let delay = delay_samples(delay_ms, buffer.sample_rate());
    if delay == 0 || decay == 0.0 {
        return buffer;
    }

    let len = buffer.len();
    let mut taps = vec![0.0f32; len];
    let mut tap_gain = 1.0f32;
    for i in 1..=NUM_TAPS {
        tap_gain *= decay;
        let offset = i * delay;
        if offset >= len {
            break;
        }
        for (out, &x) in taps[offset..].iter_mut().zip(buffer.samples()) {
            *out += x * tap_gain;
        }
    }

    let mut buffer = buffer;
    for (sample, tap) in buffer.samples_mut().iter_mut().zip(&taps) {
        *sample += tap;
    }
    buffer
}

/// Multi-tap echo stage
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MultiTapEcho {
    delay_ms: f32,
    decay: f32,
}

impl MultiTapEcho {
    pub fn new(delay_ms: f32, decay: f32) -> Self {
        Self { delay_ms, decay }
    }
}

impl Stage for MultiTapEcho {
    fn name(&self) -> &'static str {
        "echo"
    }

    fn display_name(&self) -> &'static str {
        "Echo"
    }

    fn is_neutral(&self) -> bool {
        self.delay_ms == 0.0 || self.decay == 0.0
    }

    fn apply(&self, buffer: AudioBuffer, _ctx: &mut StageContext) -> Result<AudioBuffer> {
        Ok(echo(buffer, self.delay_ms, self.decay))
    }

    fn params(&self) -> Value {
        json!({
            "delay_ms": self.delay_ms,
            "decay": self.decay,
            "taps": NUM_TAPS,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn impulse(len: usize, sample_rate: u32) -> AudioBuffer {
        let mut samples = vec![0.0; len];
        samples[0] = 1.0;
        AudioBuffer::new(samples, sample_rate)
    }

    #[test]
    fn test_delay_samples_rounds() {
        assert_eq!(delay_samples(250.0, 44100), 11025);
        assert_eq!(delay_samples(0.01, 44100), 0);
        assert_eq!(delay_samples(0.02, 44100), 1);
    }

    #[test]
    fn test_three_taps_on_impulse() {
        let output = echo(impulse(44100, 44100), 250.0, 0.5);
        let s = output.samples();

        assert_relative_eq!(s[0], 1.0);
        assert_relative_eq!(s[11025], 0.5);
        assert_relative_eq!(s[22050], 0.25);
        assert_relative_eq!(s[33075], 0.125);

        let nonzero = s.iter().filter(|&&x| x != 0.0).count();
        assert_eq!(nonzero, 4);
    }

    #[test]
    fn test_taps_past_end_are_dropped() {
        // Only the first tap fits in 300 samples with a 200-sample delay
        let output = echo(impulse(300, 1000), 200.0, 0.5);
        let nonzero: Vec<usize> = output
            .samples()
            .iter()
            .enumerate()
            .filter(|(_, x)| **x != 0.0)
            .map(|(i, _)| i)
            .collect();
        assert_eq!(nonzero, vec![0, 200]);
    }

    #[test]
    fn test_noop_cases() {
        let input = AudioBuffer::sine(440.0, 0.5, 0.1, 44100);
        assert_eq!(echo(input.clone(), 0.0, 0.5), input);
        assert_eq!(echo(input.clone(), 250.0, 0.0), input);
        assert_eq!(echo(input.clone(), 0.001, 0.5), input);
    }

    #[test]
    fn test_stage_neutrality() {
        assert!(MultiTapEcho::default().is_neutral());
        assert!(MultiTapEcho::new(100.0, 0.0).is_neutral());
        assert!(MultiTapEcho::new(0.0, 0.4).is_neutral());
        assert!(!MultiTapEcho::new(100.0, 0.4).is_neutral());
    }
}
