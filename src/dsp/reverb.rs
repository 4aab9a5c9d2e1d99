//! Synthetic Reverb
//!
//! Convolution reverb with a generated impulse response: Gaussian noise under
//! an exponential decay envelope, normalized to unit peak. The result is a
//! wet/dry crossfade of the convolved and original signals.

use std::f64::consts::PI;

use log::debug;
use rand::Rng;
use serde_json::{json, Value};

use crate::dsp::convolution::{convolve, ConvolveMode};
use crate::dsp::effect::{Stage, StageContext};
use crate::engine::{buffer::peak, AudioBuffer};
use crate::error::{Result, VoxError};

// ============================================================================
// Constants
// ============================================================================

/// Impulse response length per unit of room size, in seconds
const SECONDS_PER_ROOM: f64 = 0.5;

/// The envelope runs `exp(-t)` for `t` from 0 to this value over the IR
const DECAY_SPAN: f64 = 5.0;

/// Default room size
pub const DEFAULT_ROOM_SIZE: f32 = 0.5;

const STAGE: &str = "reverb";

// ============================================================================
// Impulse Response
// ============================================================================

/// One standard normal draw (Box-Muller)
fn standard_normal<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    // Shift to (0, 1] so ln never sees zero
    let u1 = 1.0 - rng.random::<f64>();
    let u2 = rng.random::<f64>();
    (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos()
}

/// Generate a decaying noise impulse response
///
/// # Arguments
/// * `sample_rate` - Sample rate in Hz
/// * `room_size` - Room size (0.1 to 1.0); the IR lasts `room_size * 0.5` s
/// * `rng` - Random source for the noise
///
/// # Returns
/// `floor(sample_rate * room_size * 0.5)` samples with peak magnitude 1
///
/// # Errors
/// * `Configuration` - The IR would be empty
pub fn impulse_response<R: Rng + ?Sized>(
    sample_rate: u32,
    room_size: f32,
    rng: &mut R,
) -> Result<Vec<f32>> {
    let length = (sample_rate as f64 * room_size as f64 * SECONDS_PER_ROOM).floor() as usize;
    if length == 0 {
        return Err(VoxError::config(
            STAGE,
            "reverb_room_size",
            format!(
                "room size {} at {} Hz gives an empty impulse response",
                room_size, sample_rate
            ),
        ));
    }

    let step = if length > 1 {
        DECAY_SPAN / (length - 1) as f64
    } else {
        0.0
    };
    let mut ir: Vec<f32> = (0..length)
        .map(|i| ((-(i as f64) * step).exp() * standard_normal(rng)) as f32)
        .collect();

    let ir_peak = peak(&ir);
    if ir_peak > 0.0 {
        for sample in ir.iter_mut() {
            *sample /= ir_peak;
        }
    }
    Ok(ir)
}

// ============================================================================
// Processing
// ============================================================================

/// Apply the synthetic reverb
///
/// # Arguments
/// * `buffer` - Input audio
/// * `amount` - Wet mix (0 to 1); output is `(1 - amount) * dry + amount * wet`
/// * `room_size` - Room size (0.1 to 1.0)
/// * `rng` - Random source for the impulse response
///
/// # Errors
/// * `Configuration` - amount out of range, or the IR would be empty
pub fn reverb<R: Rng + ?Sized>(
    buffer: AudioBuffer,
    amount: f32,
    room_size: f32,
    rng: &mut R,
) -> Result<AudioBuffer> {
    if !(0.0..=1.0).contains(&amount) {
        return Err(VoxError::config(
            STAGE,
            "reverb_amount",
            format!("{} is outside 0..=1", amount),
        ));
    }

    let ir = impulse_response(buffer.sample_rate(), room_size, rng)?;
    let wet = convolve(buffer.samples(), &ir, ConvolveMode::Same);

    let mixed: Vec<f32> = buffer
        .samples()
        .iter()
        .zip(&wet)
        .map(|(&dry, &wet)| (1.0 - amount) * dry + amount * wet)
        .collect();

    debug!(
        "Reverb amount {:.2}, room {:.2}: {}-sample impulse response",
        amount,
        room_size,
        ir.len()
    );

    Ok(buffer.with_samples(mixed))
}

// ============================================================================
// Stage
// ============================================================================

/// Synthetic reverb stage
///
/// Draws its impulse response from the run's random source, so two runs with
/// the same seed produce identical output.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SyntheticReverb {
    amount: f32,
    room_size: f32,
}

impl SyntheticReverb {
    pub fn new(amount: f32, room_size: f32) -> Self {
        Self { amount, room_size }
    }
}

impl Default for SyntheticReverb {
    fn default() -> Self {
        Self::new(0.0, DEFAULT_ROOM_SIZE)
    }
}

impl Stage for SyntheticReverb {
    fn name(&self) -> &'static str {
        STAGE
    }

    fn display_name(&self) -> &'static str {
        "Reverb"
    }

    fn is_neutral(&self) -> bool {
        self.amount == 0.0
    }

    fn apply(&self, buffer: AudioBuffer, ctx: &mut StageContext) -> Result<AudioBuffer> {
        reverb(buffer, self.amount, self.room_size, &mut ctx.rng)
    }

    fn params(&self) -> Value {
        json!({
            "amount": self.amount,
            "room_size": self.room_size,
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
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_impulse_response_shape() {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let ir = impulse_response(44100, 0.5, &mut rng).unwrap();

        assert_eq!(ir.len(), 11025);
        assert_relative_eq!(peak(&ir), 1.0, epsilon = 1e-6);

        // Energy decays: the first tenth is far louder than the last
        let tenth = ir.len() / 10;
        let energy = |s: &[f32]| s.iter().map(|x| x * x).sum::<f32>();
        assert!(energy(&ir[..tenth]) > 20.0 * energy(&ir[ir.len() - tenth..]));
    }

    #[test]
    fn test_impulse_response_length_floors() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        // 22050 * 0.3 * 0.5 = 3307.5
        assert_eq!(impulse_response(22050, 0.3, &mut rng).unwrap().len(), 3307);
    }

    #[test]
    fn test_standard_normal_moments() {
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        let draws: Vec<f64> = (0..20000).map(|_| standard_normal(&mut rng)).collect();
        let mean = draws.iter().sum::<f64>() / draws.len() as f64;
        let var = draws.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / draws.len() as f64;
        assert!(mean.abs() < 0.05);
        assert!((var - 1.0).abs() < 0.05);
    }

    #[test]
    fn test_same_seed_same_output() {
        let input = AudioBuffer::sine(300.0, 0.5, 0.3, 22050);
        let a = reverb(input.clone(), 0.4, 0.5, &mut ChaCha8Rng::seed_from_u64(5)).unwrap();
        let b = reverb(input.clone(), 0.4, 0.5, &mut ChaCha8Rng::seed_from_u64(5)).unwrap();
        let c = reverb(input, 0.4, 0.5, &mut ChaCha8Rng::seed_from_u64(6)).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_output_length_and_dry_mix() {
        let input = AudioBuffer::sine(300.0, 0.5, 0.3, 22050);
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let dry = reverb(input.clone(), 0.0, 0.5, &mut rng).unwrap();
        assert_eq!(dry.len(), input.len());
        for (a, b) in dry.samples().iter().zip(input.samples()) {
            assert_relative_eq!(a, b);
        }
    }

    #[test]
    fn test_empty_impulse_response_rejected() {
        let input = AudioBuffer::new(vec![0.5; 4], 2);
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let err = reverb(input, 0.5, 0.5, &mut rng).unwrap_err();
        assert!(matches!(err, VoxError::Configuration { stage: "reverb", .. }));
    }

    #[test]
    fn test_stage_uses_context_rng() {
        let stage = SyntheticReverb::new(0.5, 0.2);
        let input = AudioBuffer::sine(440.0, 0.5, 0.2, 16000);
        let a = stage.apply(input.clone(), &mut StageContext::new(11)).unwrap();
        let b = stage.apply(input, &mut StageContext::new(11)).unwrap();
        assert_eq!(a, b);
        assert!(!stage.is_neutral());
        assert!(SyntheticReverb::default().is_neutral());
    }
}
