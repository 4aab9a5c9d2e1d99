//! Three-Band Equalizer
//!
//! Splits the input into low, mid and high bands with order-2 Butterworth
//! filters, scales each band by its gain and recombines them.
//!
//! The recombined sum is divided by the number of bands. With all gains at
//! 0 dB the output is therefore roughly a third of the input level rather than
//! a reconstruction of it; the chain skips the stage in that case.

use std::thread;

use log::debug;
use serde_json::{json, Value};

use crate::dsp::effect::{Stage, StageContext};
use crate::dsp::filter::{butterworth, sosfilt, BandType};
use crate::engine::{db_to_linear, AudioBuffer};
use crate::error::Result;

// ============================================================================
// Constants
// ============================================================================

/// Crossover between the low and mid bands (Hz)
pub const LOW_CROSSOVER_HZ: f64 = 200.0;

/// Crossover between the mid and high bands (Hz)
pub const HIGH_CROSSOVER_HZ: f64 = 2000.0;

/// Number of bands summed on recombination
const NUM_BANDS: f32 = 3.0;

const STAGE: &str = "equalizer";

// ============================================================================
// Processing
// ============================================================================

/// Apply the three-band equalizer
///
/// # Arguments
/// * `buffer` - Input audio
/// * `bass_db` - Gain of the band below 200 Hz
/// * `mid_db` - Gain of the 200 Hz to 2 kHz band
/// * `treble_db` - Gain of the band above 2 kHz
///
/// # Errors
/// * `Configuration` - The sample rate puts a crossover at or above Nyquist
pub fn equalize(
    buffer: AudioBuffer,
    bass_db: f32,
    mid_db: f32,
    treble_db: f32,
) -> Result<AudioBuffer> {
    let sr = buffer.sample_rate();

    // Design everything up front so a bad sample rate fails before any work
    let bands = [
        (butterworth(BandType::LowPass(LOW_CROSSOVER_HZ), sr, STAGE)?, bass_db),
        (
            butterworth(
                BandType::BandPass(LOW_CROSSOVER_HZ, HIGH_CROSSOVER_HZ),
                sr,
                STAGE,
            )?,
            mid_db,
        ),
        (butterworth(BandType::HighPass(HIGH_CROSSOVER_HZ), sr, STAGE)?, treble_db),
    ];

    let input = buffer.samples();
    let filtered: Vec<Vec<f32>> = thread::scope(|scope| {
        let handles: Vec<_> = bands
            .iter()
            .map(|(sections, _)| scope.spawn(move || sosfilt(sections, input)))
            .collect();
        handles
            .into_iter()
            .map(|handle| match handle.join() {
                Ok(band) => band,
                Err(panic) => std::panic::resume_unwind(panic),
            })
            .collect()
    });

    let gains: Vec<f32> = bands.iter().map(|(_, db)| db_to_linear(*db)).collect();
    let mixed: Vec<f32> = (0..input.len())
        .map(|n| {
            let sum: f32 = filtered
                .iter()
                .zip(&gains)
                .map(|(band, g)| band[n] * g)
                .sum();
            sum / NUM_BANDS
        })
        .collect();

    debug!(
        "EQ bass {:+.1} dB, mid {:+.1} dB, treble {:+.1} dB at {} Hz",
        bass_db, mid_db, treble_db, sr
    );

    Ok(buffer.with_samples(mixed))
}

// ============================================================================
// Stage
// ============================================================================

/// Three-band equalizer stage
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ThreeBandEqualizer {
    bass_db: f32,
    mid_db: f32,
    treble_db: f32,
}

impl ThreeBandEqualizer {
    pub fn new(bass_db: f32, mid_db: f32, treble_db: f32) -> Self {
        Self {
            bass_db,
            mid_db,
            treble_db,
        }
    }
}

impl Stage for ThreeBandEqualizer {
    fn name(&self) -> &'static str {
        STAGE
    }

    fn display_name(&self) -> &'static str {
        "3-Band EQ"
    }

    fn is_neutral(&self) -> bool {
        self.bass_db == 0.0 && self.mid_db == 0.0 && self.treble_db == 0.0
    }

    fn apply(&self, buffer: AudioBuffer, _ctx: &mut StageContext) -> Result<AudioBuffer> {
        equalize(buffer, self.bass_db, self.mid_db, self.treble_db)
    }

    fn params(&self) -> Value {
        json!({
            "bass_db": self.bass_db,
            "mid_db": self.mid_db,
            "treble_db": self.treble_db,
        })
    }
}

// ============================================================================
// Tests
// ============================================================================
