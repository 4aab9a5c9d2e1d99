//! Normalizer
//!
//! Peak safeguard at the end of the chain. Scales the whole buffer down when
//! its peak exceeds the ceiling; quieter buffers pass unchanged.

use log::debug;
use serde_json::{json, Value};

use crate::dsp::effect::{Stage, StageContext};
use crate::engine::{linear_to_db, AudioBuffer};
use crate::error::Result;

// ============================================================================
// Constants
// ============================================================================

/// Highest absolute sample value after normalization
pub const PEAK_CEILING: f32 = 0.95;

// ============================================================================
// Processing
// ============================================================================

/// Scale the buffer so its peak does not exceed [`PEAK_CEILING`]
///
/// # Arguments
/// * `buffer` - Input audio
///
/// # Returns
/// The buffer scaled by `0.95 / peak` if `peak > 0.95`, otherwise unchanged
pub fn normalize(mut buffer: AudioBuffer) -> AudioBuffer {
    let peak = buffer.peak();
    if peak <= PEAK_CEILING {
        return buffer;
    }

    let scale = PEAK_CEILING / peak;
    for sample in buffer.samples_mut() {
        *sample *= scale;
    }

    debug!(
        "Normalized peak {:.3} ({:+.2} dBFS) to {}",
        peak,
        linear_to_db(peak),
        PEAK_CEILING
    );
    buffer
}

// ============================================================================
// Normalizer Stage
// ============================================================================

/// Final peak normalizer; never skipped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Normalizer;

impl Normalizer {
    pub fn new() -> Self {
        Self
    }
}

impl Stage for Normalizer {
    fn name(&self) -> &'static str {
        "normalizer"
    }

    fn display_name(&self) -> &'static str {
        "Normalizer"
    }

    fn is_neutral(&self) -> bool {
        false
    }

    fn apply(&self, buffer: AudioBuffer, _ctx: &mut StageContext) -> Result<AudioBuffer> {
        Ok(normalize(buffer))
    }

    fn params(&self) -> Value {
        json!({ "ceiling": PEAK_CEILING })
    }
}

// ============================================================================
// Tests
// ============================================================================
