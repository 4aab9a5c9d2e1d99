//! Stage trait definition
//!
//! Base trait for every processing stage in the effect chain.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde_json::Value;

use crate::engine::AudioBuffer;
use crate::error::Result;

/// Per-run state handed to each stage
///
/// Stages are stateless; anything that varies between runs (currently only
/// the random source) lives here so a run is reproducible from its seed.
#[derive(Debug, Clone)]
pub struct StageContext {
    seed: u64,
    /// Random source for stochastic stages
    pub rng: ChaCha8Rng,
}

impl StageContext {
    /// Create a context whose random source is seeded with `seed`
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Seed the random source was created with
    pub fn seed(&self) -> u64 {
        self.seed
    }
}

/// Base trait for all processing stages
///
/// A stage consumes its input buffer and returns a new one. Stages hold only
/// their parameters, so the same stage can process any number of buffers.
pub trait Stage: Send + Sync + std::fmt::Debug {
    /// Stable identifier, used in logs and errors
    fn name(&self) -> &'static str;

    /// Human-readable name
    fn display_name(&self) -> &'static str;

    /// True when the parameters make this stage a no-op
    ///
    /// The chain skips neutral stages entirely.
    fn is_neutral(&self) -> bool;

    /// Process one buffer
    ///
    /// # Arguments
    /// * `buffer` - Input audio, consumed
    /// * `ctx` - Per-run state (random source)
    ///
    /// # Returns
    /// The processed buffer at the same sample rate
    ///
    /// # Errors
    /// `Configuration` when the parameters cannot be applied at the buffer's
    /// sample rate
    fn apply(&self, buffer: AudioBuffer, ctx: &mut StageContext) -> Result<AudioBuffer>;

    /// Current parameters as JSON (for reports and logs)
    fn params(&self) -> Value;
}
