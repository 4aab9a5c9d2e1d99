//! voxfx - Offline Voice Effects Pipeline
//!
//! Applies a fixed sequence of optional effects to a mono sample buffer:
//! pitch shift, time stretch, gain, 3-band EQ, spectral noise reduction,
//! synthetic reverb, multi-tap echo and robot voice, followed by a peak
//! normalizer that always runs.
//!
//! # Architecture
//!
//! - `engine`: the mono `AudioBuffer`, WAV I/O and the cancellation token
//! - `dsp`: the transforms (STFT, filters, convolution, resampling), the
//!   stages built on them and the `EffectChain` that runs them in order
//! - `cli`: the `voxfx` command-line front end
//!
//! # Example
//!
//! ```
//! use voxfx::dsp::{EffectChain, EffectParameters};
//! use voxfx::engine::AudioBuffer;
//!
//! let params = EffectParameters {
//!     gain_db: 6.0,
//!     ..Default::default()
//! };
//! let input = AudioBuffer::sine(440.0, 0.5, 0.1, 44100);
//! let output = EffectChain::new(&params)?.with_seed(7).process(input)?;
//! assert!(output.peak() <= 0.95 + 1e-6);
//! # Ok::<(), voxfx::VoxError>(())
//! ```

pub mod cli;
pub mod dsp;
pub mod engine;
pub mod error;

pub use dsp::{EffectChain, EffectParameters};
pub use engine::{AudioBuffer, CancellationToken};
pub use error::{Result, VoxError};
