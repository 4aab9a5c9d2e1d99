//! DSP Effects Library
//!
//! The processing stages and the transforms they are built on. Every stage
//! implements the `Stage` trait and is driven by `EffectChain`.

pub mod convolution;
pub mod filter;
pub mod resample;
pub mod stft;

mod chain;
mod delay;
mod effect;
mod eq;
mod gain;
mod gate;
mod limiter;
mod params;
mod pitch;
mod reverb;
mod ring_mod;
mod stretch;

pub use chain::{process, ChainReport, EffectChain, StageOutcome, StageRecord};
pub use delay::{delay_samples, echo, MultiTapEcho};
pub use effect::{Stage, StageContext};
pub use eq::{equalize, ThreeBandEqualizer};
pub use gain::{gain, Gain};
pub use gate::{denoise, percentile, SpectralNoiseGate};
pub use limiter::{normalize, Normalizer, PEAK_CEILING};
pub use params::EffectParameters;
pub use pitch::{semitones_to_ratio, shift, PitchShifter};
pub use reverb::{impulse_response, reverb, SyntheticReverb};
pub use ring_mod::{modulate, RobotVoiceModulator, CARRIER_HZ};
pub use stretch::{stretch, TimeStretcher};
