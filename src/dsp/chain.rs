//! Effect Chain
//!
//! Stages run in a fixed order:
//! 1. Pitch shift
//! 2. Time stretch
//! 3. Gain
//! 4. 3-band EQ
//! 5. Noise reduction
//! 6. Reverb
//! 7. Echo
//! 8. Robot voice
//! 9. Normalizer (always runs)
//!
//! Neutral stages are skipped. The cancellation token is checked before every
//! stage and the output of every applied stage is checked for NaN/Inf.

use std::time::Instant;

use log::{debug, info};
use rand::Rng;
use serde::Serialize;
use serde_json::{json, Value};

use crate::dsp::effect::{Stage, StageContext};
use crate::dsp::params::EffectParameters;
use crate::engine::{AudioBuffer, CancellationToken};
use crate::error::{Result, VoxError};

/// What happened to one stage during a run
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StageOutcome {
    /// The stage ran
    Applied { elapsed_ms: f64 },
    /// The stage was neutral and did not run
    Skipped,
}

/// Per-stage entry of a [`ChainReport`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageRecord {
    pub name: &'static str,
    #[serde(flatten)]
    pub outcome: StageOutcome,
}

/// Summary of one chain run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChainReport {
    /// Seed of the random source; pass it back via `with_seed` to reproduce the run
    pub seed: u64,
    pub stages: Vec<StageRecord>,
}

impl ChainReport {
    /// Names of the stages that ran, in order
    pub fn applied(&self) -> Vec<&'static str> {
        self.stages
            .iter()
            .filter(|r| matches!(r.outcome, StageOutcome::Applied { .. }))
            .map(|r| r.name)
            .collect()
    }

    /// Serialize the report to JSON
    pub fn to_json(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }
}

/// Ordered set of stages built from one [`EffectParameters`]
#[derive(Debug)]
pub struct EffectChain {
    stages: Vec<Box<dyn Stage>>,
    seed: Option<u64>,
    cancel: CancellationToken,
}

impl EffectChain {
    /// Build a chain from validated parameters
    ///
    /// # Errors
    /// * `Configuration` - A parameter is out of range or not finite
    pub fn new(params: &EffectParameters) -> Result<Self> {
        params.validate()?;
        Ok(Self {
            stages: params.stages(),
            seed: None,
            cancel: CancellationToken::new(),
        })
    }

    /// Fix the seed of the random source used by stochastic stages
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Abort between stages once `token` is cancelled
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Number of stages, including neutral ones
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// Check if the chain has no stages
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Iterate over stages in processing order
    pub fn iter(&self) -> impl Iterator<Item = &dyn Stage> {
        self.stages.iter().map(|s| s.as_ref())
    }

    /// Names of all stages in processing order
    pub fn stage_names(&self) -> Vec<&'static str> {
        self.iter().map(|s| s.name()).collect()
    }

    /// Names of the stages that will actually run
    pub fn active_stages(&self) -> Vec<&'static str> {
        self.iter()
            .filter(|s| !s.is_neutral())
            .map(|s| s.name())
            .collect()
    }

    /// Process the entire chain
    ///
    /// # Errors
    /// * `InvalidInput` - Empty buffer, zero sample rate or non-finite input
    /// * `Configuration` - A stage cannot run at this sample rate
    /// * `NumericAnomaly` - A stage produced NaN or Inf
    /// * `Cancelled` - The token tripped before a stage started
    pub fn process(&self, buffer: AudioBuffer) -> Result<AudioBuffer> {
        self.process_with_report(buffer).map(|(buffer, _)| buffer)
    }

    /// Process the entire chain and report what ran
    ///
    /// # Errors
    /// Same as [`process`](Self::process)
    pub fn process_with_report(&self, buffer: AudioBuffer) -> Result<(AudioBuffer, ChainReport)> {
        buffer.validate()?;
        if let Some(index) = buffer.first_non_finite() {
            return Err(VoxError::InvalidInput {
                reason: format!("non-finite sample at index {}", index),
            });
        }

        let seed = match self.seed {
            Some(seed) => seed,
            None => {
                let seed = rand::rng().random::<u64>();
                info!("Random seed {} (pass --seed {} to reproduce)", seed, seed);
                seed
            }
        };
        let mut ctx = StageContext::new(seed);
        let mut records = Vec::with_capacity(self.stages.len());
        let mut buffer = buffer;

        for stage in &self.stages {
            if self.cancel.is_cancelled() {
                return Err(VoxError::Cancelled {
                    stage: stage.name(),
                });
            }

            if stage.is_neutral() {
                debug!("Skipping {} (neutral)", stage.name());
                records.push(StageRecord {
                    name: stage.name(),
                    outcome: StageOutcome::Skipped,
                });
                continue;
            }

            let started = Instant::now();
            buffer = stage.apply(buffer, &mut ctx)?;
            let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;

            if let Some(index) = buffer.first_non_finite() {
                return Err(VoxError::NumericAnomaly {
                    stage: stage.name(),
                    index,
                });
            }

            debug!(
                "Applied {} in {:.1} ms: {}",
                stage.name(),
                elapsed_ms,
                stage.params()
            );
            records.push(StageRecord {
                name: stage.name(),
                outcome: StageOutcome::Applied { elapsed_ms },
            });
        }

        let report = ChainReport {
            seed,
            stages: records,
        };
        info!(
            "Chain complete: {} of {} stages applied, {} samples out",
            report.applied().len(),
            self.stages.len(),
            buffer.len()
        );
        Ok((buffer, report))
    }

    /// Serialize chain configuration to JSON
    pub fn to_json(&self) -> Value {
        let stages: Vec<Value> = self
            .iter()
            .map(|s| {
                json!({
                    "name": s.name(),
                    "display_name": s.display_name(),
                    "neutral": s.is_neutral(),
                    "params": s.params(),
                })
            })
            .collect();
        json!({ "stages": stages, "seed": self.seed })
    }
}

/// Run a chain built from `params` once
///
/// # Errors
/// Any error of [`EffectParameters::validate`] or [`EffectChain::process`]
pub fn process(buffer: AudioBuffer, params: &EffectParameters) -> Result<AudioBuffer> {
    EffectChain::new(params)?.process(buffer)
}
