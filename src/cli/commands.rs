//! CLI Command Implementations
//!
//! Implements the actual logic for each CLI command.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use log::{debug, info};

use crate::cli::EffectArgs;
use crate::dsp::{EffectChain, EffectParameters};
use crate::engine::{export_wav, import_wav, BitDepth, CancellationToken};

/// Options of the `process` command that are not effect parameters
#[derive(Debug, Clone, Default)]
pub struct RunOptions<'a> {
    pub params_file: Option<&'a Path>,
    pub seed: Option<u64>,
    pub timeout_secs: Option<f64>,
    pub bit_depth: u16,
}

/// Merge the parameter file (if any) with the command-line overrides
pub fn resolve_params(params_file: Option<&Path>, effects: &EffectArgs) -> Result<EffectParameters> {
    let base = match params_file {
        Some(path) => EffectParameters::from_json_file(path)
            .with_context(|| format!("Failed to read parameters from {}", path.display()))?,
        None => EffectParameters::default(),
    };
    let params = effects.apply_to(base);
    params.validate().context("Invalid effect parameters")?;
    Ok(params)
}

/// Load a WAV file, run the effect chain and write the result.
pub fn process(input: &Path, output: &Path, effects: &EffectArgs, options: &RunOptions) -> Result<()> {
    let params = resolve_params(options.params_file, effects)?;
    let depth = BitDepth::from_bits(options.bit_depth)?;

    let buffer = import_wav(input)
        .with_context(|| format!("Failed to load {}", input.display()))?;
    let name = input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    println!("Loaded: {} | {}", name, buffer.summary());

    let token = match options.timeout_secs {
        Some(secs) => {
            let timeout = Duration::try_from_secs_f64(secs)
                .with_context(|| format!("Invalid timeout: {} seconds", secs))?;
            CancellationToken::with_timeout(timeout)
        }
        None => CancellationToken::new(),
    };

    let mut chain = EffectChain::new(&params)?.with_cancellation(token);
    if let Some(seed) = options.seed {
        chain = chain.with_seed(seed);
    }
    info!("Active stages: {}", chain.active_stages().join(", "));

    let (processed, report) = chain
        .process_with_report(buffer)
        .with_context(|| format!("Processing {} failed", input.display()))?;

    export_wav(&processed, output, depth)
        .with_context(|| format!("Failed to write {}", output.display()))?;

    debug!("Chain report: {}", report.to_json()?);
    println!("Applied: {}", report.applied().join(" -> "));
    println!("Seed: {}", report.seed);
    println!("Saved: {} | {}", output.display(), processed.summary());

    Ok(())
}

/// Print a summary of a WAV file.
pub fn inspect(input: &Path) -> Result<()> {
    let buffer = import_wav(input)
        .with_context(|| format!("Failed to load {}", input.display()))?;
    println!("{}", input.display());
    println!("{}", buffer.summary());
    Ok(())
}
