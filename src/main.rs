//! voxfx CLI - Offline Voice Effects
//!
//! Command-line interface for the voxfx effects pipeline.

use anyhow::Result;
use clap::Parser;
use env_logger::Env;
use log::{error, info};

use voxfx::cli::commands::{self, RunOptions};
use voxfx::cli::{Cli, Commands};
use voxfx::VoxError;

fn main() {
    let cli = Cli::parse();

    // RUST_LOG wins over --verbose
    let default_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(default_level)).init();

    info!("voxfx v{}", env!("CARGO_PKG_VERSION"));

    if let Err(err) = handle_command(cli.command) {
        error!("{:#}", err);
        if let Some(vox) = err.downcast_ref::<VoxError>() {
            eprintln!("[{}] {}", vox.error_code(), vox.recovery_hint());
        }
        std::process::exit(1);
    }
}

fn handle_command(cmd: Commands) -> Result<()> {
    match cmd {
        Commands::Process {
            input,
            output,
            params,
            effects,
            seed,
            timeout_secs,
            bit_depth,
        } => {
            let options = RunOptions {
                params_file: params.as_deref(),
                seed,
                timeout_secs,
                bit_depth,
            };
            commands::process(&input, &output, &effects, &options)
        }
        Commands::Inspect { input } => commands::inspect(&input),
    }
}
