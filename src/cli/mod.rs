//! CLI Module
//!
//! Command-line interface for the voxfx effects pipeline.

pub mod commands;

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::dsp::EffectParameters;

/// voxfx - offline voice effects processor
#[derive(Parser, Debug)]
#[command(name = "voxfx")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the effect chain over a WAV file
    #[command(name = "process")]
    Process {
        /// Input WAV file
        input: PathBuf,

        /// Output WAV file
        output: PathBuf,

        /// JSON parameter file; flags below override its values
        #[arg(short, long)]
        params: Option<PathBuf>,

        #[command(flatten)]
        effects: EffectArgs,

        /// Seed for the reverb impulse response
        #[arg(long)]
        seed: Option<u64>,

        /// Abort if processing is still running after this many seconds
        #[arg(long)]
        timeout_secs: Option<f64>,

        /// Output sample format: 16, 24 (integer) or 32 (float)
        #[arg(long, default_value_t = 32)]
        bit_depth: u16,
    },

    /// Print sample rate, duration and levels of a WAV file
    #[command(name = "inspect")]
    Inspect {
        /// Input WAV file
        input: PathBuf,
    },
}

/// Per-effect overrides
#[derive(Args, Debug, Default, Clone)]
pub struct EffectArgs {
    /// Pitch shift in semitones (-12 to 12)
    #[arg(long, allow_negative_numbers = true)]
    pub pitch_shift: Option<f32>,

    /// Time stretch rate (0.5 to 2.0)
    #[arg(long)]
    pub time_stretch: Option<f32>,

    /// Gain in dB (-20 to 20)
    #[arg(long, allow_negative_numbers = true)]
    pub gain: Option<f32>,

    /// Bass gain in dB (-20 to 20)
    #[arg(long, allow_negative_numbers = true)]
    pub bass: Option<f32>,

    /// Mid gain in dB (-20 to 20)
    #[arg(long, allow_negative_numbers = true)]
    pub mid: Option<f32>,

    /// Treble gain in dB (-20 to 20)
    #[arg(long, allow_negative_numbers = true)]
    pub treble: Option<f32>,

    /// Noise reduction strength (0 to 1)
    #[arg(long)]
    pub noise_reduction: Option<f32>,

    /// Reverb amount (0 to 1)
    #[arg(long)]
    pub reverb: Option<f32>,

    /// Reverb room size (0.1 to 1.0)
    #[arg(long)]
    pub room_size: Option<f32>,

    /// Echo delay in ms (0 to 1000)
    #[arg(long)]
    pub echo_delay: Option<f32>,

    /// Echo decay (0 to 0.9)
    #[arg(long)]
    pub echo_decay: Option<f32>,

    /// Ring-modulate with a 200 Hz carrier
    #[arg(long)]
    pub robot_voice: bool,
}

impl EffectArgs {
    /// Overlay the flags that were given onto `base`
    pub fn apply_to(&self, base: EffectParameters) -> EffectParameters {
        EffectParameters {
            pitch_shift_semitones: self.pitch_shift.unwrap_or(base.pitch_shift_semitones),
            time_stretch_rate: self.time_stretch.unwrap_or(base.time_stretch_rate),
            gain_db: self.gain.unwrap_or(base.gain_db),
            bass_db: self.bass.unwrap_or(base.bass_db),
            mid_db: self.mid.unwrap_or(base.mid_db),
            treble_db: self.treble.unwrap_or(base.treble_db),
            noise_reduction_strength: self
                .noise_reduction
                .unwrap_or(base.noise_reduction_strength),
            reverb_amount: self.reverb.unwrap_or(base.reverb_amount),
            reverb_room_size: self.room_size.unwrap_or(base.reverb_room_size),
            echo_delay_ms: self.echo_delay.unwrap_or(base.echo_delay_ms),
            echo_decay: self.echo_decay.unwrap_or(base.echo_decay),
            robot_voice: self.robot_voice || base.robot_voice,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_process_flags() {
        let cli = Cli::try_parse_from([
            "voxfx",
            "process",
            "in.wav",
            "out.wav",
            "--pitch-shift",
            "-3",
            "--gain",
            "6",
            "--robot-voice",
            "--seed",
            "42",
            "--bit-depth",
            "16",
        ])
        .unwrap();

        match cli.command {
            Commands::Process {
                input,
                effects,
                seed,
                bit_depth,
                ..
            } => {
                assert_eq!(input, PathBuf::from("in.wav"));
                assert_eq!(effects.pitch_shift, Some(-3.0));
                assert_eq!(effects.gain, Some(6.0));
                assert!(effects.robot_voice);
                assert_eq!(seed, Some(42));
                assert_eq!(bit_depth, 16);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_flags_override_file_values() {
        let base = EffectParameters {
            gain_db: -4.0,
            echo_decay: 0.3,
            ..Default::default()
        };
        let args = EffectArgs {
            gain: Some(2.0),
            ..Default::default()
        };
        let merged = args.apply_to(base);
        assert_eq!(merged.gain_db, 2.0);
        assert_eq!(merged.echo_decay, 0.3);
        assert!(!merged.robot_voice);
    }
}
